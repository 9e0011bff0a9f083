//! Case-insensitive name keyed collections.
//!
//! The log capitalises the same mob differently depending on sentence
//! position ("A gnoll hits YOU" vs "You slash a gnoll"), so every name lookup
//! folds case. The first spelling seen is kept for display.

use std::collections::BTreeMap;

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct Slot<V> {
    name: String,
    value: V,
}

/// Map keyed by a case-insensitive name. Iteration order is stable (folded key order).
#[derive(Debug, Clone)]
pub struct NameMap<V> {
    slots: BTreeMap<String, Slot<V>>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(&fold(name))
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.slots.get(&fold(name)).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.slots.get_mut(&fold(name)).map(|slot| &mut slot.value)
    }

    /// Insert or replace. The display spelling is updated to `name`.
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        self.slots
            .insert(
                fold(name),
                Slot {
                    name: name.trim().to_string(),
                    value,
                },
            )
            .map(|slot| slot.value)
    }

    pub fn get_or_insert_with(&mut self, name: &str, make: impl FnOnce() -> V) -> &mut V {
        &mut self
            .slots
            .entry(fold(name))
            .or_insert_with(|| Slot {
                name: name.trim().to_string(),
                value: make(),
            })
            .value
    }

    /// Remove an entry, returning its display spelling and value.
    pub fn remove(&mut self, name: &str) -> Option<(String, V)> {
        self.slots
            .remove(&fold(name))
            .map(|slot| (slot.name, slot.value))
    }

    /// Display spelling stored for `name`.
    pub fn display_name(&self, name: &str) -> Option<&str> {
        self.slots.get(&fold(name)).map(|slot| slot.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.slots
            .values()
            .map(|slot| (slot.name.as_str(), &slot.value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.values().map(|slot| slot.name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.values().map(|slot| &slot.value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.slots.values_mut().map(|slot| &mut slot.value)
    }
}

/// Set of case-insensitive names.
#[derive(Debug, Clone, Default)]
pub struct NameSet {
    inner: NameMap<()>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the name was not present before.
    pub fn insert(&mut self, name: &str) -> bool {
        if name.trim().is_empty() || self.inner.contains(name) {
            return false;
        }
        self.inner.insert(name, ());
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }
}

impl<S: AsRef<str>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = NameSet::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}
