//! Persistent cache of known player names.
//!
//! Stored as a JSON array so names learned from `/who` survive restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::names::NameSet;

pub struct PlayerStore {
    path: PathBuf,
    players: NameSet,
}

impl PlayerStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            players: NameSet::new(),
        }
    }

    /// Load the cache from disk. A missing or unreadable file yields an empty set.
    pub fn load(path: PathBuf) -> Self {
        let mut store = Self::new(path);
        if store.path.exists() {
            match fs::read_to_string(&store.path) {
                Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                    Ok(names) => store.players = names.iter().map(String::as_str).collect(),
                    Err(e) => log::warn!("Ignoring player cache {}: {}", store.path.display(), e),
                },
                Err(e) => log::warn!("Failed to read player cache {}: {}", store.path.display(), e),
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn players(&self) -> &NameSet {
        &self.players
    }

    /// Returns how many of `names` were new.
    pub fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> usize {
        names
            .into_iter()
            .filter(|name| self.players.insert(name))
            .count()
    }

    pub fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut names: Vec<&str> = self.players.iter().collect();
        names.sort_unstable();
        let content = serde_json::to_string_pretty(&names)?;
        fs::write(&self.path, content)
    }
}
