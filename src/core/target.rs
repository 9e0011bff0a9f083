use chrono::NaiveDateTime;

use super::model::{DamageEvent, DotSpell};
use super::names::NameMap;

/// Level guess from a mob's hardest melee hit.
pub fn implied_level(max_melee: i64) -> f64 {
    if max_melee <= 60 {
        max_melee as f64 / 2.0
    } else {
        (max_melee + 60) as f64 / 4.0
    }
}

/// One tracked combat participant and the damage it took and dealt.
#[derive(Clone, Debug)]
pub struct Target {
    name: String,
    created_at: NaiveDateTime,
    in_combat: bool,
    first_combat: Option<NaiveDateTime>,
    last_combat: Option<NaiveDateTime>,
    closed_at: Option<NaiveDateTime>,
    max_melee: i64,
    discrete_damage_sum: i64,
    /// Events against this target, keyed by attacker.
    incoming: NameMap<Vec<DamageEvent>>,
    /// Events by this target, keyed by victim.
    outgoing: NameMap<Vec<DamageEvent>>,
}

impl Target {
    pub fn new(name: &str, created_at: NaiveDateTime) -> Self {
        Self {
            name: name.to_string(),
            created_at,
            in_combat: false,
            first_combat: None,
            last_combat: None,
            closed_at: None,
            max_melee: 0,
            discrete_damage_sum: 0,
            incoming: NameMap::new(),
            outgoing: NameMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn first_combat(&self) -> Option<NaiveDateTime> {
        self.first_combat
    }

    pub fn last_combat(&self) -> Option<NaiveDateTime> {
        self.last_combat
    }

    pub fn closed_at(&self) -> Option<NaiveDateTime> {
        self.closed_at
    }

    pub fn max_melee(&self) -> i64 {
        self.max_melee
    }

    pub fn discrete_damage_sum(&self) -> i64 {
        self.discrete_damage_sum
    }

    pub fn implied_level(&self) -> f64 {
        implied_level(self.max_melee)
    }

    /// Seconds between the first and last damage event.
    pub fn combat_duration_secs(&self) -> i64 {
        match (self.first_combat, self.last_combat) {
            (Some(first), Some(last)) => (last - first).num_seconds().max(0),
            _ => 0,
        }
    }

    /// Returns true when this call started combat.
    fn touch_combat(&mut self, at: NaiveDateTime) -> bool {
        let started = !self.in_combat;
        if started {
            self.in_combat = true;
            self.first_combat = Some(at);
        }
        if self.last_combat.map_or(true, |last| at > last) {
            self.last_combat = Some(at);
        }
        started
    }

    /// Record damage done to this target. Returns the event's index in the
    /// attacker's list and whether combat started.
    pub fn record_incoming(&mut self, event: DamageEvent) -> (usize, bool) {
        let started = self.touch_combat(event.timestamp());
        if event.is_discrete() {
            self.discrete_damage_sum += event.damage_dealt();
        }
        let events = self
            .incoming
            .get_or_insert_with(event.attacker(), Vec::new);
        events.push(event);
        (events.len() - 1, started)
    }

    /// Record damage this target did. Returns whether combat started.
    pub fn record_outgoing(&mut self, event: DamageEvent) -> bool {
        let started = self.touch_combat(event.timestamp());
        self.outgoing
            .get_or_insert_with(event.target(), Vec::new)
            .push(event);
        started
    }

    pub fn observe_melee_hit(&mut self, amount: i64) {
        self.max_melee = self.max_melee.max(amount);
    }

    /// Account for a recorded hit whose amount was corrected after the fact.
    pub fn adjust_discrete_sum(&mut self, delta: i64) {
        self.discrete_damage_sum += delta;
    }

    pub fn incoming_event_mut(&mut self, attacker: &str, index: usize) -> Option<&mut DamageEvent> {
        self.incoming
            .get_mut(attacker)
            .and_then(|events| events.get_mut(index))
    }

    /// A still-running DOT of `spell` cast by `attacker` on this target.
    pub fn ticking_dot_mut(&mut self, attacker: &str, spell: &str) -> Option<&mut DotSpell> {
        self.incoming
            .get_mut(attacker)?
            .iter_mut()
            .filter_map(DamageEvent::dot_mut)
            .find(|dot| dot.is_ticking() && dot.name == spell)
    }

    /// Every still-running DOT `attacker` has on this target.
    pub fn ticking_dots_by_mut(&mut self, attacker: &str) -> impl Iterator<Item = &mut DotSpell> {
        self.incoming
            .get_mut(attacker)
            .into_iter()
            .flatten()
            .filter_map(DamageEvent::dot_mut)
            .filter(|dot| dot.is_ticking())
    }

    pub fn has_ticking_dots(&self) -> bool {
        self.incoming
            .values()
            .chain(self.outgoing.values())
            .flatten()
            .any(DamageEvent::is_ticking)
    }

    /// No recorded activity for longer than `timeout_secs`.
    pub fn is_idle(&self, now: NaiveDateTime, timeout_secs: i64) -> bool {
        let last = self.last_combat.unwrap_or(self.created_at);
        (now - last).num_seconds() > timeout_secs
    }

    /// End combat: stamp every running DOT in both directions.
    pub fn finalize(&mut self, at: NaiveDateTime) {
        for events in self.incoming.values_mut().chain(self.outgoing.values_mut()) {
            for event in events.iter_mut() {
                event.finalize(at);
            }
        }
        self.closed_at = Some(at);
    }

    pub fn incoming(&self) -> impl Iterator<Item = (&str, &[DamageEvent])> {
        self.incoming
            .iter()
            .map(|(name, events)| (name, events.as_slice()))
    }

    pub fn outgoing(&self) -> impl Iterator<Item = (&str, &[DamageEvent])> {
        self.outgoing
            .iter()
            .map(|(name, events)| (name, events.as_slice()))
    }

    pub fn incoming_from(&self, attacker: &str) -> &[DamageEvent] {
        self.incoming.get(attacker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outgoing_to(&self, victim: &str) -> &[DamageEvent] {
        self.outgoing.get(victim).map(Vec::as_slice).unwrap_or(&[])
    }
}
