//! Combat session: turns one log line at a time into target state and reports.
//!
//! Each line runs through the same ordered checks:
//! 1. pet flag expiry, pending-spell timeout, per-target combat timeout
//! 2. the pending spell's landed message
//! 3. faded messages of the player's running DOTs
//! 4. the static pattern battery in `parser`
//!
//! Everything here is best-effort inference over free text. Nothing returns an
//! error: unmatched or malformed lines are skipped and ambiguous damage is
//! still recorded under the most likely attacker.

use std::collections::VecDeque;

use chrono::NaiveDateTime;

use super::model::{DamageEvent, DiscreteDamage, DAMAGE_SHIELD, LIFETAP, NON_MELEE, PROC};
use super::names::{NameMap, NameSet};
use super::parser::{LineEvent, LineParser};
use super::pets::{is_pet_spell, Pet, PetSignal};
use super::report::{ReportStyle, TargetReport};
use super::spells::{PendingSpell, SpellRegistry};
use super::target::Target;
use super::timestamp::LogLine;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub combat_timeout_secs: i64,
    pub spell_timeout_secs: i64,
    pub report_style: ReportStyle,
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            combat_timeout_secs: 30,
            spell_timeout_secs: 12,
            report_style: ReportStyle::Full,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Slain,
    Experience,
    Timeout,
    Zoned,
    Flushed,
}

impl CloseReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Slain => "slain",
            Self::Experience => "experience",
            Self::Timeout => "timeout",
            Self::Zoned => "zoned",
            Self::Flushed => "flushed",
        }
    }
}

/// Where the last non-melee hit was stored, for after-the-fact proc correction.
#[derive(Debug, Clone)]
struct NonMeleeRef {
    target: String,
    attacker: String,
    index: usize,
    line_seq: u64,
}

pub struct CombatSession {
    player: String,
    config: SessionConfig,
    parser: LineParser,
    registry: SpellRegistry,
    active: NameMap<Target>,
    inactive: VecDeque<Target>,
    pending_spell: Option<PendingSpell>,
    /// Direct-damage spell that landed on the given line; labels the next non-melee hit.
    direct_damage_label: Option<(String, u64)>,
    pending_pet_spell: Option<String>,
    pets: NameMap<Pet>,
    players: NameSet,
    discovered_players: Vec<String>,
    last_slain_at: Option<NaiveDateTime>,
    previous_non_melee: Option<NonMeleeRef>,
    line_seq: u64,
    last_timestamp: Option<NaiveDateTime>,
}

impl CombatSession {
    pub fn new(player: &str, config: SessionConfig) -> Self {
        Self::with_registry(player, config, SpellRegistry::standard())
    }

    pub fn with_registry(player: &str, config: SessionConfig, registry: SpellRegistry) -> Self {
        let mut players = NameSet::new();
        players.insert(player);
        Self {
            player: player.to_string(),
            config,
            parser: LineParser::new(player),
            registry,
            active: NameMap::new(),
            inactive: VecDeque::new(),
            pending_spell: None,
            direct_damage_label: None,
            pending_pet_spell: None,
            pets: NameMap::new(),
            players,
            discovered_players: Vec::new(),
            last_slain_at: None,
            previous_non_melee: None,
            line_seq: 0,
            last_timestamp: None,
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn add_known_player(&mut self, name: &str) {
        self.players.insert(name);
    }

    /// Names learned from `/who` output since the last call.
    pub fn take_discovered_players(&mut self) -> Vec<String> {
        std::mem::take(&mut self.discovered_players)
    }

    pub fn add_pet(&mut self, pet: Pet) {
        self.pets.insert(&pet.name.clone(), pet);
    }

    pub fn pet(&self, name: &str) -> Option<&Pet> {
        self.pets.get(name)
    }

    pub fn pending_spell(&self) -> Option<&PendingSpell> {
        self.pending_spell.as_ref()
    }

    pub fn active_target(&self, name: &str) -> Option<&Target> {
        self.active.get(name)
    }

    pub fn active_targets(&self) -> impl Iterator<Item = &Target> {
        self.active.values()
    }

    /// Closed targets, oldest first.
    pub fn inactive_targets(&self) -> impl Iterator<Item = &Target> {
        self.inactive.iter()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.last_timestamp
    }

    fn is_friendly(&self, name: &str) -> bool {
        self.players.contains(name) || self.pets.contains(name)
    }

    /// Process one raw log line. Returns rendered reports and notices to emit.
    pub fn process_line(&mut self, raw: &str) -> Vec<String> {
        match LogLine::parse(raw) {
            Ok(line) => self.process(&line),
            Err(e) => {
                log::debug!("Skipping line: {}", e);
                Vec::new()
            }
        }
    }

    pub fn process(&mut self, line: &LogLine) -> Vec<String> {
        let mut out = Vec::new();
        let now = line.timestamp;
        self.line_seq += 1;
        self.last_timestamp = Some(now);

        for pet in self.pets.values_mut() {
            pet.expire_flags(self.line_seq);
        }
        self.check_spell_timeout(now);
        self.check_combat_timeouts(now, &mut out);

        let handled = self.check_landed(&line.content, now) || self.check_faded(&line.content, now);
        if !handled {
            match self.parser.parse_content(&line.content) {
                Ok(Some(event)) => self.dispatch(event, now, &mut out),
                Ok(None) => {}
                Err(e) => log::debug!("Skipping line {:?}: {}", line.content, e),
            }
        }

        if self
            .direct_damage_label
            .as_ref()
            .is_some_and(|(_, seq)| *seq < self.line_seq)
        {
            self.direct_damage_label = None;
        }

        out
    }

    /// Run the time-based checks with no new line, for idle polls.
    pub fn poll_timeouts(&mut self, now: NaiveDateTime) -> Vec<String> {
        let mut out = Vec::new();
        self.check_spell_timeout(now);
        self.check_combat_timeouts(now, &mut out);
        out
    }

    fn dispatch(&mut self, event: LineEvent, now: NaiveDateTime, out: &mut Vec<String>) {
        match event {
            LineEvent::Zoning => self.close_all(now, CloseReason::Zoned, out),
            LineEvent::Experience => self.handle_experience(now, out),
            LineEvent::YouSlain { victim } => {
                if self.players.contains(&victim) {
                    log::debug!("Ignoring kill of player {}", victim);
                    return;
                }
                self.last_slain_at = Some(now);
                self.end_combat(&victim, now, out);
            }
            LineEvent::Slain { victim, .. } => self.handle_slain(&victim, now, out),
            LineEvent::CastBegin { spell } => self.handle_cast(&spell, now),
            LineEvent::NonMelee { target, amount } => self.handle_non_melee(&target, amount, now),
            LineEvent::Melee {
                attacker,
                verb,
                target,
                amount,
            } => self.handle_melee(&attacker, &verb, &target, amount, now),
            LineEvent::Miss { attacker, target } => {
                let mob = if self.is_friendly(&target) && !self.is_friendly(&attacker) {
                    attacker
                } else {
                    target
                };
                self.ensure_target(&mob, now);
            }
            LineEvent::PetLifetap { pet, .. } => {
                let line_seq = self.line_seq;
                if let Some(pet) = self.pets.get_mut(&pet) {
                    pet.arm(PetSignal::Lifetap, line_seq);
                }
            }
            LineEvent::DamageShield { .. } => {
                let line_seq = self.line_seq;
                for pet in self.pets.values_mut().filter(|pet| pet.has_damage_shield()) {
                    pet.arm(PetSignal::DamageShield, line_seq);
                }
            }
            LineEvent::PetProc { .. } => self.handle_proc(),
            LineEvent::PetGreeting { pet } => {
                if let Some(spell) = self.pending_pet_spell.take() {
                    log::info!("{} summoned {} ({})", self.player, pet, spell);
                    let pet = Pet::new(&pet, &self.player, Some(spell.as_str()), now);
                    self.add_pet(pet);
                }
            }
            LineEvent::PetLeader { pet, owner } => {
                if owner.eq_ignore_ascii_case(&self.player) && !self.pets.contains(&pet) {
                    log::info!("{} is {}'s pet", pet, self.player);
                    let pet = Pet::new(&pet, &self.player, None, now);
                    self.add_pet(pet);
                }
            }
            LineEvent::WhoEntry { name } => {
                if self.players.insert(&name) {
                    log::debug!("Learned player {}", name);
                    self.discovered_players.push(name);
                }
            }
        }
    }

    fn ensure_target(&mut self, name: &str, now: NaiveDateTime) -> &mut Target {
        self.active
            .get_or_insert_with(name, || Target::new(name, now))
    }

    fn check_spell_timeout(&mut self, now: NaiveDateTime) {
        let timeout = self.config.spell_timeout_secs;
        if let Some(pending) = &self.pending_spell {
            if pending.is_expired(now, timeout) {
                log::info!("{} timed out", pending.name());
                self.pending_spell = None;
            }
        }
    }

    fn check_combat_timeouts(&mut self, now: NaiveDateTime, out: &mut Vec<String>) {
        let timeout = self.config.combat_timeout_secs;
        let idle: Vec<String> = self
            .active
            .iter()
            .filter(|(_, target)| target.is_idle(now, timeout))
            .map(|(name, _)| name.to_string())
            .collect();
        for name in idle {
            self.close_target(&name, now, CloseReason::Timeout, out);
        }
    }

    fn handle_cast(&mut self, spell: &str, now: NaiveDateTime) {
        if is_pet_spell(spell) {
            self.pending_pet_spell = Some(spell.to_string());
        }
        let Some(template) = self.registry.lookup(spell) else {
            return;
        };
        let pending = template.activate(&self.player, now);
        if let Some(previous) = self.pending_spell.replace(pending) {
            log::debug!("{} replaced pending {}", spell, previous.name());
        }
        log::info!("{} pending", spell);
    }

    /// Match the pending spell's landed message. Returns true when it landed.
    fn check_landed(&mut self, content: &str, now: NaiveDateTime) -> bool {
        let Some(pending) = &self.pending_spell else {
            return false;
        };
        let Some(target_name) = pending.landed_target(content) else {
            return false;
        };
        let pending = if pending.is_aoe() {
            pending.clone()
        } else {
            match self.pending_spell.take() {
                Some(pending) => pending,
                None => return false,
            }
        };
        let line_seq = self.line_seq;

        let target = self.ensure_target(&target_name, now);
        if let Some(old) = target.ticking_dot_mut(&pending.caster, pending.name()) {
            old.close(now);
            log::info!("{} on {} overwritten", pending.name(), target_name);
        }
        let event = pending.instantiate(target.name(), now);
        let is_direct = matches!(event, DamageEvent::DirectDamage(_));
        let (_, started) = target.record_incoming(event);
        if started {
            log::info!("Combat started with {}", target_name);
        }
        log::info!("{} landed on {}", pending.name(), target_name);

        if is_direct {
            self.direct_damage_label = Some((pending.name().to_string(), line_seq));
        }
        true
    }

    /// Close every running DOT of the player whose faded message this is.
    /// Returns true when at least one matched.
    fn check_faded(&mut self, content: &str, now: NaiveDateTime) -> bool {
        let mut matched = false;
        for target in self.active.values_mut() {
            let target_name = target.name().to_string();
            for dot in target
                .ticking_dots_by_mut(&self.player)
                .filter(|dot| dot.matches_faded(content))
            {
                dot.close(now);
                log::info!("{} faded from {}", dot.name, target_name);
                matched = true;
            }
        }
        matched
    }

    fn handle_melee(
        &mut self,
        attacker: &str,
        verb: &str,
        target: &str,
        amount: i64,
        now: NaiveDateTime,
    ) {
        let hit = DamageEvent::Discrete(DiscreteDamage::new(attacker, target, now, verb, amount));

        if self.is_friendly(target) && !self.is_friendly(attacker) {
            let mob = self.ensure_target(attacker, now);
            mob.observe_melee_hit(amount);
            if mob.record_outgoing(hit) {
                log::info!("Combat started with {}", attacker);
            }
            return;
        }

        if let Some(pet) = self.pets.get_mut(attacker) {
            if let Some(level) = pet.observe_melee(amount) {
                log::debug!("{} is at least level {}", pet.name, level.level);
            }
        }
        let (_, started) = self.ensure_target(target, now).record_incoming(hit);
        if started {
            log::info!("Combat started with {}", target);
        }
    }

    fn handle_non_melee(&mut self, target_name: &str, amount: i64, now: NaiveDateTime) {
        if self.players.contains(target_name) {
            log::debug!("Non-melee hit on player {} recorded under {}", target_name, self.player);
        }

        let mut attacker = self.player.clone();
        let mut label = match (&self.pending_spell, &self.direct_damage_label) {
            (Some(pending), _) => pending.name().to_string(),
            (None, Some((spell, seq))) if seq + 1 == self.line_seq => spell.clone(),
            _ => NON_MELEE.to_string(),
        };

        for pet in self.pets.values_mut() {
            let Some(signal) = pet.pending_signal() else {
                continue;
            };
            let matched = pet.matches_signal(signal, amount);
            pet.clear_flags();
            if matched {
                attacker = pet.name.clone();
                label = match signal {
                    PetSignal::Lifetap => LIFETAP,
                    PetSignal::DamageShield => DAMAGE_SHIELD,
                }
                .to_string();
                log::debug!("{} of {} credited to {}", label, amount, attacker);
                break;
            }
        }
        if label != NON_MELEE && attacker == self.player {
            self.direct_damage_label = None;
        }

        let hit = DiscreteDamage::new(attacker.as_str(), target_name, now, label, amount);
        let target = self.ensure_target(target_name, now);
        let display = target.name().to_string();
        let (index, started) = target.record_incoming(DamageEvent::Discrete(hit));
        if started {
            log::info!("Combat started with {}", display);
        }
        self.previous_non_melee = Some(NonMeleeRef {
            target: display,
            attacker,
            index,
            line_seq: self.line_seq,
        });
    }

    /// A pet proc is announced after the non-melee line that carried its damage.
    /// Move that damage from the player to the pet.
    fn handle_proc(&mut self) {
        let line_seq = self.line_seq;
        let player = self.player.clone();
        let Some(pet) = self
            .pets
            .values_mut()
            .find(|pet| pet.owner.eq_ignore_ascii_case(&player))
        else {
            return;
        };
        pet.arm_proc(line_seq);
        let pet_name = pet.name.clone();

        let Some(previous) = self.previous_non_melee.take() else {
            return;
        };
        if previous.line_seq + 1 != line_seq || !previous.attacker.eq_ignore_ascii_case(&player) {
            return;
        }
        let Some(target) = self.active.get_mut(&previous.target) else {
            log::debug!("Proc target {} is no longer active", previous.target);
            return;
        };
        let Some(original) = target
            .incoming_event_mut(&previous.attacker, previous.index)
            .and_then(DamageEvent::discrete_mut)
        else {
            return;
        };

        let corrected = original.reattributed(&pet_name, PROC);
        let amount = original.amount();
        original.zero_out();
        target.adjust_discrete_sum(-amount);
        target.record_incoming(DamageEvent::Discrete(corrected));
        log::debug!("Proc of {} on {} credited to {}", amount, previous.target, pet_name);

        if let Some(pet) = self.pets.get_mut(&pet_name) {
            pet.procced = false;
        }
    }

    fn handle_slain(&mut self, victim: &str, now: NaiveDateTime, out: &mut Vec<String>) {
        if self.players.contains(victim) {
            log::info!("{} died", victim);
            return;
        }
        if let Some((name, _)) = self.pets.remove(victim) {
            log::info!("Pet {} died", name);
            return;
        }
        self.last_slain_at = Some(now);
        self.end_combat(victim, now, out);
    }

    fn handle_experience(&mut self, now: NaiveDateTime, out: &mut Vec<String>) {
        if self.last_slain_at == Some(now) {
            log::debug!("Experience already accounted for by a slain message");
            return;
        }

        // Guess the kill: the fighting target that took the most direct damage.
        let mut best: Option<(&str, i64)> = None;
        for target in self.active.values().filter(|t| t.in_combat()) {
            let sum = target.discrete_damage_sum();
            if best.map_or(true, |(_, top)| sum > top) {
                best = Some((target.name(), sum));
            }
        }
        match best.map(|(name, _)| name.to_string()) {
            Some(name) => self.close_target(&name, now, CloseReason::Experience, out),
            None => log::debug!("Experience gained with no target in combat"),
        }
    }

    fn end_combat(&mut self, name: &str, now: NaiveDateTime, out: &mut Vec<String>) {
        if self.active.contains(name) {
            self.close_target(name, now, CloseReason::Slain, out);
        } else {
            log::warn!("{} died but was not being tracked", name);
            out.push(format!("Warning: {} was slain but is not an active target", name));
        }
    }

    /// Close every active target now.
    pub fn flush(&mut self, now: NaiveDateTime) -> Vec<String> {
        let mut out = Vec::new();
        self.close_all(now, CloseReason::Flushed, &mut out);
        out
    }

    fn close_all(&mut self, now: NaiveDateTime, reason: CloseReason, out: &mut Vec<String>) {
        let names: Vec<String> = self.active.names().map(str::to_string).collect();
        for name in names {
            self.close_target(&name, now, reason, out);
        }
    }

    fn close_target(
        &mut self,
        name: &str,
        now: NaiveDateTime,
        reason: CloseReason,
        out: &mut Vec<String>,
    ) {
        let Some((_, mut target)) = self.active.remove(name) else {
            return;
        };
        target.finalize(now);

        if target.in_combat() {
            log::info!(
                "Combat ended with {} ({}) after {}s",
                target.name(),
                reason.as_str(),
                target.combat_duration_secs()
            );
            if !self.players.contains(target.name()) {
                out.extend(TargetReport::from_target(&target).render(self.config.report_style));
            }
        } else {
            log::debug!("Dropped {} ({}) without combat", target.name(), reason.as_str());
            return;
        }

        if self
            .previous_non_melee
            .as_ref()
            .is_some_and(|previous| previous.target.eq_ignore_ascii_case(target.name()))
        {
            self.previous_non_melee = None;
        }

        self.inactive.push_back(target);
        while self.inactive.len() > self.config.history_limit {
            self.inactive.pop_front();
        }
    }

    /// One-line summary of the current state, for operator commands.
    pub fn status(&self) -> String {
        let mut parts: Vec<String> = self
            .active
            .values()
            .map(|target| {
                if target.in_combat() {
                    format!(
                        "{} ({} dmg, {}s)",
                        target.name(),
                        target.discrete_damage_sum(),
                        target.combat_duration_secs()
                    )
                } else {
                    format!("{} (idle)", target.name())
                }
            })
            .collect();
        if parts.is_empty() {
            parts.push("no active targets".to_string());
        }
        let pending = self
            .pending_spell
            .as_ref()
            .map_or("none".to_string(), |p| p.name().to_string());
        let pets: Vec<&str> = self.pets.names().collect();
        format!(
            "{}: {} | pending spell: {} | pets: {}",
            self.player,
            parts.join(", "),
            pending,
            if pets.is_empty() {
                "none".to_string()
            } else {
                pets.join(", ")
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: &str = "[Wed Mar 13 21:00:00 2024]";

    fn at(secs: u32) -> String {
        format!("[Wed Mar 13 21:{:02}:{:02} 2024]", secs / 60, secs % 60)
    }

    fn feed(session: &mut CombatSession, secs: u32, content: &str) -> Vec<String> {
        session.process_line(&format!("{} {}", at(secs), content))
    }

    fn session() -> CombatSession {
        CombatSession::new("Soandso", SessionConfig::default())
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut s = session();
        assert!(s.process_line("not a log line").is_empty());
        assert!(s.process_line("").is_empty());
        assert!(s.last_timestamp().is_none());
        assert!(s.process_line(&format!("{} hello", T)).is_empty());
        assert!(s.last_timestamp().is_some());
    }

    #[test]
    fn test_miss_creates_idle_target() {
        let mut s = session();
        feed(&mut s, 0, "You try to slash a gnoll pup, but miss!");
        let target = s.active_target("a gnoll pup").unwrap();
        assert!(!target.in_combat());
    }

    #[test]
    fn test_melee_starts_combat_in_both_directions() {
        let mut s = session();
        feed(&mut s, 0, "You slash a gnoll pup for 12 points of damage.");
        feed(&mut s, 1, "A gnoll pup hits YOU for 7 points of damage.");
        let target = s.active_target("a gnoll pup").unwrap();
        assert!(target.in_combat());
        assert_eq!(target.discrete_damage_sum(), 12);
        assert_eq!(target.max_melee(), 7);
        assert_eq!(target.outgoing_to("Soandso").len(), 1);
        assert_eq!(s.active_targets().count(), 1);
    }

    #[test]
    fn test_you_have_slain_closes_and_reports() {
        let mut s = session();
        feed(&mut s, 0, "You slash a gnoll pup for 12 points of damage.");
        let out = feed(&mut s, 5, "You have slain a gnoll pup!");
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("a gnoll pup (level"));
        assert!(s.active_target("a gnoll pup").is_none());
        assert_eq!(s.inactive_targets().count(), 1);
    }

    #[test]
    fn test_slain_unknown_target_warns() {
        let mut s = session();
        let out = feed(&mut s, 0, "an orc pawn has been slain by Xyzzy!");
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("Warning:"));
    }

    #[test]
    fn test_slain_player_is_ignored() {
        let mut s = session();
        feed(&mut s, 0, "[60 Necromancer] Xyzzy (Dark Elf)");
        feed(&mut s, 1, "an orc pawn hits Xyzzy for 10 points of damage.");
        let out = feed(&mut s, 2, "Xyzzy has been slain by an orc pawn!");
        assert!(out.is_empty());
        assert!(s.active_target("an orc pawn").is_some());
        assert_eq!(s.take_discovered_players(), vec!["Xyzzy".to_string()]);
        assert!(s.take_discovered_players().is_empty());
    }

    #[test]
    fn test_non_melee_on_player_is_recorded() {
        let mut s = session();
        feed(&mut s, 0, "[60 Necromancer] Xyzzy (Dark Elf)");
        let out = feed(&mut s, 1, "Xyzzy was hit by non-melee for 40 points of damage.");
        assert!(out.is_empty());

        let target = s.active_target("xyzzy").unwrap();
        assert!(target.in_combat());
        let events = target.incoming_from("Soandso");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].damage_dealt(), 40);
        assert_eq!(events[0].damage_type(), NON_MELEE);

        // Bookkeeping only: closing a player target renders no report.
        assert!(s.flush(s.last_timestamp().unwrap()).is_empty());
        assert_eq!(s.inactive_targets().count(), 1);
    }

    #[test]
    fn test_experience_guesses_most_damaged_target() {
        let mut s = session();
        feed(&mut s, 0, "You slash a gnoll pup for 12 points of damage.");
        feed(&mut s, 1, "You slash a gnoll scout for 40 points of damage.");
        let out = feed(&mut s, 2, "You gain experience!!");
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("a gnoll scout"));
        assert!(s.active_target("a gnoll pup").is_some());
    }

    #[test]
    fn test_cast_ignores_unknown_spells() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Spirit of Wolf.");
        assert!(s.pending_spell().is_none());
        feed(&mut s, 1, "You begin casting Heat Blood.");
        feed(&mut s, 2, "You begin casting Splurt.");
        assert_eq!(s.pending_spell().unwrap().name(), "Splurt");
    }

    #[test]
    fn test_direct_damage_labels_following_hit() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Ice Comet.");
        feed(&mut s, 3, "a gnoll pup is pummeled by an icy comet.");
        assert!(s.pending_spell().is_none());
        feed(&mut s, 3, "a gnoll pup was hit by non-melee for 120 points of damage.");
        feed(&mut s, 4, "a gnoll pup was hit by non-melee for 9 points of damage.");

        let events = s.active_target("a gnoll pup").unwrap().incoming_from("Soandso");
        let labels: Vec<&str> = events.iter().map(DamageEvent::damage_type).collect();
        assert_eq!(labels, vec!["Ice Comet", "Ice Comet", NON_MELEE]);
    }

    #[test]
    fn test_aoe_stays_armed() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Fire Spiral of Al'Kabor.");
        feed(&mut s, 2, "an orc pawn is engulfed in a spiral of fire.");
        feed(&mut s, 2, "an orc centurion is engulfed in a spiral of fire.");
        assert_eq!(
            s.pending_spell().unwrap().name(),
            "Fire Spiral of Al'Kabor"
        );
        assert!(s.active_target("an orc pawn").unwrap().in_combat());
        assert!(s.active_target("an orc centurion").unwrap().in_combat());
    }

    #[test]
    fn test_recast_overwrites_running_dot() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Heat Blood.");
        feed(&mut s, 2, "a gnoll pup's blood simmers.");
        feed(&mut s, 20, "You begin casting Heat Blood.");
        feed(&mut s, 22, "a gnoll pup's blood simmers.");

        let events = s.active_target("a gnoll pup").unwrap().incoming_from("Soandso");
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_ticking());
        assert_eq!(events[0].dot().unwrap().end, events[1].dot().map(|d| d.start));
        assert!(events[1].is_ticking());
    }

    #[test]
    fn test_faded_closes_every_matching_instance() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Heat Blood.");
        feed(&mut s, 2, "a gnoll pup's blood simmers.");
        feed(&mut s, 3, "You begin casting Heat Blood.");
        feed(&mut s, 5, "a gnoll scout's blood simmers.");
        feed(&mut s, 14, "Your Heat Blood spell has worn off.");

        for name in ["a gnoll pup", "a gnoll scout"] {
            let dot = &s.active_target(name).unwrap().incoming_from("Soandso")[0];
            assert!(!dot.is_ticking(), "{} still ticking", name);
        }
        let pup = s.active_target("a gnoll pup").unwrap();
        assert_eq!(pup.incoming_from("Soandso")[0].dot().unwrap().ticks(), 2);
    }

    #[test]
    fn test_poll_timeouts_without_lines() {
        let mut s = session();
        feed(&mut s, 0, "You begin casting Splurt.");
        feed(&mut s, 1, "You slash a gnoll pup for 12 points of damage.");
        let last = s.last_timestamp().unwrap();

        // Cast one second before the last line: expires past 12s after the cast.
        assert!(s.poll_timeouts(last + chrono::Duration::seconds(11)).is_empty());
        assert!(s.pending_spell().is_some());
        assert!(s.poll_timeouts(last + chrono::Duration::seconds(12)).is_empty());
        assert!(s.pending_spell().is_none());

        let out = s.poll_timeouts(last + chrono::Duration::seconds(31));
        assert_eq!(out.len(), 1);
        assert!(s.active_target("a gnoll pup").is_none());
    }

    #[test]
    fn test_zoning_closes_everything() {
        let mut s = session();
        feed(&mut s, 0, "You slash a gnoll pup for 12 points of damage.");
        feed(&mut s, 1, "You slash a gnoll scout for 40 points of damage.");
        let out = feed(&mut s, 2, "LOADING, PLEASE WAIT...");
        assert_eq!(out.len(), 2);
        assert_eq!(s.active_targets().count(), 0);
        assert_eq!(s.inactive_targets().count(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut s = CombatSession::new(
            "Soandso",
            SessionConfig {
                history_limit: 2,
                ..SessionConfig::default()
            },
        );
        for (i, mob) in ["a bat", "a rat", "a snake"].iter().enumerate() {
            let secs = i as u32 * 2;
            feed(&mut s, secs, &format!("You slash {} for 5 points of damage.", mob));
            feed(&mut s, secs + 1, &format!("You have slain {}!", mob));
        }
        let names: Vec<&str> = s.inactive_targets().map(Target::name).collect();
        assert_eq!(names, vec!["a rat", "a snake"]);
    }

    #[test]
    fn test_flush_and_status() {
        let mut s = session();
        feed(&mut s, 0, "You slash a gnoll pup for 12 points of damage.");
        assert!(s.status().contains("a gnoll pup (12 dmg, 0s)"));
        let out = s.flush(s.last_timestamp().unwrap());
        assert_eq!(out.len(), 1);
        assert!(s.status().contains("no active targets"));
    }
}
