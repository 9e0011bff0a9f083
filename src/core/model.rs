use chrono::NaiveDateTime;
use regex::Regex;

pub type EntityName = String;

/// Length of one combat round. DOT damage accrues once per round.
pub const TICK_SECONDS: i64 = 6;

/// Damage type label for non-melee hits that could not be attributed to anything better.
pub const NON_MELEE: &str = "non-melee";
pub const LIFETAP: &str = "Lifetap";
pub const DAMAGE_SHIELD: &str = "Damage Shield";
pub const PROC: &str = "proc";

/// Number of whole ticks in `elapsed_secs`, clamped to the spell's maximum duration.
pub fn ticks_for(elapsed_secs: i64, max_duration_secs: i64) -> i64 {
    elapsed_secs.clamp(0, max_duration_secs.max(0)) / TICK_SECONDS
}

pub fn linear_dot_damage(ticks: i64, per_tick: i64) -> i64 {
    ticks * per_tick
}

/// Escalating DOT: 11 per tick plus a ramp of 12 per elapsed tick.
pub fn splurt_damage(ticks: i64) -> i64 {
    (0..ticks).map(|i| 11 + i * 12).sum()
}

/// A single hit with a known amount: melee, or one non-melee line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscreteDamage {
    pub attacker: EntityName,
    pub target: EntityName,
    pub timestamp: NaiveDateTime,
    pub damage_type: String,
    amount: i64,
}

impl DiscreteDamage {
    pub fn new(
        attacker: impl Into<EntityName>,
        target: impl Into<EntityName>,
        timestamp: NaiveDateTime,
        damage_type: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            attacker: attacker.into(),
            target: target.into(),
            timestamp,
            damage_type: damage_type.into(),
            amount,
        }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Copy of this hit credited to someone else under a new label.
    pub fn reattributed(&self, attacker: &str, damage_type: &str) -> Self {
        Self {
            attacker: attacker.to_string(),
            damage_type: damage_type.to_string(),
            ..self.clone()
        }
    }

    /// Cancel a mis-attributed hit in place. Idempotent.
    pub fn zero_out(&mut self) {
        self.amount = 0;
    }
}

/// Label for a landed direct-damage spell. The amount arrives on the following non-melee line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectDamageSpell {
    pub name: String,
    pub attacker: EntityName,
    pub target: EntityName,
    pub timestamp: NaiveDateTime,
}

/// State shared by every damage-over-time instance.
#[derive(Clone, Debug)]
pub struct DotSpell {
    pub name: String,
    pub attacker: EntityName,
    pub target: EntityName,
    pub max_duration_secs: i64,
    pub faded_message: Regex,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl DotSpell {
    pub fn is_ticking(&self) -> bool {
        self.end.is_none()
    }

    /// Whole ticks between start and end. Zero while the spell is still running.
    pub fn ticks(&self) -> i64 {
        match self.end {
            Some(end) => ticks_for((end - self.start).num_seconds(), self.max_duration_secs),
            None => 0,
        }
    }

    /// Stamp the end time if it is not set yet.
    pub fn close(&mut self, at: NaiveDateTime) {
        if self.end.is_none() {
            self.end = Some(at);
        }
    }

    pub fn matches_faded(&self, content: &str) -> bool {
        self.faded_message.is_match(content)
    }
}

#[derive(Clone, Debug)]
pub enum DamageEvent {
    Discrete(DiscreteDamage),
    DirectDamage(DirectDamageSpell),
    /// Flat damage per tick. Any initial hit is recorded separately as a non-melee event.
    LinearDot { dot: DotSpell, per_tick: i64 },
    Splurt(DotSpell),
}

impl DamageEvent {
    pub fn damage_dealt(&self) -> i64 {
        match self {
            Self::Discrete(hit) => hit.amount(),
            Self::DirectDamage(_) => 0,
            Self::LinearDot { dot, per_tick } => linear_dot_damage(dot.ticks(), *per_tick),
            Self::Splurt(dot) => splurt_damage(dot.ticks()),
        }
    }

    pub fn damage_type(&self) -> &str {
        match self {
            Self::Discrete(hit) => &hit.damage_type,
            Self::DirectDamage(spell) => &spell.name,
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => &dot.name,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.dot().is_some_and(DotSpell::is_ticking)
    }

    pub fn attacker(&self) -> &str {
        match self {
            Self::Discrete(hit) => &hit.attacker,
            Self::DirectDamage(spell) => &spell.attacker,
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => &dot.attacker,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Discrete(hit) => &hit.target,
            Self::DirectDamage(spell) => &spell.target,
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => &dot.target,
        }
    }

    /// When the event started: the hit time, or the moment a spell landed.
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::Discrete(hit) => hit.timestamp,
            Self::DirectDamage(spell) => spell.timestamp,
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => dot.start,
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Discrete(_))
    }

    pub fn dot(&self) -> Option<&DotSpell> {
        match self {
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => Some(dot),
            _ => None,
        }
    }

    pub fn dot_mut(&mut self) -> Option<&mut DotSpell> {
        match self {
            Self::LinearDot { dot, .. } | Self::Splurt(dot) => Some(dot),
            _ => None,
        }
    }

    pub fn discrete_mut(&mut self) -> Option<&mut DiscreteDamage> {
        match self {
            Self::Discrete(hit) => Some(hit),
            _ => None,
        }
    }

    /// Stamp an end time on a still-ticking DOT. Other events are left alone.
    pub fn finalize(&mut self, at: NaiveDateTime) {
        if let Some(dot) = self.dot_mut() {
            dot.close(at);
        }
    }
}
