//! Spell registry and the pending-spell slot.
//!
//! The registry holds immutable templates. Casting clones a template into a
//! `PendingSpell`, and each landed message clones the pending spell again into
//! an owned `DamageEvent`, so no two activations ever share state.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use super::model::{DamageEvent, DirectDamageSpell, DotSpell};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpellKind {
    DirectDamage,
    LinearDot { per_tick: i64, max_duration_secs: i64 },
    Splurt { max_duration_secs: i64 },
}

#[derive(Clone, Debug)]
pub struct SpellTemplate {
    pub name: String,
    pub kind: SpellKind,
    /// Anchored pattern with a `target` capture.
    pub landed_message: Regex,
    pub faded_message: Regex,
    /// Stays pending after landing so it can land on further targets.
    pub aoe: bool,
}

/// Compile a message template where `{target}` marks the target name.
fn message_pattern(template: &str) -> Result<Regex, regex::Error> {
    let body = template
        .split("{target}")
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(?P<target>.+?)");
    Regex::new(&format!(r"^{}\s*$", body))
}

fn default_faded_message(spell: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^Your {} spell has worn off",
        regex::escape(spell)
    ))
}

impl SpellTemplate {
    pub fn new(name: &str, kind: SpellKind, landed: &str, aoe: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            kind,
            landed_message: message_pattern(landed)?,
            faded_message: default_faded_message(name)?,
            aoe,
        })
    }

    pub fn with_faded_message(mut self, faded: &str) -> Result<Self, regex::Error> {
        self.faded_message = message_pattern(faded)?;
        Ok(self)
    }

    /// Start an independent activation of this spell.
    pub fn activate(&self, caster: &str, cast_at: NaiveDateTime) -> PendingSpell {
        PendingSpell {
            spell: self.clone(),
            caster: caster.to_string(),
            cast_at,
        }
    }
}

/// A cast that has begun and not landed yet.
#[derive(Clone, Debug)]
pub struct PendingSpell {
    pub spell: SpellTemplate,
    pub caster: String,
    pub cast_at: NaiveDateTime,
}

impl PendingSpell {
    pub fn name(&self) -> &str {
        &self.spell.name
    }

    pub fn is_aoe(&self) -> bool {
        self.spell.aoe
    }

    pub fn is_expired(&self, now: NaiveDateTime, timeout_secs: i64) -> bool {
        (now - self.cast_at).num_seconds() > timeout_secs
    }

    /// Target name if `content` is this spell's landed message.
    pub fn landed_target(&self, content: &str) -> Option<String> {
        self.spell
            .landed_message
            .captures(content)
            .and_then(|caps| caps.name("target"))
            .map(|m| m.as_str().trim().to_string())
    }

    /// Fresh damage event for one landing on `target`.
    pub fn instantiate(&self, target: &str, landed_at: NaiveDateTime) -> DamageEvent {
        let dot = |max_duration_secs| DotSpell {
            name: self.spell.name.clone(),
            attacker: self.caster.clone(),
            target: target.to_string(),
            max_duration_secs,
            faded_message: self.spell.faded_message.clone(),
            start: landed_at,
            end: None,
        };

        match self.spell.kind {
            SpellKind::DirectDamage => DamageEvent::DirectDamage(DirectDamageSpell {
                name: self.spell.name.clone(),
                attacker: self.caster.clone(),
                target: target.to_string(),
                timestamp: landed_at,
            }),
            SpellKind::LinearDot {
                per_tick,
                max_duration_secs,
            } => DamageEvent::LinearDot {
                dot: dot(max_duration_secs),
                per_tick,
            },
            SpellKind::Splurt { max_duration_secs } => DamageEvent::Splurt(dot(max_duration_secs)),
        }
    }
}

/// Name → template lookup. Exact, case-sensitive match on the cast name.
#[derive(Clone, Debug, Default)]
pub struct SpellRegistry {
    spells: HashMap<String, SpellTemplate>,
}

impl SpellRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry loaded with the built-in damage spell table.
    pub fn standard() -> Self {
        STANDARD_REGISTRY.clone()
    }

    pub fn register(&mut self, template: SpellTemplate) {
        self.spells.insert(template.name.clone(), template);
    }

    pub fn lookup(&self, name: &str) -> Option<&SpellTemplate> {
        self.spells.get(name)
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

/// Lookup against the built-in table.
pub fn lookup_spell(name: &str) -> Option<&'static SpellTemplate> {
    STANDARD_REGISTRY.lookup(name)
}

use SpellKind::{DirectDamage, LinearDot, Splurt};

const fn dot(per_tick: i64, max_duration_secs: i64) -> SpellKind {
    LinearDot {
        per_tick,
        max_duration_secs,
    }
}

// (name, kind, landed message, aoe)
const SPELL_TABLE: &[(&str, SpellKind, &str, bool)] = &[
    // Necromancer
    ("Splurt", Splurt { max_duration_secs: 84 }, "{target}'s body begins to splurt.", false),
    ("Disease Cloud", dot(5, 60), "{target} doubles over in pain.", false),
    ("Poison Bolt", dot(9, 42), "{target} has been poisoned.", false),
    ("Heat Blood", dot(18, 60), "{target}'s blood simmers.", false),
    ("Boil Blood", dot(38, 126), "{target}'s blood boils.", false),
    ("Ignite Blood", dot(65, 126), "{target}'s blood ignites.", false),
    ("Envenomed Bolt", dot(98, 42), "{target} has been poisoned.", false),
    ("Venom of the Snake", dot(52, 42), "{target} has been poisoned.", false),
    ("Chilling Embrace", dot(32, 60), "{target} is consumed by an unholy chill.", false),
    ("Cascading Darkness", dot(72, 96), "{target} is engulfed in darkness.", false),
    ("Infectious Cloud", dot(11, 60), "{target} doubles over in pain.", true),
    ("Lifetap", DirectDamage, "{target} staggers.", false),
    ("Lifespike", DirectDamage, "{target} staggers.", false),
    ("Lifedraw", DirectDamage, "{target} staggers.", false),
    // Shaman / druid
    ("Sicken", dot(3, 60), "{target} sweats and shivers, looking feverish.", false),
    ("Stinging Swarm", dot(12, 48), "{target} is stung by a swarm of insects.", false),
    ("Flame Lick", dot(3, 36), "{target} is surrounded by flickering flames.", false),
    ("Blizzard Blast", DirectDamage, "{target} is blasted by a wall of ice.", false),
    ("Ignite", DirectDamage, "{target}'s skin blisters.", false),
    // Wizard / magician
    ("Shock of Lightning", DirectDamage, "{target} is struck by lightning.", false),
    ("Lightning Bolt", DirectDamage, "{target} is struck by lightning.", false),
    ("Ice Comet", DirectDamage, "{target} is pummeled by an icy comet.", false),
    ("Sunstrike", DirectDamage, "{target} is struck by a burst of sunlight.", false),
    ("Burst of Flame", DirectDamage, "{target} singes as the Burst of Flame hits them.", false),
    ("Bolt of Flame", DirectDamage, "{target} is struck by a bolt of flame.", false),
    ("Lava Storm", DirectDamage, "{target} is scorched by raining lava.", true),
    ("Fire Spiral of Al'Kabor", DirectDamage, "{target} is engulfed in a spiral of fire.", true),
];

fn build_standard_registry() -> Result<SpellRegistry, regex::Error> {
    let mut registry = SpellRegistry::new();
    for (name, kind, landed, aoe) in SPELL_TABLE {
        registry.register(SpellTemplate::new(name, kind.clone(), landed, *aoe)?);
    }
    Ok(registry)
}

lazy_static! {
    static ref STANDARD_REGISTRY: SpellRegistry =
        build_standard_registry().expect("Invalid spell table pattern");
}
