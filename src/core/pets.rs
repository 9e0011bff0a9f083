//! Player pets: level tables and the attribution flags used to credit
//! lifetaps, damage shields and procs to the pet instead of its owner.

use chrono::NaiveDateTime;

/// Signature of one pet level. Values are exact per-level amounts seen in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PetLevel {
    pub level: u8,
    pub max_melee: i64,
    pub lifetap_proc: Option<i64>,
    pub damage_shield: Option<i64>,
}

const fn necro(level: u8, max_melee: i64, lifetap_proc: i64) -> PetLevel {
    PetLevel {
        level,
        max_melee,
        lifetap_proc: Some(lifetap_proc),
        damage_shield: None,
    }
}

const fn fire(level: u8, max_melee: i64, damage_shield: i64) -> PetLevel {
    PetLevel {
        level,
        max_melee,
        lifetap_proc: None,
        damage_shield: Some(damage_shield),
    }
}

const fn plain(level: u8, max_melee: i64) -> PetLevel {
    PetLevel {
        level,
        max_melee,
        lifetap_proc: None,
        damage_shield: None,
    }
}

// Ordered by level within each spell.
const PET_TABLE: &[(&str, &[PetLevel])] = &[
    ("Cavorting Bones", &[necro(1, 8, 2), necro(2, 9, 3), necro(3, 10, 4)]),
    ("Leering Corpse", &[necro(4, 10, 4), necro(5, 12, 5), necro(6, 14, 6)]),
    ("Bone Walk", &[necro(8, 16, 7), necro(9, 18, 8), necro(10, 20, 9)]),
    ("Convoke Shadow", &[necro(12, 22, 10), necro(13, 24, 11), necro(14, 26, 12)]),
    ("Restless Bones", &[necro(15, 26, 12), necro(16, 28, 13), necro(17, 30, 14)]),
    ("Animate Dead", &[necro(18, 32, 15), necro(19, 34, 16), necro(20, 36, 17)]),
    ("Haunting Corpse", &[necro(21, 38, 18), necro(22, 40, 19), necro(23, 42, 20)]),
    ("Summon Dead", &[necro(24, 44, 21), necro(25, 46, 22), necro(26, 48, 23)]),
    ("Invoke Shadow", &[necro(27, 50, 24), necro(28, 52, 25), necro(29, 54, 26)]),
    ("Malignant Dead", &[necro(30, 56, 27), necro(31, 58, 28), necro(32, 60, 29)]),
    ("Cackling Bones", &[necro(33, 62, 30), necro(34, 64, 31), necro(35, 66, 32)]),
    ("Invoke Death", &[necro(39, 74, 36), necro(40, 76, 37), necro(41, 78, 38)]),
    ("Elementalkin: Fire", &[fire(4, 10, 3), fire(5, 12, 4), fire(6, 14, 5)]),
    ("Elementaling: Fire", &[fire(10, 20, 6), fire(11, 22, 7), fire(12, 24, 8)]),
    ("Elemental: Fire", &[fire(16, 30, 9), fire(17, 32, 10), fire(18, 34, 11)]),
    ("Minor Conjuration: Fire", &[fire(22, 42, 12), fire(23, 44, 13), fire(24, 46, 14)]),
    ("Lesser Conjuration: Fire", &[fire(28, 54, 15), fire(29, 56, 16), fire(30, 58, 17)]),
    ("Conjuration: Fire", &[fire(34, 66, 18), fire(35, 68, 19), fire(36, 70, 20)]),
    ("Elementalkin: Water", &[plain(4, 10), plain(5, 12), plain(6, 14)]),
    ("Elementaling: Water", &[plain(10, 20), plain(11, 22), plain(12, 24)]),
    ("Elemental: Water", &[plain(16, 30), plain(17, 32), plain(18, 34)]),
    ("Minor Conjuration: Water", &[plain(22, 42), plain(23, 44), plain(24, 46)]),
    ("Lesser Conjuration: Water", &[plain(28, 54), plain(29, 56), plain(30, 58)]),
    ("Conjuration: Water", &[plain(34, 66), plain(35, 68), plain(36, 70)]),
];

/// Level signatures for the pet a spell summons, lowest level first.
pub fn lookup_pet_levels(spell_name: &str) -> Option<&'static [PetLevel]> {
    PET_TABLE
        .iter()
        .find(|(name, _)| *name == spell_name)
        .map(|(_, levels)| *levels)
}

pub fn is_pet_spell(spell_name: &str) -> bool {
    lookup_pet_levels(spell_name).is_some()
}

/// Which delayed announcement a non-melee hit is being checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PetSignal {
    Lifetap,
    DamageShield,
}

#[derive(Clone, Debug)]
pub struct Pet {
    pub name: String,
    pub owner: String,
    /// Summoning spell. Unknown when the pet was found through `/pet leader`.
    pub spell: Option<String>,
    pub level: Option<PetLevel>,
    pub max_melee: i64,
    pub lifetap_pending: bool,
    pub damage_shield_pending: bool,
    pub procced: bool,
    /// Line sequence number the pending flags were armed on.
    armed_on: u64,
    pub seen_at: NaiveDateTime,
}

impl Pet {
    pub fn new(name: &str, owner: &str, spell: Option<&str>, seen_at: NaiveDateTime) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            spell: spell.map(str::to_string),
            level: None,
            max_melee: 0,
            lifetap_pending: false,
            damage_shield_pending: false,
            procced: false,
            armed_on: 0,
            seen_at,
        }
    }

    pub fn levels(&self) -> &'static [PetLevel] {
        self.spell
            .as_deref()
            .and_then(lookup_pet_levels)
            .unwrap_or(&[])
    }

    /// Only summoned elementals carry a damage shield.
    pub fn has_damage_shield(&self) -> bool {
        self.levels().iter().any(|level| level.damage_shield.is_some())
    }

    pub fn arm(&mut self, signal: PetSignal, line_seq: u64) {
        match signal {
            PetSignal::Lifetap => self.lifetap_pending = true,
            PetSignal::DamageShield => self.damage_shield_pending = true,
        }
        self.armed_on = line_seq;
    }

    pub fn arm_proc(&mut self, line_seq: u64) {
        self.procced = true;
        self.armed_on = line_seq;
    }

    /// Flags only describe the line right after the one that armed them.
    pub fn expire_flags(&mut self, line_seq: u64) {
        if line_seq > self.armed_on + 1 {
            self.clear_flags();
        }
    }

    pub fn clear_flags(&mut self) {
        self.lifetap_pending = false;
        self.damage_shield_pending = false;
        self.procced = false;
    }

    pub fn pending_signal(&self) -> Option<PetSignal> {
        if self.lifetap_pending {
            Some(PetSignal::Lifetap)
        } else if self.damage_shield_pending {
            Some(PetSignal::DamageShield)
        } else {
            None
        }
    }

    /// Whether `amount` is this pet's lifetap or damage shield value.
    ///
    /// With no known level, the level table is searched and a matching level
    /// is adopted as the pet's level.
    pub fn matches_signal(&mut self, signal: PetSignal, amount: i64) -> bool {
        let value_of = |level: &PetLevel| match signal {
            PetSignal::Lifetap => level.lifetap_proc,
            PetSignal::DamageShield => level.damage_shield,
        };

        if let Some(level) = self.level {
            return value_of(&level) == Some(amount);
        }

        match self
            .levels()
            .iter()
            .find(|level| value_of(level) == Some(amount))
        {
            Some(level) => {
                log::debug!("{} identified as level {} by {:?} of {}", self.name, level.level, signal, amount);
                self.level = Some(*level);
                true
            }
            None => false,
        }
    }

    /// Track the pet's own melee hits. Returns the level adopted if it changed.
    pub fn observe_melee(&mut self, amount: i64) -> Option<PetLevel> {
        if amount <= self.max_melee {
            return None;
        }
        self.max_melee = amount;

        let candidate = self
            .levels()
            .iter()
            .find(|level| level.max_melee >= amount)
            .copied()?;

        let raised = self
            .level
            .map_or(true, |current| candidate.level > current.level);
        if raised {
            self.level = Some(candidate);
            Some(candidate)
        } else {
            None
        }
    }
}
