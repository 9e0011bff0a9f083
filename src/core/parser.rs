//! Static line patterns for EverQuest log content.
//!
//! Patterns run against the text after the timestamp, anchored at its start,
//! in a fixed order: the first match wins. Spell landed/faded messages are
//! per-spell and are checked by the session instead.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::error::ParseError;

const MELEE_VERBS: &str = "hit|hits|slash|slashes|pierce|pierces|crush|crushes|kick|kicks|bash|bashes|\
punch|punches|backstab|backstabs|bite|bites|claw|claws|maul|mauls|gore|gores|sting|stings|\
strike|strikes|smash|smashes|slam|slams|rend|rends|slice|slices|shoot|shoots|frenzy on|frenzies on";

lazy_static! {
    static ref ZONING: Regex = Regex::new(r"^LOADING, PLEASE WAIT").expect("Invalid zoning regex");
    static ref EXPERIENCE: Regex =
        Regex::new(r"^You gain (?:party |raid )?experience").expect("Invalid experience regex");
    static ref YOU_SLAIN: Regex =
        Regex::new(r"^You have slain (?P<victim>.+?)!\s*$").expect("Invalid you-slain regex");
    static ref SLAIN: Regex = Regex::new(r"^(?P<victim>.+?) (?:has|have) been slain by (?P<killer>.+?)!\s*$")
        .expect("Invalid slain regex");
    static ref DIED: Regex = Regex::new(r"^(?P<victim>.+?) died\.\s*$").expect("Invalid died regex");
    static ref CAST_BEGIN: Regex =
        Regex::new(r"^You begin casting (?P<spell>.+?)\.\s*$").expect("Invalid cast regex");
    static ref NON_MELEE: Regex = Regex::new(
        r"^(?P<target>.+?) (?:was|were) hit by non-melee for (?P<amount>\d+) points? of damage\."
    )
    .expect("Invalid non-melee regex");
    static ref MELEE: Regex = Regex::new(&format!(
        r"^(?P<attacker>.+?) (?P<verb>{}) (?P<target>.+?) for (?P<amount>\d+) points? of damage\.",
        MELEE_VERBS
    ))
    .expect("Invalid melee regex");
    static ref MISS: Regex = Regex::new(
        r"^(?P<attacker>.+?) tr(?:y|ies) to (?P<verb>\w+(?: on)?) (?P<target>.+?), but .+!\s*$"
    )
    .expect("Invalid miss regex");
    static ref PET_LIFETAP: Regex =
        Regex::new(r"^(?P<pet>.+?) beams a smile at (?P<target>.+?)\.?\s*$").expect("Invalid lifetap regex");
    static ref DAMAGE_SHIELD: Regex =
        Regex::new(r"^(?P<target>.+?) was burned").expect("Invalid damage shield regex");
    static ref PET_PROC: Regex = Regex::new(r"^(?P<target>.+?) is (?:slashed by ice|engulfed by fire)")
        .expect("Invalid proc regex");
    static ref PET_GREETING: Regex =
        Regex::new(r"^(?P<pet>\w+) says,? '?At your service,? [Mm]aster")
            .expect("Invalid pet greeting regex");
    static ref PET_LEADER: Regex =
        Regex::new(r"^(?P<pet>\w+) says,? 'My leader is (?P<owner>\w+)\.")
            .expect("Invalid pet leader regex");
    static ref WHO_ENTRY: Regex =
        Regex::new(r"^\[(?:\d+ [^\]]+|ANONYMOUS)\] (?P<name>[A-Za-z]+)\b").expect("Invalid who regex");
}

/// One recognised log line, with "You"/"YOU" already resolved to the log owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Zoning,
    Experience,
    YouSlain { victim: String },
    Slain { victim: String, killer: Option<String> },
    CastBegin { spell: String },
    NonMelee { target: String, amount: i64 },
    Melee { attacker: String, verb: String, target: String, amount: i64 },
    Miss { attacker: String, target: String },
    PetLifetap { pet: String, target: String },
    DamageShield { target: String },
    PetProc { target: String },
    PetGreeting { pet: String },
    PetLeader { pet: String, owner: String },
    WhoEntry { name: String },
}

fn capture(caps: &Captures, pattern: &'static str, field: &'static str) -> Result<String, ParseError> {
    caps.name(field)
        .map(|m| m.as_str().trim().to_string())
        .ok_or(ParseError::MissingCapture { pattern, field })
}

fn amount(caps: &Captures, pattern: &'static str) -> Result<i64, ParseError> {
    capture(caps, pattern, "amount")?
        .parse()
        .map_err(|_| ParseError::MissingCapture {
            pattern,
            field: "amount",
        })
}

pub struct LineParser {
    player: String,
}

impl LineParser {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
        }
    }

    fn resolve(&self, name: String) -> String {
        match name.as_str() {
            "You" | "YOU" | "you" => self.player.clone(),
            _ => name,
        }
    }

    /// Classify the content of one line. `Ok(None)` for lines no pattern cares about.
    pub fn parse_content(&self, content: &str) -> Result<Option<LineEvent>, ParseError> {
        let content = content.trim_end();

        if ZONING.is_match(content) {
            return Ok(Some(LineEvent::Zoning));
        }
        if EXPERIENCE.is_match(content) {
            return Ok(Some(LineEvent::Experience));
        }
        if let Some(caps) = YOU_SLAIN.captures(content) {
            let victim = capture(&caps, "you_slain", "victim")?;
            return Ok(Some(LineEvent::YouSlain { victim }));
        }
        if let Some(caps) = SLAIN.captures(content) {
            let victim = self.resolve(capture(&caps, "slain", "victim")?);
            let killer = Some(self.resolve(capture(&caps, "slain", "killer")?));
            return Ok(Some(LineEvent::Slain { victim, killer }));
        }
        if let Some(caps) = CAST_BEGIN.captures(content) {
            let spell = capture(&caps, "cast_begin", "spell")?;
            return Ok(Some(LineEvent::CastBegin { spell }));
        }
        if let Some(caps) = NON_MELEE.captures(content) {
            let target = self.resolve(capture(&caps, "non_melee", "target")?);
            let amount = amount(&caps, "non_melee")?;
            return Ok(Some(LineEvent::NonMelee { target, amount }));
        }
        if let Some(caps) = MELEE.captures(content) {
            let attacker = self.resolve(capture(&caps, "melee", "attacker")?);
            let verb = capture(&caps, "melee", "verb")?;
            let target = self.resolve(capture(&caps, "melee", "target")?);
            let amount = amount(&caps, "melee")?;
            return Ok(Some(LineEvent::Melee {
                attacker,
                verb,
                target,
                amount,
            }));
        }
        if let Some(caps) = MISS.captures(content) {
            let attacker = self.resolve(capture(&caps, "miss", "attacker")?);
            let target = self.resolve(capture(&caps, "miss", "target")?);
            return Ok(Some(LineEvent::Miss { attacker, target }));
        }
        if let Some(caps) = PET_LIFETAP.captures(content) {
            let pet = capture(&caps, "pet_lifetap", "pet")?;
            let target = capture(&caps, "pet_lifetap", "target")?;
            return Ok(Some(LineEvent::PetLifetap { pet, target }));
        }
        if let Some(caps) = DAMAGE_SHIELD.captures(content) {
            let target = capture(&caps, "damage_shield", "target")?;
            return Ok(Some(LineEvent::DamageShield { target }));
        }
        if let Some(caps) = PET_PROC.captures(content) {
            let target = capture(&caps, "pet_proc", "target")?;
            return Ok(Some(LineEvent::PetProc { target }));
        }
        if let Some(caps) = PET_LEADER.captures(content) {
            let pet = capture(&caps, "pet_leader", "pet")?;
            let owner = capture(&caps, "pet_leader", "owner")?;
            return Ok(Some(LineEvent::PetLeader { pet, owner }));
        }
        if let Some(caps) = PET_GREETING.captures(content) {
            let pet = capture(&caps, "pet_greeting", "pet")?;
            return Ok(Some(LineEvent::PetGreeting { pet }));
        }
        if let Some(caps) = WHO_ENTRY.captures(content) {
            let name = capture(&caps, "who", "name")?;
            return Ok(Some(LineEvent::WhoEntry { name }));
        }
        if let Some(caps) = DIED.captures(content) {
            let victim = self.resolve(capture(&caps, "died", "victim")?);
            return Ok(Some(LineEvent::Slain {
                victim,
                killer: None,
            }));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Option<LineEvent> {
        LineParser::new("Soandso").parse_content(content).unwrap()
    }

    #[test]
    fn test_parse_player_melee() {
        assert_eq!(
            parse("You slash a gnoll pup for 12 points of damage."),
            Some(LineEvent::Melee {
                attacker: "Soandso".to_string(),
                verb: "slash".to_string(),
                target: "a gnoll pup".to_string(),
                amount: 12,
            })
        );
    }

    #[test]
    fn test_parse_incoming_melee() {
        assert_eq!(
            parse("A gnoll pup hits YOU for 3 points of damage."),
            Some(LineEvent::Melee {
                attacker: "A gnoll pup".to_string(),
                verb: "hits".to_string(),
                target: "Soandso".to_string(),
                amount: 3,
            })
        );
        assert!(matches!(
            parse("A gnoll pup frenzies on YOU for 1 point of damage."),
            Some(LineEvent::Melee { amount: 1, .. })
        ));
    }

    #[test]
    fn test_non_melee_wins_over_melee() {
        assert_eq!(
            parse("a gnoll pup was hit by non-melee for 25 points of damage."),
            Some(LineEvent::NonMelee {
                target: "a gnoll pup".to_string(),
                amount: 25,
            })
        );
    }

    #[test]
    fn test_parse_misses() {
        assert_eq!(
            parse("You try to slash a gnoll pup, but miss!"),
            Some(LineEvent::Miss {
                attacker: "Soandso".to_string(),
                target: "a gnoll pup".to_string(),
            })
        );
        assert_eq!(
            parse("A gnoll pup tries to hit YOU, but YOU parry!"),
            Some(LineEvent::Miss {
                attacker: "A gnoll pup".to_string(),
                target: "Soandso".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_deaths() {
        assert_eq!(
            parse("You have slain a gnoll pup!"),
            Some(LineEvent::YouSlain {
                victim: "a gnoll pup".to_string()
            })
        );
        assert_eq!(
            parse("a gnoll pup has been slain by Gobaner!"),
            Some(LineEvent::Slain {
                victim: "a gnoll pup".to_string(),
                killer: Some("Gobaner".to_string()),
            })
        );
        assert_eq!(
            parse("You have been slain by a gnoll pup!"),
            Some(LineEvent::Slain {
                victim: "Soandso".to_string(),
                killer: Some("a gnoll pup".to_string()),
            })
        );
        assert_eq!(
            parse("a fire beetle died."),
            Some(LineEvent::Slain {
                victim: "a fire beetle".to_string(),
                killer: None,
            })
        );
    }

    #[test]
    fn test_parse_session_markers() {
        assert_eq!(parse("LOADING, PLEASE WAIT..."), Some(LineEvent::Zoning));
        assert_eq!(parse("You gain experience!!"), Some(LineEvent::Experience));
        assert_eq!(parse("You gain party experience!!"), Some(LineEvent::Experience));
        assert_eq!(
            parse("You begin casting Splurt."),
            Some(LineEvent::CastBegin {
                spell: "Splurt".to_string()
            })
        );
    }

    #[test]
    fn test_parse_pet_phrases() {
        assert_eq!(
            parse("Gobaner beams a smile at a gnoll pup"),
            Some(LineEvent::PetLifetap {
                pet: "Gobaner".to_string(),
                target: "a gnoll pup".to_string(),
            })
        );
        assert_eq!(
            parse("a gnoll pup was burned."),
            Some(LineEvent::DamageShield {
                target: "a gnoll pup".to_string()
            })
        );
        assert_eq!(
            parse("a gnoll pup is slashed by ice."),
            Some(LineEvent::PetProc {
                target: "a gnoll pup".to_string()
            })
        );
        assert_eq!(
            parse("Gobaner says 'At your service Master.'"),
            Some(LineEvent::PetGreeting {
                pet: "Gobaner".to_string()
            })
        );
        assert_eq!(
            parse("Gobaner says, 'My leader is Soandso.'"),
            Some(LineEvent::PetLeader {
                pet: "Gobaner".to_string(),
                owner: "Soandso".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_who_entries() {
        assert_eq!(
            parse("[60 Necromancer] Xyzzy (Dark Elf) <Guild of Rot>"),
            Some(LineEvent::WhoEntry {
                name: "Xyzzy".to_string()
            })
        );
        assert_eq!(
            parse("[ANONYMOUS] Plugh"),
            Some(LineEvent::WhoEntry {
                name: "Plugh".to_string()
            })
        );
    }

    #[test]
    fn test_unrecognised_line() {
        assert_eq!(parse("Soandso tells the group, 'inc'"), None);
        assert_eq!(parse(""), None);
    }
}
