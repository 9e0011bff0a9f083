//! Timestamp prefix handling for EverQuest log lines.
//!
//! Every line starts with a fixed-width bracketed stamp:
//! `[Wed Mar 13 21:04:55 2024] You begin casting Splurt.`

use chrono::NaiveDateTime;

use super::error::ParseError;

/// Width of the bracketed prefix, brackets included.
pub const TIMESTAMP_WIDTH: usize = 26;

const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// A log line split into its timestamp and the text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: NaiveDateTime,
    pub content: String,
}

impl LogLine {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_start_matches('\u{feff}');
        let timestamp = parse_timestamp(line)?;
        Ok(Self {
            timestamp,
            content: content_of(line).to_string(),
        })
    }
}

/// Parse the leading `[Ddd Mon DD HH:MM:SS YYYY]` span.
pub fn parse_timestamp(line: &str) -> Result<NaiveDateTime, ParseError> {
    let malformed = || ParseError::MalformedTimestamp {
        line: line.to_string(),
    };

    let prefix = line.get(..TIMESTAMP_WIDTH).ok_or_else(malformed)?;
    let inner = prefix
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(malformed)?;

    NaiveDateTime::parse_from_str(inner, TIMESTAMP_FORMAT).map_err(|_| malformed())
}

/// Text after the prefix and its separating space. Callers validate the prefix first.
pub fn content_of(line: &str) -> &str {
    let rest = line.get(TIMESTAMP_WIDTH..).unwrap_or("");
    rest.strip_prefix(' ').unwrap_or(rest).trim_end_matches(&['\r', '\n'][..])
}

/// Render a timestamp the way the game writes it, for building log lines.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    format!("[{}]", timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("[Wed Mar 13 21:04:55 2024] You begin casting Splurt.").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 13);
        assert_eq!(ts.hour(), 21);
        assert_eq!(ts.second(), 55);
    }

    #[test]
    fn test_content_offset() {
        let line = LogLine::parse("[Wed Mar 13 21:04:55 2024] LOADING, PLEASE WAIT...").unwrap();
        assert_eq!(line.content, "LOADING, PLEASE WAIT...");
    }

    #[test]
    fn test_malformed_prefix_is_rejected() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("You begin casting Splurt.").is_err());
        assert!(parse_timestamp("[Wed Mar 13 21:04:55 2024 ] oops").is_err());
        assert!(parse_timestamp("[Xyz Foo 99 21:04:55 2024] bad").is_err());
        assert!(matches!(
            LogLine::parse("garbage"),
            Err(ParseError::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let ts = parse_timestamp("[Mon Jan 01 09:00:00 2024] x").unwrap();
        let line = format!("{} hello", format_timestamp(&ts));
        assert_eq!(LogLine::parse(&line).unwrap().timestamp, ts);
    }
}
