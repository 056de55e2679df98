//! PGN tag-pair header parsing.
//!
//! Ground truth for `played_at` fallback: spec §4.2 requires the `[UTCDate]`
//! and `[UTCTime]` tags to be read from **separate lines**, each tested
//! independently. A known legacy bug tested a single line against both
//! prefixes (effectively requiring one line to start with two different
//! strings at once), which silently dropped the fallback date whenever the
//! platform API's own `played_at` was absent. `parse_tags` stores each tag
//! line in a map keyed by tag name, so the two tags can never collapse onto
//! a single line comparison again.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResultTag {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

impl GameResultTag {
    pub fn from_tag_value(value: &str) -> Self {
        match value {
            "1-0" => Self::WhiteWins,
            "0-1" => Self::BlackWins,
            "1/2-1/2" => Self::Draw,
            _ => Self::Unknown,
        }
    }
}

/// Parse PGN tag-pair lines (`[Name "Value"]`) into a name→value map.
/// Unrecognized or malformed lines are skipped; this is a tolerant parser
/// since `played_at_from_tags` is a fallback path, not the primary source
/// of truth (the platform API is).
pub fn parse_tags(pgn: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    for line in pgn.lines() {
        let line = line.trim();
        if !line.starts_with('[') || !line.ends_with(']') {
            continue;
        }
        let inner = &line[1..line.len() - 1];
        let Some(space_idx) = inner.find(' ') else {
            continue;
        };
        let name = inner[..space_idx].trim();
        let rest = inner[space_idx..].trim();
        let Some(value) = rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
            continue;
        };
        tags.insert(name.to_string(), value.to_string());
    }
    tags
}

/// Derive `played_at` from `[UTCDate]` + `[UTCTime]` tags. Both tags must be
/// present — per spec §4.2 this is the defensive replacement for the legacy
/// single-line bug. Returns `None` if either tag is missing or malformed,
/// never guesses from a partial pair.
pub fn played_at_from_tags(tags: &BTreeMap<String, String>) -> Option<DateTime<Utc>> {
    let date_str = tags.get("UTCDate")?;
    let time_str = tags.get("UTCTime")?;

    // PGN UTCDate uses "YYYY.MM.DD".
    let date = NaiveDate::parse_from_str(date_str, "%Y.%m.%d").ok()?;
    let time = NaiveTime::parse_from_str(time_str, "%H:%M:%S").ok()?;
    let naive = NaiveDateTime::new(date, time);
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[Event "Rated Blitz game"]
[Site "https://lichess.org/abc12345"]
[Date "2025.02.03"]
[White "alice"]
[Black "bob"]
[Result "1-0"]
[UTCDate "2025.02.03"]
[UTCTime "14:32:10"]
[WhiteElo "1850"]
[BlackElo "1790"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

    #[test]
    fn test_parse_tags_extracts_all_pairs() {
        let tags = parse_tags(SAMPLE);
        assert_eq!(tags.get("White").map(String::as_str), Some("alice"));
        assert_eq!(tags.get("Result").map(String::as_str), Some("1-0"));
    }

    #[test]
    fn test_played_at_from_both_headers_present() {
        let tags = parse_tags(SAMPLE);
        let played_at = played_at_from_tags(&tags).expect("both headers present");
        assert_eq!(played_at.to_string(), "2025-02-03 14:32:10 UTC");
    }

    #[test]
    fn test_played_at_missing_time_header_returns_none() {
        // Regression test for the legacy bug: a PGN with only UTCDate (no
        // UTCTime on its own line) must not produce a played_at, and must
        // not panic or silently fabricate a time.
        let pgn_missing_time = r#"[Event "Casual game"]
[UTCDate "2025.02.03"]

1. e4 e5 1-0"#;
        let tags = parse_tags(pgn_missing_time);
        assert!(tags.contains_key("UTCDate"));
        assert!(!tags.contains_key("UTCTime"));
        assert!(played_at_from_tags(&tags).is_none());
    }

    #[test]
    fn test_played_at_missing_date_header_returns_none() {
        let pgn_missing_date = r#"[Event "Casual game"]
[UTCTime "14:32:10"]

1. e4 e5 1-0"#;
        let tags = parse_tags(pgn_missing_date);
        assert!(played_at_from_tags(&tags).is_none());
    }

    #[test]
    fn test_result_tag_mapping() {
        assert_eq!(GameResultTag::from_tag_value("1-0"), GameResultTag::WhiteWins);
        assert_eq!(GameResultTag::from_tag_value("0-1"), GameResultTag::BlackWins);
        assert_eq!(GameResultTag::from_tag_value("1/2-1/2"), GameResultTag::Draw);
        assert_eq!(GameResultTag::from_tag_value("*"), GameResultTag::Unknown);
    }
}
