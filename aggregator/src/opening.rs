//! Opening classification (spec §4.6): canonicalize a raw PGN opening
//! label into a small curated table, and classify which side "owns" it.
//! The table is deliberately small — spec.md §1 excludes an opening-theory
//! database as a Non-goal; only the classification *logic* is in scope.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningOwner {
    White,
    Black,
    Neutral,
}

struct OpeningEntry {
    eco_prefix: &'static str,
    canonical_name: &'static str,
    owner: OpeningOwner,
    first_half_moves: &'static [&'static str],
}

const OPENING_TABLE: &[OpeningEntry] = &[
    OpeningEntry {
        eco_prefix: "C50",
        canonical_name: "Italian Game",
        owner: OpeningOwner::White,
        first_half_moves: &["e4", "e5", "Nf3", "Nc6", "Bc4"],
    },
    OpeningEntry {
        eco_prefix: "C60",
        canonical_name: "Ruy Lopez",
        owner: OpeningOwner::White,
        first_half_moves: &["e4", "e5", "Nf3", "Nc6", "Bb5"],
    },
    OpeningEntry {
        eco_prefix: "B10",
        canonical_name: "Caro-Kann Defense",
        owner: OpeningOwner::Black,
        first_half_moves: &["e4", "c6"],
    },
    OpeningEntry {
        eco_prefix: "B20",
        canonical_name: "Sicilian Defense",
        owner: OpeningOwner::Black,
        first_half_moves: &["e4", "c5"],
    },
    OpeningEntry {
        eco_prefix: "C00",
        canonical_name: "French Defense",
        owner: OpeningOwner::Black,
        first_half_moves: &["e4", "e6"],
    },
    OpeningEntry {
        eco_prefix: "D30",
        canonical_name: "Queen's Gambit",
        owner: OpeningOwner::White,
        first_half_moves: &["d4", "d5", "c4"],
    },
    OpeningEntry {
        eco_prefix: "A40",
        canonical_name: "Queen's Pawn Game",
        owner: OpeningOwner::Neutral,
        first_half_moves: &["d4"],
    },
    OpeningEntry {
        eco_prefix: "E60",
        canonical_name: "King's Indian Defense",
        owner: OpeningOwner::Black,
        first_half_moves: &["d4", "Nf6", "c4", "g6"],
    },
    OpeningEntry {
        eco_prefix: "B00",
        canonical_name: "King's Pawn Opening",
        owner: OpeningOwner::Neutral,
        first_half_moves: &["e4"],
    },
];

fn looks_like_eco(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3
        && matches!(bytes[0], b'A'..=b'E')
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
}

fn find_by_eco(code: &str) -> Option<&'static OpeningEntry> {
    OPENING_TABLE.iter().find(|e| code.starts_with(e.eco_prefix) || e.eco_prefix.starts_with(code))
}

fn find_by_name(name: &str) -> Option<&'static OpeningEntry> {
    let normalized = name.trim().to_lowercase();
    OPENING_TABLE
        .iter()
        .find(|e| e.canonical_name.to_lowercase() == normalized)
}

fn find_by_moves(moves: &[String]) -> Option<&'static OpeningEntry> {
    OPENING_TABLE
        .iter()
        .filter(|e| moves.len() >= e.first_half_moves.len())
        .find(|e| moves.iter().zip(e.first_half_moves).all(|(a, b)| a == b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedOpening {
    pub canonical_name: String,
    pub owner: OpeningOwner,
}

/// Classify an opening using priority order: ECO code, then opening-name
/// field (normalized), then first-6-half-moves table match, then a
/// first-half-move fallback.
pub fn classify_opening(
    opening_family: Option<&str>,
    opening_name: Option<&str>,
    first_half_moves: &[String],
) -> Option<ClassifiedOpening> {
    if let Some(family) = opening_family {
        if looks_like_eco(family) {
            if let Some(entry) = find_by_eco(family) {
                return Some(ClassifiedOpening {
                    canonical_name: entry.canonical_name.to_string(),
                    owner: entry.owner,
                });
            }
        }
    }

    if let Some(name) = opening_name {
        if let Some(entry) = find_by_name(name) {
            return Some(ClassifiedOpening {
                canonical_name: entry.canonical_name.to_string(),
                owner: entry.owner,
            });
        }
    }

    if let Some(entry) = find_by_moves(first_half_moves) {
        return Some(ClassifiedOpening {
            canonical_name: entry.canonical_name.to_string(),
            owner: entry.owner,
        });
    }

    match first_half_moves.first().map(String::as_str) {
        Some("e4") => Some(ClassifiedOpening {
            canonical_name: "King's Pawn Opening".to_string(),
            owner: OpeningOwner::Neutral,
        }),
        Some("d4") => Some(ClassifiedOpening {
            canonical_name: "Queen's Pawn Game".to_string(),
            owner: OpeningOwner::Neutral,
        }),
        _ => None,
    }
}

/// Reverse lookup used by the importer's opening-family backfill: given a
/// raw `[Opening]` tag value, return the ECO-coded family prefix the
/// curated table associates with it, if any.
pub fn eco_prefix_for_name(name: &str) -> Option<&'static str> {
    find_by_name(name).map(|e| e.eco_prefix)
}

/// Spec §4.6's "critical" filter rule: for player-repertoire stats, a
/// game only counts toward `player_color`'s openings if the canonical
/// opening's owner matches that color or is neutral. Applying this at
/// one call site (rather than re-deriving it at each stats endpoint) is
/// what prevents the "Caro-Kann under white openings" defect.
pub fn counts_toward_repertoire(opening: &ClassifiedOpening, player_color: chess_common::PlayerColor) -> bool {
    match (opening.owner, player_color) {
        (OpeningOwner::Neutral, _) => true,
        (OpeningOwner::White, chess_common::PlayerColor::White) => true,
        (OpeningOwner::Black, chess_common::PlayerColor::Black) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::PlayerColor;

    #[test]
    fn test_eco_code_priority_match() {
        let opening = classify_opening(Some("C50"), Some("Something Else"), &[]).unwrap();
        assert_eq!(opening.canonical_name, "Italian Game");
        assert_eq!(opening.owner, OpeningOwner::White);
    }

    #[test]
    fn test_eco_prefix_for_name_matches_case_insensitively() {
        assert_eq!(eco_prefix_for_name("caro-kann defense"), Some("B10"));
        assert_eq!(eco_prefix_for_name("Not A Real Opening"), None);
    }

    #[test]
    fn test_name_match_when_no_eco() {
        let opening = classify_opening(None, Some("caro-kann defense"), &[]).unwrap();
        assert_eq!(opening.canonical_name, "Caro-Kann Defense");
        assert_eq!(opening.owner, OpeningOwner::Black);
    }

    #[test]
    fn test_move_table_fallback() {
        let moves = vec!["e4".to_string(), "c5".to_string()];
        let opening = classify_opening(None, None, &moves).unwrap();
        assert_eq!(opening.canonical_name, "Sicilian Defense");
    }

    #[test]
    fn test_first_move_basic_fallback() {
        let moves = vec!["e4".to_string(), "e6".to_string(), "Nc3".to_string()];
        // french defense matches the table directly via first_half_moves
        let opening = classify_opening(None, None, &moves).unwrap();
        assert_eq!(opening.canonical_name, "French Defense");
    }

    #[test]
    fn test_repertoire_filter_excludes_caro_kann_from_white_openings() {
        let caro_kann = ClassifiedOpening {
            canonical_name: "Caro-Kann Defense".to_string(),
            owner: OpeningOwner::Black,
        };
        assert!(!counts_toward_repertoire(&caro_kann, PlayerColor::White));
        assert!(counts_toward_repertoire(&caro_kann, PlayerColor::Black));
    }

    #[test]
    fn test_neutral_opening_counts_for_either_color() {
        let queens_pawn = ClassifiedOpening {
            canonical_name: "Queen's Pawn Game".to_string(),
            owner: OpeningOwner::Neutral,
        };
        assert!(counts_toward_repertoire(&queens_pawn, PlayerColor::White));
        assert!(counts_toward_repertoire(&queens_pawn, PlayerColor::Black));
    }
}
