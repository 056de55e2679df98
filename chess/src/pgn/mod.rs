//! PGN (Portable Game Notation) parsing: tag-pair headers and movetext.

pub mod san;
pub mod tags;

pub use san::{parse_san, SanError};
pub use tags::{parse_tags, played_at_from_tags, GameResultTag};

/// A single half-move extracted from PGN movetext, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovetextEntry {
    pub ply: u32,
    pub san: String,
}

/// Split PGN movetext into ordered SAN tokens, stripping move numbers,
/// comments (`{...}`), variations (`(...)`), NAGs (`$n`), and the trailing
/// result token.
pub fn tokenize_movetext(movetext: &str) -> Vec<MovetextEntry> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut depth = 0i32;
    let mut chars = movetext.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            '(' if depth == 0 => {
                // Skip a balanced variation at top level.
                let mut vdepth = 1;
                for vc in chars.by_ref() {
                    match vc {
                        '(' => vdepth += 1,
                        ')' => {
                            vdepth -= 1;
                            if vdepth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ if depth > 0 => {}
            _ => cleaned.push(c),
        }
    }

    let mut entries = Vec::new();
    let mut ply: u32 = 0;
    for raw_token in cleaned.split_whitespace() {
        let token = raw_token.trim();
        if token.is_empty() || token.starts_with('$') {
            continue;
        }
        if is_result_token(token) {
            continue;
        }
        // Strip leading move-number markers like "1." or "12...".
        let san = strip_move_number(token);
        if san.is_empty() {
            continue;
        }
        ply += 1;
        entries.push(MovetextEntry {
            ply,
            san: san.to_string(),
        });
    }
    entries
}

fn is_result_token(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

fn strip_move_number(token: &str) -> &str {
    token.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_move_numbers() {
        let movetext = "1. e4 e5 2. Nf3 Nc6 1-0";
        let entries = tokenize_movetext(movetext);
        let sans: Vec<&str> = entries.iter().map(|e| e.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert_eq!(entries[0].ply, 1);
        assert_eq!(entries[3].ply, 4);
    }

    #[test]
    fn test_tokenize_strips_comments_and_variations() {
        let movetext = "1. e4 {good move} e5 (1... c5 2. Nf3) 2. Nf3 *";
        let entries = tokenize_movetext(movetext);
        let sans: Vec<&str> = entries.iter().map(|e| e.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_tokenize_strips_nags() {
        let movetext = "1. e4 $1 e5 $2 1/2-1/2";
        let entries = tokenize_movetext(movetext);
        let sans: Vec<&str> = entries.iter().map(|e| e.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5"]);
    }
}
