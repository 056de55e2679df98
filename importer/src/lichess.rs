//! Lichess adapter: `since`/`until` millisecond-epoch cursors over the
//! games-export endpoint, Accept-header negotiated for concatenated PGN.

use async_trait::async_trait;
use chess_common::{GameResult, PlayerColor};
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::client::{FetchPage, FetchedGame, PlatformClient};
use crate::error::FetchError;

const LICHESS_BASE: &str = "https://lichess.org";

pub struct LichessClient {
    http: Client,
}

impl LichessClient {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client with a fixed timeout always builds"),
        }
    }

    async fn fetch_window(
        &self,
        user_id: &str,
        since_ms: Option<i64>,
        until_ms: Option<i64>,
        max_games: usize,
    ) -> Result<Vec<FetchedGame>, FetchError> {
        let mut url = format!("{LICHESS_BASE}/api/games/user/{user_id}?max={max_games}&opening=true&pgnInJson=false");
        if let Some(since) = since_ms {
            url.push_str(&format!("&since={since}"));
        }
        if let Some(until) = until_ms {
            url.push_str(&format!("&until={until}"));
        }

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/x-chess-pgn")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(format!("no such lichess user: {user_id}")));
        }
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::rate_limited("lichess rate limit"));
        }
        let body = response.text().await.map_err(|e| FetchError::from_reqwest(&e))?;

        Ok(split_concatenated_pgn(&body)
            .into_iter()
            .filter_map(|pgn| parse_lichess_game(user_id, &pgn))
            .collect())
    }
}

impl Default for LichessClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformClient for LichessClient {
    fn cursor_for_played_at(&self, played_at: DateTime<Utc>) -> String {
        played_at.timestamp_millis().to_string()
    }

    async fn fetch_newer_than(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        max_games: usize,
    ) -> Result<FetchPage, FetchError> {
        let since_ms = cursor.and_then(|c| c.parse::<i64>().ok());
        let games = self.fetch_window(user_id, since_ms, None, max_games).await?;

        // Probing forward: the next call should only see games newer than
        // the newest one just fetched. An empty batch leaves the cursor
        // unchanged, so a retry probes the same window again (spec §4.2's
        // "three consecutive empty batches" counts these retries).
        let next_cursor = games
            .iter()
            .filter_map(|g| g.played_at)
            .max()
            .map(|newest| (newest.timestamp_millis() + 1).to_string())
            .or_else(|| cursor.map(str::to_string));

        Ok(FetchPage { games, next_cursor })
    }

    async fn fetch_older_than(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        max_games: usize,
    ) -> Result<FetchPage, FetchError> {
        let until_ms = match cursor {
            Some(c) => Some(c.parse::<i64>().map_err(|_| FetchError::parse_error("malformed lichess cursor"))?),
            None => None,
        };
        let games = self.fetch_window(user_id, None, until_ms, max_games).await?;

        // Paging older: subtract 1 ms from the oldest fetched game's
        // timestamp to avoid refetching the boundary game (spec §4.2).
        // An empty batch means the backfill has reached the beginning of
        // the user's history.
        let next_cursor = games
            .iter()
            .filter_map(|g| g.played_at)
            .min()
            .map(|oldest| (oldest.timestamp_millis() - 1).to_string());

        Ok(FetchPage { games, next_cursor })
    }

    async fn fetch_single_game(
        &self,
        user_id: &str,
        provider_game_id: &str,
    ) -> Result<FetchedGame, FetchError> {
        let url = format!("{LICHESS_BASE}/game/export/{provider_game_id}?opening=true");
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/x-chess-pgn")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(format!("no such game: {provider_game_id}")));
        }
        let body = response.text().await.map_err(|e| FetchError::from_reqwest(&e))?;
        parse_lichess_game(user_id, &body)
            .ok_or_else(|| FetchError::parse_error("unparseable lichess PGN"))
    }
}

/// Multiple games returned by the export endpoint are separated by a
/// blank line before the next `[Event` tag block.
fn split_concatenated_pgn(body: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        if line.trim_start().starts_with("[Event ") && !current.trim().is_empty() {
            games.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        games.push(current);
    }
    games
}

fn parse_lichess_game(user_id: &str, pgn: &str) -> Option<FetchedGame> {
    let tags = chess::pgn::parse_tags(pgn);
    let provider_game_id = tags
        .get("Site")
        .and_then(|site| site.rsplit('/').next())
        .map(str::to_string)?;

    let white = tags.get("White")?;
    let black = tags.get("Black")?;
    let color = if white.eq_ignore_ascii_case(user_id) {
        PlayerColor::White
    } else if black.eq_ignore_ascii_case(user_id) {
        PlayerColor::Black
    } else {
        return None;
    };

    let result_tag = tags.get("Result").map(String::as_str).unwrap_or("*");
    let result = match (result_tag, color) {
        ("1-0", PlayerColor::White) | ("0-1", PlayerColor::Black) => GameResult::Win,
        ("1-0", PlayerColor::Black) | ("0-1", PlayerColor::White) => GameResult::Loss,
        _ => GameResult::Draw,
    };

    let (my_rating, opponent_rating) = match color {
        PlayerColor::White => (parse_elo(&tags, "WhiteElo"), parse_elo(&tags, "BlackElo")),
        PlayerColor::Black => (parse_elo(&tags, "BlackElo"), parse_elo(&tags, "WhiteElo")),
    };

    let played_at = tags
        .get("LastMoveAt")
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .or_else(|| chess::pgn::played_at_from_tags(&tags));

    Some(FetchedGame {
        provider_game_id,
        played_at,
        color,
        result,
        my_rating,
        opponent_rating,
        time_control: tags.get("TimeControl").cloned(),
        opening: tags.get("Opening").cloned(),
        opening_family: tags.get("ECO").cloned(),
        pgn: pgn.to_string(),
    })
}

fn parse_elo(tags: &std::collections::BTreeMap<String, String>, key: &str) -> Option<i32> {
    tags.get(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Rated Blitz"]
[Site "https://lichess.org/abc12345"]
[White "alice"]
[Black "bob"]
[Result "1-0"]
[ECO "C50"]
[Opening "Italian Game"]
[WhiteElo "1800"]
[BlackElo "1790"]
[UTCDate "2025.01.01"]
[UTCTime "10:00:00"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0

[Event "Rated Blitz"]
[Site "https://lichess.org/def67890"]
[White "bob"]
[Black "alice"]
[Result "0-1"]
[ECO "B10"]
[Opening "Caro-Kann Defense"]
[WhiteElo "1790"]
[BlackElo "1800"]
[UTCDate "2025.01.02"]
[UTCTime "10:00:00"]

1. e4 c6 2. d4 d5 0-1
"#;

    #[test]
    fn test_split_concatenated_pgn_yields_two_games() {
        let games = split_concatenated_pgn(TWO_GAMES);
        assert_eq!(games.len(), 2);
        assert!(games[0].contains("abc12345"));
        assert!(games[1].contains("def67890"));
    }

    #[test]
    fn test_parse_lichess_game_assigns_color_and_result() {
        let games = split_concatenated_pgn(TWO_GAMES);
        let first = parse_lichess_game("alice", &games[0]).unwrap();
        assert_eq!(first.color, PlayerColor::White);
        assert_eq!(first.result, GameResult::Win);
        assert_eq!(first.provider_game_id, "abc12345");

        let second = parse_lichess_game("alice", &games[1]).unwrap();
        assert_eq!(second.color, PlayerColor::Black);
        assert_eq!(second.result, GameResult::Win);
    }

    #[test]
    fn test_parse_lichess_game_returns_none_for_unrelated_player() {
        let games = split_concatenated_pgn(TWO_GAMES);
        assert!(parse_lichess_game("carol", &games[0]).is_none());
    }
}
