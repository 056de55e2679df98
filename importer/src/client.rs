//! `PlatformClient` abstracts the two platform adapters behind one trait,
//! mirroring the teacher's `ChessService` abstraction (one trait, swappable
//! real vs. mock implementations) so `session` stays platform-agnostic.

use async_trait::async_trait;
use chess_common::{GameResult, PlayerColor};
use chrono::{DateTime, Utc};

use crate::error::FetchError;

/// One game as reported by a platform API, before it is mapped into a
/// `persistence::Game` row. `played_at` is the platform's own timestamp
/// when present; callers fall back to PGN tag parsing when it is `None`.
#[derive(Debug, Clone)]
pub struct FetchedGame {
    pub provider_game_id: String,
    pub played_at: Option<DateTime<Utc>>,
    pub color: PlayerColor,
    pub result: GameResult,
    pub my_rating: Option<i32>,
    pub opponent_rating: Option<i32>,
    pub time_control: Option<String>,
    pub opening: Option<String>,
    pub opening_family: Option<String>,
    pub pgn: String,
}

/// A page of games plus a cursor to resume from, in the direction the
/// caller requested (newer or older).
#[derive(Debug, Clone)]
pub struct FetchPage {
    pub games: Vec<FetchedGame>,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Encode a bootstrap cursor pointing at `played_at`, in whatever
    /// opaque format this platform's `fetch_newer_than`/`fetch_older_than`
    /// expect. Lets the two-phase driver anchor a fresh probe/backfill at
    /// the Game store's newest/oldest row without knowing either
    /// platform's cursor internals.
    fn cursor_for_played_at(&self, played_at: DateTime<Utc>) -> String;

    /// Fetch games played strictly after `cursor` (probe-new phase).
    /// `cursor` is `None` on the very first probe for a user with no
    /// prior games.
    async fn fetch_newer_than(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        max_games: usize,
    ) -> Result<FetchPage, FetchError>;

    /// Fetch games played strictly before `cursor` (backfill-old phase).
    /// `cursor` is `None` the very first time a user is backfilled (no
    /// Game rows exist yet to anchor an oldest-known timestamp).
    async fn fetch_older_than(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        max_games: usize,
    ) -> Result<FetchPage, FetchError>;

    /// Single-game fallback fetch when analysis needs a PGN the importer
    /// never stored (spec §4.2's "Fallback PGN fetch").
    async fn fetch_single_game(
        &self,
        user_id: &str,
        provider_game_id: &str,
    ) -> Result<FetchedGame, FetchError>;
}
