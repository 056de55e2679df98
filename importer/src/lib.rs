//! Platform import (spec §4.2): pulls games from Lichess and Chess.com
//! behind one `PlatformClient` trait, drives the two-phase probe/backfill
//! scan, and upserts into the Game store. Generalizes the teacher's single
//! local-PGN ingestion path into a resumable, rate-aware remote importer.

mod batching;
mod chesscom;
mod client;
mod error;
mod lichess;
mod limiter;
mod session;

pub use batching::{batch_size_for, delay_for, should_emit_progress, should_run_gc};
pub use chesscom::ChessComClient;
pub use client::{FetchPage, FetchedGame, PlatformClient};
pub use error::{FailureTag, FetchError, ImporterError};
pub use lichess::LichessClient;
pub use limiter::{
    ImportLimiter, ImportPermit, DEFAULT_CAPACITY, DEFAULT_SESSION_IMPORT_CAP, PRO_CAPACITY,
    PRO_SESSION_IMPORT_CAP,
};
pub use session::{fetch_and_persist_single_game, run_import, ImportOutcome, SharedClient};
