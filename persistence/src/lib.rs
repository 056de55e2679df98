//! Multi-tenant SQLite persistence layer: games, PGNs, per-move and
//! per-game analysis, import session lifecycle, and rate-limit counters.
//! Generalizes the teacher's single-tenant desktop `persistence` module
//! (JSON session/position stores for one local player) into the
//! analytics schema described in spec §3.

mod analysis;
mod canonical;
mod database;
mod error;
mod games;
mod import_sessions;
mod models;
mod usage;

pub use analysis::{AnalysisIdentity, AnalysisStore};
pub use canonical::canonical_user_id;
pub use database::Database;
pub use error::PersistenceError;
pub use games::GameStore;
pub use import_sessions::ImportSessionStore;
pub use models::{Game, GameAnalysisRow, ImportPhase, ImportSessionRow, MoveAnalysisRow};
pub use usage::UsageStore;
