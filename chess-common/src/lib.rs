//! Shared primitives with no I/O, used by every other crate in the
//! workspace: platform identity and canonicalization, player-facing result
//! types, and the analysis-type discriminator that threads through
//! persistence, importer and aggregator identities alike.

pub mod platform;
pub mod result;

pub use platform::{Platform, UnknownPlatformError};
pub use result::{AnalysisType, GameResult, PlayerColor};
