//! Personality Aggregator and Opening Classification (spec §4.5, §4.6).
//! Generalizes the teacher's single-game `analysis::advanced::psychological`
//! profile (error streaks, swings, phase breakdown for one player in one
//! game) into cross-game personality trait scoring.

mod classification;
mod cross_game;
mod opening;
mod traits;

pub use classification::{MoveClassification, MoveSignal, FORCING_SWING_THRESHOLD_CP};
pub use cross_game::{aggregate_player_traits, GameContribution, PlayerTraitScores};
pub use opening::{classify_opening, counts_toward_repertoire, eco_prefix_for_name, ClassifiedOpening, OpeningOwner};
pub use traits::{compute_game_traits, move_level_novelty_staleness, GameTraitScores};
