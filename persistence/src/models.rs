use chrono::{DateTime, Utc};
use chess_common::{AnalysisType, GameResult, PlayerColor};

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub user_id: String,
    pub platform: String,
    pub provider_game_id: String,
    pub played_at: DateTime<Utc>,
    pub color: PlayerColor,
    pub result: GameResult,
    pub my_rating: Option<i32>,
    pub opponent_rating: Option<i32>,
    pub time_control: Option<String>,
    pub opening: Option<String>,
    pub opening_normalized: Option<String>,
    pub opening_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnalysisRow {
    pub ply_index: i64,
    pub move_san: String,
    pub centipawn_loss: i64,
    pub is_best: bool,
    pub is_blunder: bool,
    pub is_mistake: bool,
    pub is_inaccuracy: bool,
    pub evaluation_before: i64,
    pub evaluation_after: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameAnalysisRow {
    pub tactical: f64,
    pub positional: f64,
    pub aggressive: f64,
    pub patient: f64,
    pub novelty: f64,
    pub staleness: f64,
    pub accuracy: f64,
    pub opening_accuracy: Option<f64>,
    pub middlegame_accuracy: Option<f64>,
    pub endgame_accuracy: Option<f64>,
    pub count_best: i64,
    pub count_great: i64,
    pub count_excellent: i64,
    pub count_good: i64,
    pub count_inaccuracy: i64,
    pub count_mistake: i64,
    pub count_blunder: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    ProbeNew,
    BackfillOld,
    Done,
    Error,
}

impl ImportPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProbeNew => "probe_new",
            Self::BackfillOld => "backfill_old",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "probe_new" => Some(Self::ProbeNew),
            "backfill_old" => Some(Self::BackfillOld),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSessionRow {
    pub phase: ImportPhase,
    pub cursor: Option<String>,
    pub imported_count: i64,
    pub checked_count: i64,
    pub skipped_duplicates: i64,
    pub started_at: DateTime<Utc>,
    pub status_message: Option<String>,
}

pub(crate) fn color_to_str(color: PlayerColor) -> &'static str {
    match color {
        PlayerColor::White => "white",
        PlayerColor::Black => "black",
    }
}

pub(crate) fn color_from_str(s: &str) -> PlayerColor {
    match s {
        "black" => PlayerColor::Black,
        _ => PlayerColor::White,
    }
}

pub(crate) fn result_to_str(result: GameResult) -> &'static str {
    match result {
        GameResult::Win => "win",
        GameResult::Loss => "loss",
        GameResult::Draw => "draw",
    }
}

pub(crate) fn result_from_str(s: &str) -> GameResult {
    match s {
        "win" => GameResult::Win,
        "loss" => GameResult::Loss,
        _ => GameResult::Draw,
    }
}

pub(crate) fn analysis_type_to_str(t: AnalysisType) -> &'static str {
    t.as_str()
}
