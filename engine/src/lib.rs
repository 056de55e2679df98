pub mod heuristic;
pub mod pool;
pub mod process;
pub mod tier;
pub mod uci;

pub use pool::{EnginePool, EnginePoolConfig, EnginePoolStats, Evaluation, PoolError};
pub use process::EngineProcess;
pub use tier::EngineTier;
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use tokio::sync::mpsc;

/// Handle for communicating with a single engine process.
pub struct EngineHandle {
    pub tx: mpsc::Sender<EngineCommand>,
    pub rx: mpsc::Receiver<EngineEvent>,
}

#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetPosition { fen: String, moves: Vec<Move> },
    SetOption { name: String, value: Option<String> },
    Go(GoParams),
    Stop,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub movetime: Option<u64>,
    pub depth: Option<u8>,
    pub infinite: bool,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    BestMove(Move),
    Info(EngineInfo),
    Error(String),
    RawUciMessage {
        direction: UciMessageDirection,
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum UciMessageDirection {
    ToEngine,
    FromEngine,
}

#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<Move>,
    pub multipv: Option<u8>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub enum Score {
    Centipawns(i32),
    Mate(i8),
}

impl From<Score> for chess::AnalysisScore {
    fn from(score: Score) -> Self {
        match score {
            Score::Centipawns(cp) => chess::AnalysisScore::Centipawns(cp),
            Score::Mate(m) => chess::AnalysisScore::Mate(m as i32),
        }
    }
}
