pub mod parser;

pub use parser::{format_uci_move, parse_uci_message, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("unknown UCI message: {0}")]
    UnknownMessage(String),
    #[error("invalid move: {0}")]
    InvalidMove(String),
}
