#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("read-back verification failed: expected {expected} rows committed, found {found}")]
    ReadBackVerificationFailed { expected: usize, found: usize },
    #[error("game not found: {user_id}/{platform}/{provider_game_id}")]
    GameNotFound {
        user_id: String,
        platform: String,
        provider_game_id: String,
    },
}
