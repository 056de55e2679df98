#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("persistence error: {0}")]
    Persistence(#[from] persistence::PersistenceError),
    #[error("engine error: {0}")]
    Engine(#[from] engine::PoolError),
    #[error("rate limit exceeded: limit={limit}, current_usage={current_usage}, remaining={remaining}, resets_in_hours={resets_in_hours}")]
    RateLimitExceeded {
        limit: i64,
        current_usage: i64,
        remaining: i64,
        resets_in_hours: u32,
    },
    #[error("import already in progress for this tenant")]
    ImportInProgress,
    #[error("import failed: {0}")]
    Import(importer::ImporterError),
    #[error("analysis queue is full")]
    QueueFull,
    #[error("games for analysis selection were not strictly played_at DESC ordered: {0}")]
    OrderingViolation(String),
    #[error("job timed out after {0} seconds")]
    JobTimeout(u64),
    #[error("job was cancelled")]
    Cancelled,
    #[error("pgn unavailable for game {0}")]
    PgnUnavailable(String),
    #[error("san parse error at ply {ply}: {source}")]
    SanParse { ply: u32, source: chess::pgn::SanError },
}
