use std::path::PathBuf;

use chess_common::{AnalysisType, Platform};
use clap::Parser;
use engine::EnginePoolConfig;
use orchestrator::OrchestratorApi;
use persistence::Database;

/// Composition root: opens the database, wires the engine pool and
/// orchestrator facade, and runs one ad-hoc analysis request from the
/// command line. No HTTP/gRPC server is started here — per spec.md §1,
/// request framing is explicitly out of scope; a separate API layer
/// would embed `OrchestratorApi` directly.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "./orchestrator.db")]
    db_path: PathBuf,

    #[arg(long, default_value = "stockfish")]
    engine_path: String,

    #[arg(long)]
    user_id: String,

    #[arg(long, value_enum)]
    platform: CliPlatform,

    #[arg(long)]
    provider_game_id: String,

    #[arg(long)]
    pgn_path: PathBuf,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliPlatform {
    Lichess,
    ChessCom,
}

impl From<CliPlatform> for Platform {
    fn from(p: CliPlatform) -> Self {
        match p {
            CliPlatform::Lichess => Platform::Lichess,
            CliPlatform::ChessCom => Platform::ChessCom,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting chess analysis orchestrator");

    let args = Args::parse();

    let database = Database::open(&args.db_path).await?;
    tracing::info!(db_path = %args.db_path.display(), "opened database and ran migrations");

    let pool_config = EnginePoolConfig {
        executable_path: args.engine_path,
        hash_mb: 64,
        threads_per_engine: 2,
        max_concurrent_engines: 3,
        default_depth: 16,
        default_time_seconds_per_move: 1,
        skill_level: 20,
    };

    let api = OrchestratorApi::new(&database, pool_config, 16);

    let pgn = tokio::fs::read_to_string(&args.pgn_path).await?;
    let progress = api
        .analyze_one_game(
            &args.user_id,
            args.platform.into(),
            &args.provider_game_id,
            AnalysisType::Stockfish,
            &pgn,
        )
        .await?;

    tracing::info!(
        moves_analyzed = progress.moves_analyzed,
        phase = ?progress.phase,
        "analysis job finished"
    );

    api.engine_pool.shutdown().await;
    Ok(())
}
