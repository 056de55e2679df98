//! Orchestrator: admission control, job selection, and the per-game
//! analysis pipeline that composes `engine`, `persistence`, `cache` and
//! `aggregator` into the single facade an (out-of-scope) HTTP layer would
//! call. Ships no server of its own — spec.md §1 excludes request framing.

pub mod admission;
pub mod error;
pub mod import;
pub mod job;
pub mod scheduler;
pub mod selection;

pub use admission::{AdmissionControl, AdmissionDecision, Tier};
pub use error::OrchestratorError;
pub use import::{capacity_for_tier, client_for, run_tenant_import, session_import_cap_for_tier};
pub use job::{CancellationToken, JobProgress, JobState};
pub use scheduler::{analyze_game_pgn, run_game_analysis_job, AnalysisOutcome};
pub use selection::{select_unanalyzed_games, AnalysisCandidate};

use std::sync::Arc;
use std::time::Duration;

use chess_common::{AnalysisType, Platform};
use engine::{EnginePool, EnginePoolConfig};
use importer::{ImportLimiter, ImportOutcome, DEFAULT_CAPACITY};
use persistence::{AnalysisStore, Database, GameStore, ImportSessionStore, UsageStore};
use tokio::sync::Mutex;

/// Composition root: everything a caller needs to admit, select, and run
/// analysis jobs for one deployment. Analogous to the teacher's
/// `AppState`, minus the gRPC service wiring spec.md §1 excludes.
pub struct OrchestratorApi {
    pub games: GameStore,
    pub analysis: AnalysisStore,
    pub admission: AdmissionControl,
    pub engine_pool: Arc<EnginePool>,
    pub analytics_cache: Mutex<cache::TtlLru<String, String>>,
    pub max_job_seconds: u64,
    pub analysis_depth: u32,
    pub import_sessions: ImportSessionStore,
    pub import_limiter: ImportLimiter,
}

impl OrchestratorApi {
    pub fn new(db: &Database, engine_pool_config: EnginePoolConfig, analysis_depth: u32) -> Self {
        Self::with_import_capacity(db, engine_pool_config, analysis_depth, DEFAULT_CAPACITY)
    }

    /// Same as `new`, but with an explicit global import concurrency cap —
    /// a Pro deployment preset passes `importer::PRO_CAPACITY` (spec §4.2).
    pub fn with_import_capacity(
        db: &Database,
        engine_pool_config: EnginePoolConfig,
        analysis_depth: u32,
        import_capacity: usize,
    ) -> Self {
        let pool = db.pool().clone();
        Self {
            games: GameStore::new(pool.clone()),
            analysis: AnalysisStore::new(pool.clone()),
            admission: AdmissionControl::new(UsageStore::new(pool.clone())),
            engine_pool: Arc::new(EnginePool::new(engine_pool_config)),
            analytics_cache: Mutex::new(
                cache::TtlLru::new(2048, Duration::from_secs(20 * 60))
                    .expect("non-zero capacity and TTL are hardcoded"),
            ),
            max_job_seconds: 600,
            analysis_depth,
            import_sessions: ImportSessionStore::new(pool),
            import_limiter: ImportLimiter::new(import_capacity),
        }
    }

    /// Pulls new and backfilled games for one tenant from their platform
    /// (spec §4.2). Rejected with `ImportInProgress` once the global
    /// concurrency cap is already saturated by other tenants. `max_games`
    /// is clamped to `tier`'s `session_import_cap` (1000 for Hobby) before
    /// the import runs, regardless of what the caller requests.
    pub async fn import_games(
        &self,
        user_id: &str,
        platform: Platform,
        max_games: usize,
        tier: Tier,
    ) -> Result<ImportOutcome, OrchestratorError> {
        import::run_tenant_import(
            &self.import_limiter,
            &self.games,
            &self.import_sessions,
            user_id,
            platform,
            max_games,
            tier,
        )
        .await
    }

    pub async fn analyze_one_game(
        &self,
        user_id: &str,
        platform: Platform,
        provider_game_id: &str,
        analysis_type: AnalysisType,
        pgn: &str,
    ) -> Result<JobProgress, OrchestratorError> {
        run_game_analysis_job(
            Arc::clone(&self.engine_pool),
            &self.games,
            &self.analysis,
            &self.analytics_cache,
            user_id,
            platform,
            provider_game_id,
            analysis_type,
            pgn,
            self.analysis_depth,
            self.max_job_seconds,
            CancellationToken::new(),
        )
        .await
    }

    pub async fn analyze_recent_unanalyzed(
        &self,
        user_id: &str,
        platform: Platform,
        analysis_type: AnalysisType,
        n: usize,
    ) -> Result<Vec<Result<JobProgress, OrchestratorError>>, OrchestratorError> {
        let candidates =
            select_unanalyzed_games(&self.games, user_id, platform, analysis_type, n).await?;

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let result = self
                .analyze_one_game(
                    user_id,
                    platform,
                    &candidate.provider_game_id,
                    analysis_type,
                    &candidate.pgn,
                )
                .await;
            results.push(result);
        }
        Ok(results)
    }
}
