//! Bounded-concurrency pool over engine subprocesses (spec §4.1). Engines
//! are lazily spawned up to `max_concurrent_engines` and reused across
//! calls; a `tokio::sync::Semaphore` caps how many evaluations run at once,
//! and a position-fingerprint cache (SHA-1 of `fen‖depth‖skill`) short
//! circuits repeat requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cache::TtlLru;
use sha1::{Digest, Sha1};
use tokio::sync::{Mutex, Semaphore};

use crate::heuristic::evaluate_heuristic;
use crate::process::{EngineProcess, ProcessConfig};
use crate::{EngineCommand, EngineEvent, GoParams};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
}

#[derive(Debug, Clone)]
pub struct EnginePoolConfig {
    pub executable_path: String,
    pub hash_mb: u32,
    pub threads_per_engine: u32,
    pub max_concurrent_engines: usize,
    pub default_depth: u32,
    pub default_time_seconds_per_move: u64,
    pub skill_level: u8,
}

#[derive(Debug, Clone)]
pub struct PositionRequest {
    pub fen: String,
    pub depth: Option<u32>,
    pub skill: Option<u8>,
    pub time_limit: Option<Duration>,
    pub multi_pv: Option<u8>,
}

/// Result of evaluating a single position, from the side-to-move's
/// perspective. `is_fallback` marks heuristic evaluations so downstream
/// aggregation can down-weight them.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score_cp: i32,
    pub best_move_uci: Option<String>,
    pub principal_variation: Vec<String>,
    pub depth_reached: u32,
    pub is_best: bool,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EnginePoolStats {
    pub in_use: usize,
    pub idle: usize,
    pub total_spawned: usize,
}

pub struct EnginePool {
    config: EnginePoolConfig,
    idle: Mutex<Vec<EngineProcess>>,
    semaphore: Arc<Semaphore>,
    spawned: AtomicUsize,
    eval_cache: Mutex<TtlLru<String, Evaluation>>,
}

impl EnginePool {
    pub fn new(config: EnginePoolConfig) -> Self {
        let max = config.max_concurrent_engines.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            idle: Mutex::new(Vec::with_capacity(max)),
            spawned: AtomicUsize::new(0),
            eval_cache: Mutex::new(
                TtlLru::new(4096, Duration::from_secs(3600))
                    .expect("non-zero capacity and TTL are hardcoded"),
            ),
            config,
        }
    }

    /// Evaluate one position. Blocks on pool availability from the
    /// caller's perspective, per spec §4.1's contract.
    pub async fn evaluate(
        &self,
        fen: &str,
        depth: Option<u32>,
        skill: Option<u8>,
        time_limit: Option<Duration>,
        multi_pv: Option<u8>,
    ) -> Result<Evaluation, PoolError> {
        let depth = depth.unwrap_or(self.config.default_depth);
        let skill = skill.unwrap_or(self.config.skill_level);
        let time_limit =
            time_limit.unwrap_or(Duration::from_secs(self.config.default_time_seconds_per_move));

        let fingerprint = position_fingerprint(fen, depth, skill);
        if let Some(cached) = self.eval_cache.lock().await.get(&fingerprint) {
            return Ok(cached.clone());
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| PoolError::EngineUnavailable(e.to_string()))?;

        let evaluation = self
            .evaluate_with_recovery(fen, depth, skill, time_limit, multi_pv)
            .await?;

        self.eval_cache.lock().await.insert(fingerprint, evaluation.clone());
        Ok(evaluation)
    }

    /// Processed sequentially per engine, parallel across up to
    /// `max_concurrent_engines` engines (spec §4.1).
    pub async fn evaluate_batch(
        self: &Arc<Self>,
        positions: Vec<PositionRequest>,
    ) -> Vec<Result<Evaluation, PoolError>> {
        let mut handles = Vec::with_capacity(positions.len());
        for pos in positions {
            let pool = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                pool.evaluate(&pos.fen, pos.depth, pos.skill, pos.time_limit, pos.multi_pv)
                    .await
            }));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(PoolError::EngineUnavailable(e.to_string()))),
            );
        }
        results
    }

    pub fn stats(&self) -> EnginePoolStats {
        let total = self.spawned.load(Ordering::SeqCst);
        let idle = self.idle.try_lock().map(|g| g.len()).unwrap_or(0);
        EnginePoolStats {
            in_use: total.saturating_sub(idle),
            idle,
            total_spawned: total,
        }
    }

    /// Drain and kill every idle engine. Engines currently checked out by
    /// an in-flight `evaluate` finish naturally and are dropped (killed on
    /// drop via `kill_on_drop`).
    pub async fn shutdown(&self) {
        let mut idle = self.idle.lock().await;
        for engine in idle.drain(..) {
            engine.shutdown().await;
        }
    }

    async fn evaluate_with_recovery(
        &self,
        fen: &str,
        depth: u32,
        skill: u8,
        time_limit: Duration,
        multi_pv: Option<u8>,
    ) -> Result<Evaluation, PoolError> {
        // Two retries on a fresh engine per spec §4.1, then heuristic fallback.
        for attempt in 0..3 {
            let mut engine = match self.acquire_engine().await {
                Ok(engine) => engine,
                Err(e) if attempt == 0 => return Err(e),
                Err(_) => break,
            };

            match run_evaluation(&mut engine, fen, depth, skill, time_limit, multi_pv).await {
                Ok(evaluation) => {
                    self.idle.lock().await.push(engine);
                    return Ok(evaluation);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "engine evaluation failed, discarding engine");
                    engine.kill().await;
                }
            }
        }

        tracing::warn!(fen, "falling back to heuristic evaluator after exhausting retries");
        Ok(evaluate_heuristic(fen, depth))
    }

    async fn acquire_engine(&self) -> Result<EngineProcess, PoolError> {
        if let Some(engine) = self.idle.lock().await.pop() {
            return Ok(engine);
        }
        self.spawn_engine().await
    }

    async fn spawn_engine(&self) -> Result<EngineProcess, PoolError> {
        let engine = EngineProcess::spawn(ProcessConfig {
            executable_path: self.config.executable_path.clone(),
            skill_level: Some(self.config.skill_level),
            threads: Some(self.config.threads_per_engine),
            hash_mb: Some(self.config.hash_mb),
        })
        .await
        .map_err(PoolError::EngineUnavailable)?;
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(engine)
    }
}

async fn run_evaluation(
    engine: &mut EngineProcess,
    fen: &str,
    depth: u32,
    _skill: u8,
    time_limit: Duration,
    multi_pv: Option<u8>,
) -> Result<Evaluation, String> {
    engine
        .send_command(EngineCommand::SetPosition {
            fen: fen.to_string(),
            moves: Vec::new(),
        })
        .await?;

    if let Some(multi_pv) = multi_pv {
        engine
            .send_command(EngineCommand::SetOption {
                name: "MultiPV".to_string(),
                value: Some(multi_pv.to_string()),
            })
            .await?;
    }

    engine
        .send_command(EngineCommand::Go(GoParams {
            depth: Some(depth.min(u8::MAX as u32) as u8),
            movetime: None,
            infinite: false,
        }))
        .await?;

    let escalation = time_limit.saturating_mul(2);
    let mut latest_info: Option<crate::EngineInfo> = None;

    let outcome = tokio::time::timeout(escalation, async {
        loop {
            match engine.recv_event().await {
                Some(EngineEvent::Info(info)) => latest_info = Some(info),
                Some(EngineEvent::BestMove(mv)) => {
                    return Ok(chess::format_uci_move(mv));
                }
                Some(EngineEvent::Error(e)) => return Err(e),
                Some(_) => {}
                None => return Err("engine process ended unexpectedly".to_string()),
            }
        }
    })
    .await;

    let best_move_uci = match outcome {
        Ok(Ok(mv)) => mv,
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            engine.kill().await;
            return Err(format!("engine exceeded escalation timeout of {escalation:?}"));
        }
    };

    let info = latest_info.unwrap_or_default();
    let score_cp = info
        .score
        .map(|s| chess::AnalysisScore::from(s).to_cp())
        .unwrap_or(0);
    let principal_variation = info.pv.iter().map(|mv| chess::format_uci_move(*mv)).collect();

    Ok(Evaluation {
        score_cp,
        best_move_uci: Some(best_move_uci),
        principal_variation,
        depth_reached: info.depth.map(u32::from).unwrap_or(0),
        is_best: true,
        is_fallback: false,
    })
}

/// SHA-1(fen ‖ depth ‖ skill), per spec §4.1.
fn position_fingerprint(fen: &str, depth: u32, skill: u8) -> String {
    let mut hasher = Sha1::new();
    hasher.update(fen.as_bytes());
    hasher.update(depth.to_be_bytes());
    hasher.update([skill]);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
