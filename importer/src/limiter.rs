//! Global import concurrency limiter (spec §4.2): caps how many import
//! sessions run at once across all tenants, independent of any one user's
//! own admission checks. Grounded on `engine::EnginePool`'s
//! `tokio::sync::Semaphore` usage, but rejects outright instead of queuing
//! — a caller who loses the race gets `ImportInProgress` back immediately
//! rather than waiting behind someone else's backfill.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ImporterError;

pub const DEFAULT_CAPACITY: usize = 2;
pub const PRO_CAPACITY: usize = 5;

/// Per-invocation game cap (spec §4.2: "One user-session caps at 1000 games
/// per invocation (Hobby tier) to bound memory"). Applied independently of
/// `ImportLimiter`'s concurrency cap above — this bounds how much work one
/// `run_import` call takes on, not how many calls run at once.
pub const DEFAULT_SESSION_IMPORT_CAP: usize = 1000;

/// The Pro preset raises concurrency to 5 "with higher caps" (spec §4.2);
/// doubling the Hobby session cap keeps that relationship without the spec
/// naming an exact Pro figure.
pub const PRO_SESSION_IMPORT_CAP: usize = 2000;

/// Holds a slot open for the lifetime of one `run_import` call; dropping
/// it frees the slot for the next queued request.
pub struct ImportPermit {
    _permit: OwnedSemaphorePermit,
}

pub struct ImportLimiter {
    semaphore: Arc<Semaphore>,
}

impl ImportLimiter {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Non-blocking: a third concurrent caller is rejected rather than
    /// queued, per spec §4.2.
    pub fn try_acquire(&self) -> Result<ImportPermit, ImporterError> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .map(|permit| ImportPermit { _permit: permit })
            .map_err(|_| ImporterError::ImportInProgress)
    }
}
