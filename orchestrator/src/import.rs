//! Import facade (spec §4.2): resolves the right `PlatformClient` for a
//! tenant's platform, runs it through the global concurrency limiter, and
//! translates importer failures into `OrchestratorError` so callers only
//! ever see one error type.

use chess_common::Platform;
use importer::{ChessComClient, ImportLimiter, ImportOutcome, LichessClient, PlatformClient};
use persistence::{GameStore, ImportSessionStore};

use crate::admission::Tier;
use crate::error::OrchestratorError;

pub fn client_for(platform: Platform) -> Box<dyn PlatformClient> {
    match platform {
        Platform::Lichess => Box::new(LichessClient::new()),
        Platform::ChessCom => Box::new(ChessComClient::new()),
    }
}

pub fn capacity_for_tier(tier: Tier) -> usize {
    match tier {
        Tier::Pro => importer::PRO_CAPACITY,
        Tier::Hobby | Tier::Anonymous => importer::DEFAULT_CAPACITY,
    }
}

/// Per-invocation game cap for a tier (spec §4.2, `session_import_cap`).
/// `max_games` is clamped to this in `run_tenant_import` regardless of what
/// a caller requests, so one session can't starve the others sharing the
/// global import semaphore.
pub fn session_import_cap_for_tier(tier: Tier) -> usize {
    match tier {
        Tier::Pro => importer::PRO_SESSION_IMPORT_CAP,
        Tier::Hobby | Tier::Anonymous => importer::DEFAULT_SESSION_IMPORT_CAP,
    }
}

pub async fn run_tenant_import(
    limiter: &ImportLimiter,
    games: &GameStore,
    sessions: &ImportSessionStore,
    user_id: &str,
    platform: Platform,
    max_games: usize,
    tier: Tier,
) -> Result<ImportOutcome, OrchestratorError> {
    let _permit = limiter
        .try_acquire()
        .map_err(|_| OrchestratorError::ImportInProgress)?;

    let capped_max_games = max_games.min(session_import_cap_for_tier(tier));

    let client = client_for(platform);
    importer::run_import(client.as_ref(), games, sessions, user_id, platform, capped_max_games)
        .await
        .map_err(OrchestratorError::Import)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_import_cap_clamps_hobby_at_1000() {
        assert_eq!(session_import_cap_for_tier(Tier::Hobby), 1000);
        assert_eq!(800.min(session_import_cap_for_tier(Tier::Hobby)), 800);
        assert_eq!(1500.min(session_import_cap_for_tier(Tier::Hobby)), 1000);
    }

    #[test]
    fn test_session_import_cap_is_higher_for_pro() {
        assert!(session_import_cap_for_tier(Tier::Pro) > session_import_cap_for_tier(Tier::Hobby));
    }
}
