//! Tier presets for `EnginePoolConfig`, per spec §4.1: "small (hash=8MB,
//! threads=1, concurrency=1), medium, large".

use crate::pool::EnginePoolConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTier {
    Small,
    Medium,
    Large,
}

impl EngineTier {
    pub fn pool_config(self, executable_path: String) -> EnginePoolConfig {
        match self {
            Self::Small => EnginePoolConfig {
                executable_path,
                hash_mb: 8,
                threads_per_engine: 1,
                max_concurrent_engines: 1,
                default_depth: 12,
                default_time_seconds_per_move: 1,
                skill_level: 10,
            },
            Self::Medium => EnginePoolConfig {
                executable_path,
                hash_mb: 64,
                threads_per_engine: 2,
                max_concurrent_engines: 3,
                default_depth: 16,
                default_time_seconds_per_move: 2,
                skill_level: 15,
            },
            Self::Large => EnginePoolConfig {
                executable_path,
                hash_mb: 256,
                threads_per_engine: 4,
                max_concurrent_engines: 5,
                default_depth: 20,
                default_time_seconds_per_move: 3,
                skill_level: 20,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_tier_is_single_engine() {
        let cfg = EngineTier::Small.pool_config("stockfish".to_string());
        assert_eq!(cfg.max_concurrent_engines, 1);
        assert_eq!(cfg.hash_mb, 8);
    }

    #[test]
    fn test_tiers_increase_concurrency() {
        let small = EngineTier::Small.pool_config("stockfish".to_string());
        let medium = EngineTier::Medium.pool_config("stockfish".to_string());
        let large = EngineTier::Large.pool_config("stockfish".to_string());
        assert!(small.max_concurrent_engines < medium.max_concurrent_engines);
        assert!(medium.max_concurrent_engines < large.max_concurrent_engines);
    }
}
