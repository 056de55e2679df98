//! Adaptive batch sizing and inter-batch delay (spec §4.2's "Batch
//! persistence"): games slow down as a session's import count grows, to
//! bound peak memory on long-running backfills.

use std::time::Duration;

pub fn batch_size_for(imported_so_far: i64) -> usize {
    match imported_so_far {
        n if n < 500 => 50,
        n if n < 800 => 35,
        _ => 25,
    }
}

pub fn delay_for(imported_so_far: i64) -> Duration {
    if imported_so_far < 500 {
        Duration::from_millis(100)
    } else {
        Duration::from_millis(200)
    }
}

/// A `gc()` equivalent runs every 100 games; progress snapshots are
/// emitted at least every 50 games once past the 500 mark.
pub fn should_run_gc(imported_so_far: i64) -> bool {
    imported_so_far > 0 && imported_so_far % 100 == 0
}

pub fn should_emit_progress(imported_so_far: i64) -> bool {
    if imported_so_far <= 500 {
        return true;
    }
    imported_so_far % 50 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_thresholds() {
        assert_eq!(batch_size_for(0), 50);
        assert_eq!(batch_size_for(499), 50);
        assert_eq!(batch_size_for(500), 35);
        assert_eq!(batch_size_for(799), 35);
        assert_eq!(batch_size_for(800), 25);
        assert_eq!(batch_size_for(5000), 25);
    }

    #[test]
    fn test_delay_thresholds() {
        assert_eq!(delay_for(0), Duration::from_millis(100));
        assert_eq!(delay_for(499), Duration::from_millis(100));
        assert_eq!(delay_for(500), Duration::from_millis(200));
    }

    #[test]
    fn test_gc_cadence() {
        assert!(!should_run_gc(0));
        assert!(should_run_gc(100));
        assert!(should_run_gc(200));
        assert!(!should_run_gc(150));
    }

    #[test]
    fn test_progress_cadence_above_500() {
        assert!(should_emit_progress(500));
        assert!(!should_emit_progress(520));
        assert!(should_emit_progress(550));
    }
}
