//! Time allocation for clock-driven searches.
//!
//! The manager turns the remaining clock, increment, and moves-to-go into
//! two budgets: `optimum`, the point where the iterative-deepening driver
//! starts asking whether another iteration is worth it, and `maximum`, the
//! hard wall the in-search clock poll enforces.

use crate::board::search::SearchLimits;
use crate::board::types::Color;

/// Safety margin for I/O and GUI latency, per move.
const MOVE_OVERHEAD_MS: u64 = 10;

/// Horizon assumed when the GUI gives no `movestogo`.
const DEFAULT_HORIZON: u64 = 45;

#[derive(Clone, Debug)]
pub struct TimeManager {
    optimum: u64,
    maximum: u64,
}

impl TimeManager {
    /// Builds budgets from the limits; `None` when the search is not
    /// clock-driven (fixed depth, nodes, movetime, infinite).
    #[must_use]
    pub fn new(limits: &SearchLimits, us: Color) -> Option<Self> {
        let time = limits.time[us.index()]?;
        let inc = limits.inc[us.index()];
        let mtg = limits.movestogo.map_or(DEFAULT_HORIZON, |m| m.clamp(2, 50));

        // Everything we can spend over the horizon, minus latency per move.
        let pool = (time + inc * (mtg - 1))
            .saturating_sub(MOVE_OVERHEAD_MS * (2 + mtg))
            .max(1);
        let slice = pool / mtg;

        let cap = time.saturating_sub(MOVE_OVERHEAD_MS).max(1);
        let optimum = slice.min(cap);
        // Allow a difficult move to run well past its slice, but never past
        // most of the remaining clock.
        let maximum = (slice * 7).clamp(optimum, cap * 8 / 10).max(optimum);

        Some(TimeManager { optimum, maximum })
    }

    #[inline]
    #[must_use]
    pub fn optimum_ms(&self) -> u64 {
        self.optimum
    }

    #[inline]
    #[must_use]
    pub fn maximum_ms(&self) -> u64 {
        self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_with_clock(wtime: u64, winc: u64, movestogo: Option<u64>) -> SearchLimits {
        SearchLimits {
            time: [Some(wtime), None],
            inc: [winc, 0],
            movestogo,
            ..SearchLimits::default()
        }
    }

    #[test]
    fn no_clock_means_no_manager() {
        let limits = SearchLimits::default();
        assert!(TimeManager::new(&limits, Color::White).is_none());
    }

    #[test]
    fn budgets_are_ordered_and_bounded() {
        let limits = limits_with_clock(60_000, 1000, None);
        let tm = TimeManager::new(&limits, Color::White).unwrap();
        assert!(tm.optimum_ms() > 0);
        assert!(tm.optimum_ms() <= tm.maximum_ms());
        assert!(tm.maximum_ms() < 60_000);
    }

    #[test]
    fn short_clocks_still_get_a_slice() {
        let limits = limits_with_clock(150, 0, None);
        let tm = TimeManager::new(&limits, Color::White).unwrap();
        assert!(tm.optimum_ms() >= 1);
        assert!(tm.maximum_ms() <= 150);
    }

    #[test]
    fn movestogo_concentrates_time() {
        let spread = TimeManager::new(&limits_with_clock(60_000, 0, None), Color::White).unwrap();
        let tight = TimeManager::new(&limits_with_clock(60_000, 0, Some(5)), Color::White).unwrap();
        assert!(tight.optimum_ms() > spread.optimum_ms());
    }
}
