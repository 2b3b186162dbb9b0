use std::collections::HashMap;
use tokio::time::{Duration, Instant};

/// Outcome of a rate check. `Denied` carries the post-increment count so the
/// caller can log `count/max` the way admins expect to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied { count: u32, max: u32 },
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Per-player action tally within the current window
struct PlayerRate {
    count: u32,
    last_action: Instant,
}

/// Fixed-window spawn rate limiter keyed by platform id.
///
/// All tracked players share a single window origin. The first check past the
/// window's duration clears the whole table and restarts the window at the
/// current time; keys are never evicted individually. Limit changes via
/// [`set_limits`](Self::set_limits) are latched at the next rollover so the
/// in-flight window keeps the limits it started with.
pub struct SpawnRateLimiter {
    /// Configured maximum actions per window
    max_per_window: u32,
    /// Configured window duration
    window: Duration,
    /// Limits in force for the in-flight window
    active_max: u32,
    active_window: Duration,
    /// Start of the current window
    window_start: Instant,
    /// Per-player tallies, cleared wholesale on rollover
    rates: HashMap<u64, PlayerRate>,
}

impl SpawnRateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            active_max: max_per_window,
            active_window: window,
            window_start: Instant::now(),
            rates: HashMap::new(),
        }
    }

    /// Reconfigure the limiter. Takes effect for subsequent windows, not
    /// retroactively for the one currently in flight.
    pub fn set_limits(&mut self, max_per_window: u32, window: Duration) {
        self.max_per_window = max_per_window;
        self.window = window;
    }

    /// Count one action for `player_id` and decide whether it is allowed.
    ///
    /// A player with no prior actions always passes their first check. The
    /// window comparison is strict (`elapsed > window`); a check landing
    /// exactly on the boundary still belongs to the old window.
    pub fn allow_action(&mut self, player_id: u64) -> RateDecision {
        let now = Instant::now();
        if now.duration_since(self.window_start) > self.active_window {
            self.rates.clear();
            self.window_start = now;
            self.active_max = self.max_per_window;
            self.active_window = self.window;
        }

        let rate = self.rates.entry(player_id).or_insert(PlayerRate {
            count: 0,
            last_action: now,
        });
        rate.count += 1;
        rate.last_action = now;

        if rate.count > self.active_max {
            RateDecision::Denied {
                count: rate.count,
                max: self.active_max,
            }
        } else {
            RateDecision::Allowed
        }
    }

    /// When the given player last acted within the current window.
    pub fn last_action(&self, player_id: u64) -> Option<Instant> {
        self.rates.get(&player_id).map(|r| r.last_action)
    }

    /// Drop all tallies and restart the window. Called on session (re)join.
    pub fn reset(&mut self) {
        self.rates.clear();
        self.window_start = Instant::now();
        self.active_max = self.max_per_window;
        self.active_window = self.window;
    }
}
