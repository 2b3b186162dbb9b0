//! Adaptive auto-clean interval: a fixed step table over player count,
//! reconciled against the configured interval with an epsilon tolerance so
//! repeated checks don't thrash the setting.

/// Seconds of wall time between adaptive checks.
pub const ADAPTIVE_CHECK_SECS: u64 = 30;

/// Tolerance when comparing configured and target intervals, in seconds.
/// Avoids floating-point thrash on repeated reconciliation.
pub const INTERVAL_EPSILON: f32 = 0.1;

/// Target cleanup period in seconds for the given player count.
///
/// Busier sessions get cleaned more often: 10 minutes at 8+ players down to
/// 30 minutes for near-empty lobbies. The 6-7 player band deliberately falls
/// through to 30 minutes, matching long-standing tuning.
pub fn interval_for_players(player_count: usize) -> f32 {
    if player_count >= 8 {
        10.0 * 60.0
    } else if player_count == 5 {
        15.0 * 60.0
    } else if (3..=4).contains(&player_count) {
        25.0 * 60.0
    } else {
        30.0 * 60.0
    }
}

/// Compare the currently configured interval against the step table.
/// Returns `Some(target)` only when they differ beyond [`INTERVAL_EPSILON`];
/// `None` means the caller must not touch the setting or notify anyone.
pub fn reconcile(current_secs: f32, player_count: usize) -> Option<f32> {
    let target = interval_for_players(player_count);
    if (current_secs - target).abs() > INTERVAL_EPSILON {
        Some(target)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_table_matches_tuning() {
        for count in 8..16 {
            assert_eq!(interval_for_players(count), 600.0, "count {}", count);
        }
        assert_eq!(interval_for_players(5), 900.0);
        assert_eq!(interval_for_players(3), 1500.0);
        assert_eq!(interval_for_players(4), 1500.0);
        for count in [0, 1, 2, 6, 7] {
            assert_eq!(interval_for_players(count), 1800.0, "count {}", count);
        }
    }

    #[test]
    fn reconcile_applies_only_beyond_epsilon() {
        // Within tolerance: no update.
        assert_eq!(reconcile(600.0, 8), None);
        assert_eq!(reconcile(600.05, 8), None);
        assert_eq!(reconcile(599.95, 8), None);

        // Beyond tolerance: exactly the table value comes back.
        assert_eq!(reconcile(1800.0, 8), Some(600.0));
        assert_eq!(reconcile(600.0, 5), Some(900.0));
        assert_eq!(reconcile(600.2, 8), Some(600.0));
    }
}
