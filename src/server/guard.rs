//! Anti-grief gates over incoming connection attempts and spawn requests.
//!
//! An internal error during evaluation never escapes into the host's
//! message handling; it resolves to a verdict picked by the configured
//! fail mode (fail-open by default, fail-closed via `GateFailClosed`).

use std::path::PathBuf;

use tokio::time::Duration;

use crate::logger::Logger;
use crate::server::cleaner;
use crate::server::config::JanitorConfig;
use crate::server::denial_log::DenialLog;
use crate::server::host::{HostApi, HostError, NoticeKind};
use crate::server::ratelimiter::{RateDecision, SpawnRateLimiter};

/// Outcome of a gate check. `Deny` means the host must drop the underlying
/// message; `Allow` lets normal handling continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Identity fields a connecting participant claims about itself. Parsing
/// the claim out of the wire message is host-owned and can fail, which is
/// why the gates take `Result<ConnectionClaim, HostError>`.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionClaim {
    pub platform_id: u64,
    pub version: u32,
}

/// The connection and spawn gates plus the state they share: the spawn rate
/// limiter and the denial log sink.
pub struct GriefGuard {
    enabled: bool,
    spawn_blocking: bool,
    file_logging: bool,
    fail_closed: bool,
    limiter: SpawnRateLimiter,
    denial_log: DenialLog,
    logger: Logger,
}

impl GriefGuard {
    pub fn new(config: &JanitorConfig, log_dir: PathBuf, logger: Logger) -> Self {
        let limiter = SpawnRateLimiter::new(
            config.max_actions_per_second,
            rate_window(config),
        );
        Self {
            enabled: config.anti_grief_enabled,
            spawn_blocking: config.enable_spawn_blocking,
            file_logging: config.enable_file_logging,
            fail_closed: config.gate_fail_closed,
            limiter,
            denial_log: DenialLog::new(log_dir),
            logger,
        }
    }

    /// Push new settings into the gates. Limiter changes take effect at the
    /// next window rollover.
    pub fn apply_config(&mut self, config: &JanitorConfig) {
        self.enabled = config.anti_grief_enabled;
        self.spawn_blocking = config.enable_spawn_blocking;
        self.file_logging = config.enable_file_logging;
        self.fail_closed = config.gate_fail_closed;
        self.limiter
            .set_limits(config.max_actions_per_second, rate_window(config));
        self.logger.info(&format!(
            "🛡 Guard configured: {}/{}s, Logging={}, SpawnBlocking={}",
            config.max_actions_per_second,
            config.rate_window_seconds,
            if self.file_logging { "On" } else { "Off" },
            if self.spawn_blocking { "On" } else { "Off" }
        ));
    }

    /// Fresh session, fresh window.
    pub fn on_session_joined(&mut self) {
        self.limiter.reset();
    }

    /// Gate an incoming connection attempt. `sender` is the
    /// transport-reported identity; `claim` is what the message itself says.
    pub fn check_connection(
        &mut self,
        host: &dyn HostApi,
        sender: u64,
        claim: Result<ConnectionClaim, HostError>,
    ) -> Verdict {
        if !self.enabled {
            return Verdict::Allow;
        }

        match self.evaluate_connection(host, sender, claim) {
            Ok(verdict) => verdict,
            Err(e) => self.failed_check("connection attempt", e),
        }
    }

    fn evaluate_connection(
        &mut self,
        host: &dyn HostApi,
        sender: u64,
        claim: Result<ConnectionClaim, HostError>,
    ) -> Result<Verdict, HostError> {
        let claim = claim?;

        if host.is_host() {
            self.logger.info(&format!(
                "🔌 Incoming connection: platform id {}, version {}",
                claim.platform_id, claim.version
            ));
            if claim.platform_id != sender {
                return Ok(self.deny_connection(host, sender, "claimed id does not match sender"));
            }
        }

        if host.requires_valid_id() && host.is_spoofed(claim.platform_id)? {
            return Ok(self.deny_connection(host, sender, "transport flagged id as spoofed"));
        }

        Ok(Verdict::Allow)
    }

    fn deny_connection(&mut self, host: &dyn HostApi, sender: u64, why: &str) -> Verdict {
        let msg = format!("Spoofed ID detected! Blocking connection: {} ({})", sender, why);
        self.logger.warn(&format!("🛑 {}", msg));
        host.notify(&msg, NoticeKind::Warning);
        if self.file_logging {
            self.denial_log.append(&msg);
        }
        // The deny actuator itself is best-effort too.
        if let Err(e) = host.deny_connection(sender, "anti-grief") {
            self.logger.warn(&format!("Failed to deny connection {}: {}", sender, e));
        }
        Verdict::Deny
    }

    /// Gate a spawn request from `sender`. Only the session host filters
    /// spawns; everyone else passes the message through untouched.
    pub fn check_spawn(&mut self, host: &dyn HostApi, sender: u64) -> Verdict {
        if !host.is_host() {
            return Verdict::Allow;
        }
        if !self.enabled || !self.spawn_blocking {
            return Verdict::Allow;
        }

        match self.evaluate_spawn(host, sender) {
            Ok(verdict) => verdict,
            Err(e) => self.failed_check("spawn request", e),
        }
    }

    fn evaluate_spawn(&mut self, host: &dyn HostApi, sender: u64) -> Result<Verdict, HostError> {
        // Unknown senders are denied outright.
        let Some(player) = host.find_player(sender) else {
            self.logger
                .warn(&format!("🛑 Spawn request from unknown sender {}", sender));
            return Ok(Verdict::Deny);
        };

        // A sender resolving to the host identity without actually being the
        // host player is claiming an identity it does not have.
        if player.is_host {
            if let Some(host_player) = host.host_player() {
                if sender != host_player.platform_id {
                    self.logger.warn(&format!(
                        "🛑 Spoofed host ID detected from {} ({})",
                        player.username, sender
                    ));
                    return Ok(Verdict::Deny);
                }
            }
        }

        match self.limiter.allow_action(sender) {
            RateDecision::Allowed => Ok(Verdict::Allow),
            RateDecision::Denied { count, max } => {
                let msg = format!(
                    "Player {} ({}) exceeded rate limit for SpawnRequest ({}/{})",
                    player.username, sender, count, max
                );
                self.logger.warn(&format!("🛑 {}", msg));
                if self.file_logging {
                    self.denial_log.append(&msg);
                }
                host.notify(
                    &format!("Blocked spawn spam from {}", player.username),
                    NoticeKind::Warning,
                );
                // Punitive sweep: suspected spam costs the session its junk.
                cleaner::admin_clean(host, &self.logger);
                Ok(Verdict::Deny)
            }
        }
    }

    fn failed_check(&self, what: &str, e: HostError) -> Verdict {
        if self.fail_closed {
            self.logger.warn(&format!(
                "Error processing {}: {}, denying (fail-closed)",
                what, e
            ));
            Verdict::Deny
        } else {
            self.logger.warn(&format!(
                "Error processing {}: {}, allowing through (fail-open)",
                what, e
            ));
            Verdict::Allow
        }
    }
}

// Clamped so a hand-edited config can never panic the duration conversion.
fn rate_window(config: &JanitorConfig) -> Duration {
    let secs = config.rate_window_seconds;
    let secs = if secs.is_finite() {
        secs.clamp(0.0, 3_600.0)
    } else {
        1.0
    };
    Duration::from_secs_f32(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::host::testing::MockHost;
    use std::fs;
    use std::path::PathBuf;

    fn guard_config() -> JanitorConfig {
        JanitorConfig {
            anti_grief_enabled: true,
            enable_file_logging: false,
            ..JanitorConfig::default()
        }
    }

    fn guard(config: &JanitorConfig) -> GriefGuard {
        let dir = std::env::temp_dir().join(format!(
            "session_janitor_guard_{}",
            std::process::id()
        ));
        GriefGuard::new(config, dir, Logger)
    }

    fn claim(platform_id: u64) -> Result<ConnectionClaim, HostError> {
        Ok(ConnectionClaim {
            platform_id,
            version: 1,
        })
    }

    #[tokio::test]
    async fn connection_with_mismatched_claim_is_denied() {
        let config = guard_config();
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        let verdict = guard.check_connection(&host, 2, claim(999));

        assert_eq!(verdict, Verdict::Deny);
        assert_eq!(*host.denied.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn connection_with_matching_claim_passes() {
        let config = guard_config();
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        assert!(guard.check_connection(&host, 7, claim(7)).is_allow());
        assert!(host.denied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_guard_lets_everything_through() {
        let config = JanitorConfig::default(); // anti-grief off
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        assert!(guard.check_connection(&host, 2, claim(999)).is_allow());
        assert!(guard.check_spawn(&host, 424242).is_allow());
    }

    #[tokio::test]
    async fn claim_read_error_fails_open_by_default() {
        let config = guard_config();
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        let verdict = guard.check_connection(&host, 2, Err("truncated message".into()));

        assert_eq!(verdict, Verdict::Allow);
        assert!(host.denied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_read_error_denies_when_fail_closed() {
        let config = JanitorConfig {
            gate_fail_closed: true,
            ..guard_config()
        };
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        let verdict = guard.check_connection(&host, 2, Err("truncated message".into()));

        assert_eq!(verdict, Verdict::Deny);
    }

    #[tokio::test]
    async fn spoof_probe_failure_fails_open() {
        let config = guard_config();
        let mut guard = guard(&config);
        let mut host = MockHost::hosting();
        host.requires_valid_id = true;
        host.spoof_check_fails = true;

        assert!(guard.check_connection(&host, 7, claim(7)).is_allow());
    }

    #[tokio::test]
    async fn transport_flagged_spoof_is_denied() {
        let config = guard_config();
        let mut guard = guard(&config);
        let mut host = MockHost::hosting();
        host.requires_valid_id = true;
        host.spoofed_ids = vec![7];

        assert_eq!(guard.check_connection(&host, 7, claim(7)), Verdict::Deny);
    }

    #[tokio::test]
    async fn spawn_from_unknown_sender_is_denied() {
        let config = guard_config();
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        assert_eq!(guard.check_spawn(&host, 555), Verdict::Deny);
    }

    #[tokio::test]
    async fn spawn_claiming_host_identity_is_denied() {
        let config = guard_config();
        let mut guard = guard(&config);
        // Player 9 is flagged as host in the registry but the real host is 1.
        let host = MockHost::hosting().with_player(9, "pretender", true);

        assert_eq!(guard.check_spawn(&host, 9), Verdict::Deny);
        assert_eq!(*host.sweeps.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn spawn_overrun_is_denied_and_triggers_sweep() {
        let config = guard_config();
        let mut guard = guard(&config);
        let host = MockHost::hosting().with_player(9, "spammer", false);

        for _ in 0..6 {
            assert!(guard.check_spawn(&host, 9).is_allow());
        }
        assert_eq!(guard.check_spawn(&host, 9), Verdict::Deny);
        assert_eq!(*host.sweeps.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn non_host_process_never_filters_spawns() {
        let config = guard_config();
        let mut guard = guard(&config);
        let mut host = MockHost::hosting();
        host.is_host = false;

        // Even an unknown sender passes: only the host filters.
        assert!(guard.check_spawn(&host, 555).is_allow());
    }

    #[tokio::test]
    async fn spawn_blocking_can_be_switched_off_independently() {
        let config = JanitorConfig {
            enable_spawn_blocking: false,
            ..guard_config()
        };
        let mut guard = guard(&config);
        let host = MockHost::hosting();

        assert!(guard.check_spawn(&host, 555).is_allow());
        // The connection gate still runs.
        assert_eq!(guard.check_connection(&host, 2, claim(999)), Verdict::Deny);
    }

    #[tokio::test]
    async fn denials_land_in_the_daily_log_when_enabled() {
        let dir: PathBuf = std::env::temp_dir().join(format!(
            "session_janitor_guard_log_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);

        let config = JanitorConfig {
            enable_file_logging: true,
            ..guard_config()
        };
        let mut guard = GriefGuard::new(&config, dir.clone(), Logger);
        let host = MockHost::hosting().with_player(9, "spammer", false);

        for _ in 0..7 {
            guard.check_spawn(&host, 9);
        }

        let mut found = false;
        for entry in fs::read_dir(&dir).unwrap() {
            let text = fs::read_to_string(entry.unwrap().path()).unwrap();
            if text.contains("exceeded rate limit for SpawnRequest (7/6)") {
                found = true;
            }
        }
        assert!(found, "denial line missing from daily log");

        let _ = fs::remove_dir_all(&dir);
    }
}
