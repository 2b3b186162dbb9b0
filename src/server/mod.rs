// Shared ownership of the host collaborator across the runtime
use std::sync::Arc;

// Import synchronization tools: mpsc = event delivery, oneshot = gate verdicts
use tokio::sync::{mpsc, oneshot};

// Import time-related utilities for the clean deadline and adaptive ticker
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

// Declare the janitor's submodules
pub mod adaptive;
pub mod cleaner;
pub mod config;
pub mod denial_log;
pub mod guard;
pub mod host;
pub mod ratelimiter;

use crate::logger::Logger;
use crate::server::config::{CleanInterval, JanitorConfig, JanitorPaths};
use crate::server::guard::{ConnectionClaim, GriefGuard, Verdict};
use crate::server::host::{HostApi, HostError, NoticeKind};

/// Everything the host can deliver to the janitor task. Gate events carry a
/// oneshot sender so the transport layer gets its verdict back synchronously
/// from its own point of view.
pub enum HostEvent {
    /// An incoming connection attempt reached the transport layer.
    ConnectionAttempt {
        /// Transport-reported sender identity
        sender: u64,
        /// The identity the message claims, or the error hit while reading it
        claim: Result<ConnectionClaim, HostError>,
        verdict: oneshot::Sender<Verdict>,
    },
    /// A participant asked to spawn a world object.
    SpawnRequest {
        sender: u64,
        verdict: oneshot::Sender<Verdict>,
    },
    /// A level finished loading (session start or level change).
    LevelLoaded,
    /// A user-initiated operation (the menu equivalents).
    Command(JanitorCommand),
    /// Stop the event loop.
    Shutdown,
}

/// User-facing operations, decoupled from whatever UI triggers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JanitorCommand {
    CleanNow,
    AdminClean,
    ReloadLevel,
    SetAutoClean(bool),
    SetAdaptive(bool),
    SetAntiGrief(bool),
    SetIntervalPreset(CleanInterval),
    ShowStatus,
    SaveConfig,
}

/// The janitor context: configuration, gates, and scheduling state, all
/// owned by a single event-loop task. Nothing in here is shared or locked;
/// host callbacks talk to it exclusively through [`HostEvent`] messages.
pub struct JanitorServer {
    config: JanitorConfig,
    paths: JanitorPaths,
    host: Arc<dyn HostApi>,
    guard: GriefGuard,
    logger: Logger,
    /// Monotonic deadline of the next automatic sweep
    next_clean: Instant,
}

impl JanitorServer {
    pub fn new(
        config: JanitorConfig,
        paths: JanitorPaths,
        host: Arc<dyn HostApi>,
        logger: Logger,
    ) -> Self {
        let guard = GriefGuard::new(&config, paths.log_dir(), logger.clone());
        let next_clean = Instant::now() + interval_duration(&config);
        Self {
            config,
            paths,
            host,
            guard,
            logger,
            next_clean,
        }
    }

    /// Run the event loop until a shutdown event arrives or every sender is
    /// dropped. This is the only task that touches janitor state.
    pub async fn run(mut self, mut events: mpsc::Receiver<HostEvent>) {
        self.logger.info("🚀 Session janitor online");

        // First adaptive check fires one period in, not immediately.
        let period = Duration::from_secs(adaptive::ADAPTIVE_CHECK_SECS);
        let mut adaptive_ticker = time::interval_at(Instant::now() + period, period);
        adaptive_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        None => {
                            self.logger.info("🧹 All event senders dropped, janitor stopping.");
                            break;
                        }
                        Some(event) => {
                            if !self.handle_event(event) {
                                self.logger.info("🧹 Janitor received shutdown signal.");
                                break;
                            }
                        }
                    }
                }

                _ = time::sleep_until(self.next_clean), if self.clean_armed() => {
                    cleaner::perform_auto_clean(self.host.as_ref(), &self.logger);
                    self.schedule_next_clean();
                }

                _ = adaptive_ticker.tick(), if self.adaptive_armed() => {
                    self.run_adaptive_check();
                }
            }
        }
    }

    /// Auto-clean fires only with the feature on, a live session, and this
    /// process as its host.
    fn clean_armed(&self) -> bool {
        self.config.auto_clean_enabled && self.host.has_session() && self.host.is_host()
    }

    /// Adaptive checks additionally require adaptive mode itself.
    fn adaptive_armed(&self) -> bool {
        self.config.adaptive_auto_clean_enabled && self.clean_armed()
    }

    /// Handle one host event. Returns false when the loop should stop.
    fn handle_event(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::ConnectionAttempt {
                sender,
                claim,
                verdict,
            } => {
                let v = self.guard.check_connection(self.host.as_ref(), sender, claim);
                let _ = verdict.send(v);
            }
            HostEvent::SpawnRequest { sender, verdict } => {
                let v = self.guard.check_spawn(self.host.as_ref(), sender);
                let _ = verdict.send(v);
            }
            HostEvent::LevelLoaded => self.on_level_loaded(),
            HostEvent::Command(cmd) => self.handle_command(cmd),
            HostEvent::Shutdown => return false,
        }
        true
    }

    /// Session (re)start: greet the user, re-read the on-disk config, and
    /// reset the rate window.
    fn on_level_loaded(&mut self) {
        self.host.notify(
            "Session janitor has launched successfully!",
            NoticeKind::Success,
        );
        self.config = JanitorConfig::load(&self.paths.config_file());
        self.apply_config();
        self.guard.on_session_joined();
    }

    /// Push the active config into the gates and reschedule the sweep.
    fn apply_config(&mut self) {
        self.guard.apply_config(&self.config);
        self.schedule_next_clean();
    }

    fn handle_command(&mut self, cmd: JanitorCommand) {
        match cmd {
            JanitorCommand::CleanNow => cleaner::clean_server(self.host.as_ref(), &self.logger),
            JanitorCommand::AdminClean => cleaner::admin_clean(self.host.as_ref(), &self.logger),
            JanitorCommand::ReloadLevel => cleaner::reload_level(self.host.as_ref(), &self.logger),
            JanitorCommand::SetAutoClean(value) => self.set_auto_clean(value),
            JanitorCommand::SetAdaptive(value) => self.set_adaptive(value),
            JanitorCommand::SetAntiGrief(value) => self.set_anti_grief(value),
            JanitorCommand::SetIntervalPreset(preset) => self.set_interval_preset(preset),
            JanitorCommand::ShowStatus => self.show_status(),
            JanitorCommand::SaveConfig => self.save_config(),
        }
    }

    fn set_auto_clean(&mut self, value: bool) {
        self.config.auto_clean_enabled = value;
        let status = if value { "enabled" } else { "disabled" };
        self.logger.info(&format!("Auto clean {}", status));
        self.host
            .notify(&format!("Auto clean {}", status), NoticeKind::Information);

        if value {
            self.schedule_next_clean();
        }

        // Adaptive mode is meaningless without auto clean; turning the
        // latter off drags the former with it.
        if !value && self.config.adaptive_auto_clean_enabled {
            self.config.adaptive_auto_clean_enabled = false;
            self.logger.info("Adaptive auto clean automatically disabled");
            self.host.notify(
                "Adaptive auto clean disabled (requires Auto Clean)",
                NoticeKind::Information,
            );
        }
    }

    fn set_adaptive(&mut self, value: bool) {
        self.config.adaptive_auto_clean_enabled = value;
        let status = if value { "enabled" } else { "disabled" };
        self.logger.info(&format!("Adaptive auto clean {}", status));
        self.host.notify(
            &format!("Adaptive auto clean {}", status),
            NoticeKind::Information,
        );

        if value && self.host.has_session() {
            self.run_adaptive_check();
        }
    }

    fn set_anti_grief(&mut self, value: bool) {
        self.config.anti_grief_enabled = value;
        self.guard.apply_config(&self.config);
        let status = if value { "enabled" } else { "disabled" };
        self.logger.info(&format!("Anti-grief protection {}", status));
        self.host.notify(
            &format!("Anti-grief protection {}", status),
            NoticeKind::Information,
        );

        if value {
            self.logger.warn("Admin clean may not work with anti-grief enabled");
            self.host.notify(
                "Admin clean may not work with anti-grief enabled",
                NoticeKind::Warning,
            );
        }
    }

    fn set_interval_preset(&mut self, preset: CleanInterval) {
        if self.config.adaptive_auto_clean_enabled {
            self.host.notify(
                &format!(
                    "Adaptive mode active - current interval: {:.0} minutes",
                    self.config.auto_clean_interval / 60.0
                ),
                NoticeKind::Information,
            );
            return;
        }

        self.config.auto_clean_interval = preset.seconds();
        self.config.last_used_preset = preset.label().to_string();
        self.schedule_next_clean();
        self.logger.info(&format!(
            "Manual auto clean interval set to {} seconds",
            preset.seconds()
        ));
        self.host.notify(
            &format!("Manual interval set to {}", preset.label()),
            NoticeKind::Information,
        );
    }

    /// Sample the player count and reconcile the interval against the step
    /// table. No change within tolerance means no write and no notification.
    fn run_adaptive_check(&mut self) {
        let player_count = self.host.player_count();
        let Some(new_interval) = adaptive::reconcile(self.config.auto_clean_interval, player_count)
        else {
            return;
        };

        let old_interval = self.config.auto_clean_interval;
        self.config.auto_clean_interval = new_interval;
        self.schedule_next_clean();
        self.logger.info(&format!(
            "Adaptive interval adjusted from {:.0}min to {:.0}min for {} players",
            old_interval / 60.0,
            new_interval / 60.0,
            player_count
        ));
        self.host.notify(
            &format!(
                "Auto-clean adapted: {:.0}min for {} players",
                new_interval / 60.0,
                player_count
            ),
            NoticeKind::Information,
        );
    }

    fn show_status(&self) {
        let on_off = |flag: bool| if flag { "enabled" } else { "disabled" };
        // Adaptive intervals sit between presets, so report raw minutes there.
        let interval = if self.config.adaptive_auto_clean_enabled {
            format!("{:.0}min (adaptive)", self.config.auto_clean_interval / 60.0)
        } else {
            CleanInterval::from_seconds(self.config.auto_clean_interval)
                .label()
                .to_string()
        };
        self.host.notify(
            &format!(
                "Auto: {} | Adaptive: {} | Interval: {} | Anti-Grief: {} | Players: {}",
                on_off(self.config.auto_clean_enabled),
                on_off(self.config.adaptive_auto_clean_enabled),
                interval,
                on_off(self.config.anti_grief_enabled),
                self.host.player_count()
            ),
            NoticeKind::Information,
        );

        let entities = self.host.entity_count();
        self.logger.info(&format!(
            "{} entities tracked (threshold {}), memory threshold {}",
            entities,
            self.config.object_threshold,
            cleaner::format_bytes(self.config.memory_threshold)
        ));
        if entities as i64 > self.config.object_threshold as i64 {
            self.logger.warn(&format!(
                "Object count {} over threshold {}, consider a clean",
                entities, self.config.object_threshold
            ));
        }
    }

    fn save_config(&self) {
        match self.config.save(&self.paths.config_file()) {
            Ok(()) => {
                self.logger.info("Janitor config saved successfully");
                self.host
                    .notify("Configuration saved successfully!", NoticeKind::Success);
            }
            Err(e) => self.logger.error(&format!("Failed to save config: {}", e)),
        }
    }

    fn schedule_next_clean(&mut self) {
        self.next_clean = Instant::now() + interval_duration(&self.config);
    }
}

// Clamped so a hand-edited config can never panic the duration conversion.
fn interval_duration(config: &JanitorConfig) -> Duration {
    let secs = config.auto_clean_interval;
    let secs = if secs.is_finite() {
        secs.clamp(0.0, 86_400.0)
    } else {
        300.0
    };
    Duration::from_secs_f32(secs)
}
