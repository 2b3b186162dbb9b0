//! Host-side session hygiene for multiplayer games: periodic despawn
//! sweeps with an adaptive, player-count-driven cadence, plus an anti-grief
//! layer that rate-limits spawn requests and rejects spoofed connections.
//!
//! The embedding game is abstracted behind [`HostApi`]; the janitor runs as
//! a single event-loop task fed by [`HostEvent`] messages, so none of its
//! state needs locking.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

// Public module exposing logging utilities for janitor lifecycle events.
pub mod logger;

// Public module implementing the janitor event loop and its components.
pub mod server;

// Pull the everyday types up to the crate root.
pub use server::config::{CleanInterval, JanitorConfig, JanitorPaths};
pub use server::guard::{ConnectionClaim, Verdict};
pub use server::host::{HostApi, HostError, NoticeKind, PermissionLevel, PlayerInfo};
pub use server::{HostEvent, JanitorCommand, JanitorServer};

use logger::init_logger;

/// Start the janitor on its own tokio runtime and block until shutdown.
///
/// Responsibilities:
/// 1. Create the data folders and initialize logging under them.
/// 2. Load the persisted configuration (writing defaults on first run).
/// 3. Build a multi-threaded runtime and drive the janitor event loop on it.
///
/// The caller keeps the [`mpsc::Sender`] side of `events` and feeds it from
/// the host's callbacks; dropping every sender (or sending
/// [`HostEvent::Shutdown`]) ends the loop and returns.
pub fn start_janitor(
    name: &str,
    base_dir: impl Into<PathBuf>,
    host: Arc<dyn HostApi>,
    events: mpsc::Receiver<HostEvent>,
) -> Result<(), HostError> {
    let paths = JanitorPaths::new(base_dir);
    paths.init_folders();

    let logger = init_logger(name, Some(&paths.log_dir()));
    let config = JanitorConfig::load(&paths.config_file());

    // One worker per core minus one, but always at least one.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().saturating_sub(1).max(1))
        .thread_name("janitor-worker")
        .enable_all()
        .build()?;

    rt.block_on(async {
        JanitorServer::new(config, paths, host, logger)
            .run(events)
            .await;
    });

    Ok(())
}
