//! Despawn sweeps and level management. Every operation here is
//! fire-and-forget from the event loop's point of view: host failures are
//! logged and notified, never propagated.

use crate::logger::Logger;
use crate::server::host::{HostApi, NoticeKind, PermissionLevel, PlayerInfo};

/// Scheduled bulk sweep, driven by the auto-clean timer.
pub fn perform_auto_clean(host: &dyn HostApi, logger: &Logger) {
    logger.info("🧹 Performing auto-clean...");
    match host.despawn_all() {
        Ok(()) => {
            logger.info("Auto-clean completed");
            host.notify("Auto-cleaned server", NoticeKind::Success);
        }
        Err(e) => logger.error(&format!("Auto-clean failed: {}", e)),
    }
}

/// Manual sweep requested by the local user. Requires an active session and
/// host role; both failures are user-facing notifications, not errors.
pub fn clean_server(host: &dyn HostApi, logger: &Logger) {
    if !validate_server_connection(host, logger) {
        return;
    }

    match host.despawn_all() {
        Ok(()) => {
            logger.info("Server cleaned!");
            host.notify("Server cleaned", NoticeKind::Success);
        }
        Err(e) => {
            logger.error(&format!("Clean server failed: {}", e));
            host.notify("Clean failed! Check console for details", NoticeKind::Error);
        }
    }
}

/// Administrative sweep: despawns every non-player network entity one by
/// one. Gated on the requester holding operator permission or better.
pub fn admin_clean(host: &dyn HostApi, logger: &Logger) {
    let requester = host.local_player();

    if !has_operator_permission(host, requester.as_ref(), logger) {
        let name = requester
            .map(|p| p.username)
            .unwrap_or_else(|| "<unknown>".to_string());
        logger.warn(&format!("{} tried to clean without permission!", name));
        host.notify("Nuh Uh", NoticeKind::Error);
        return;
    }

    match host.despawn_swept() {
        Ok(count) => {
            logger.info(&format!("Server clean completed! ({} entities)", count));
            host.notify("Server cleaned", NoticeKind::Success);
        }
        Err(e) => {
            logger.error(&format!("Server clean failed: {}", e));
            host.notify("Clean failed! Check console", NoticeKind::Error);
        }
    }
}

fn has_operator_permission(
    host: &dyn HostApi,
    player: Option<&PlayerInfo>,
    logger: &Logger,
) -> bool {
    let Some(player) = player else {
        return false;
    };

    match host.permission_level(player.platform_id) {
        Ok(level) => level >= PermissionLevel::Operator,
        Err(e) => {
            logger.warn(&format!("Failed to check permissions: {}", e));
            host.notify(
                &format!("Failed to check permissions: {}", e),
                NoticeKind::Error,
            );
            false
        }
    }
}

/// Reload the current level through the host actuator.
pub fn reload_level(host: &dyn HostApi, logger: &Logger) {
    match host.reload_level() {
        Ok(Some(title)) => {
            logger.info(&format!("Reloading level: {}", title));
            host.notify(&format!("Reloading {}...", title), NoticeKind::Information);
        }
        Ok(None) => {
            logger.warn("No active level session found!");
            host.notify("No active level found!", NoticeKind::Warning);
        }
        Err(e) => {
            logger.error(&format!("Level reload failed: {}", e));
            host.notify("Level reload failed! Check console", NoticeKind::Error);
        }
    }
}

/// True only when a session is active and this process is its host; each
/// failure is notified so the user knows why nothing happened.
pub fn validate_server_connection(host: &dyn HostApi, logger: &Logger) -> bool {
    if !host.has_session() {
        logger.warn("Not connected to a server");
        host.notify("Not connected to a server!", NoticeKind::Error);
        return false;
    }

    if !host.is_host() {
        logger.warn("User is not the server host");
        host.notify("You must be the server host!", NoticeKind::Error);
        return false;
    }

    true
}

/// Human-readable byte count for status lines.
pub fn format_bytes(bytes: i64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} MB", bytes / (1024 * 1024))
    }
}
