//! Collaborator surface of the embedding game host.
//!
//! The janitor never owns entities, the network transport, or any UI; it
//! reads facts and fires actuators through this trait. Implementations must
//! be `Send + Sync` because the janitor task may run on any runtime thread.

/// Errors surfaced by host actuators and checks.
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

/// Permission tier of a session participant, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PermissionLevel {
    Default,
    Operator,
    Owner,
}

/// A participant known to the host's player registry.
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    /// Transport-verified platform identifier
    pub platform_id: u64,
    /// Display name, for logs and notifications
    pub username: String,
    /// Whether the host reports this participant as the session host
    pub is_host: bool,
}

/// Severity of a transient user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Information,
    Warning,
    Error,
}

/// Facts and actuators owned by the host game.
///
/// Every actuator that can fail returns a `Result`; the janitor catches and
/// logs those failures rather than propagating them (nothing here is allowed
/// to take the session down).
pub trait HostApi: Send + Sync {
    /// True while a multiplayer session is active.
    fn has_session(&self) -> bool;

    /// True when this process is the session host.
    fn is_host(&self) -> bool;

    /// Number of participants currently in the session.
    fn player_count(&self) -> usize;

    /// The local participant, if the session has one.
    fn local_player(&self) -> Option<PlayerInfo>;

    /// The participant the host reports as session host.
    fn host_player(&self) -> Option<PlayerInfo>;

    /// Look up a participant by transport-verified platform id.
    fn find_player(&self, platform_id: u64) -> Option<PlayerInfo>;

    /// Permission tier of the given participant.
    fn permission_level(&self, platform_id: u64) -> Result<PermissionLevel, HostError>;

    /// Number of non-player world objects currently registered.
    fn entity_count(&self) -> usize;

    /// Bulk-despawn every pooled world object.
    fn despawn_all(&self) -> Result<(), HostError>;

    /// Despawn every non-player network entity individually, returning how
    /// many were removed.
    fn despawn_swept(&self) -> Result<usize, HostError>;

    /// Reject a pending connection from the given participant.
    fn deny_connection(&self, platform_id: u64, reason: &str) -> Result<(), HostError>;

    /// Reload the current level. `Ok(None)` means no level session is active;
    /// `Ok(Some(title))` names the level that was reloaded.
    fn reload_level(&self) -> Result<Option<String>, HostError>;

    /// True when the active transport layer requires validated identities.
    fn requires_valid_id(&self) -> bool;

    /// Ask the transport whether the given platform id is spoofed.
    fn is_spoofed(&self, platform_id: u64) -> Result<bool, HostError>;

    /// Show a transient notification to the local user. Never fails; hosts
    /// swallow display errors themselves.
    fn notify(&self, message: &str, kind: NoticeKind);
}
