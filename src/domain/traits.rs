use super::{BackendError, ContainerState, StatusSnapshot};
use async_trait::async_trait;

/// Captured result of one shell command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }
}

/// Runs one opaque shell command against a target and returns its captured
/// output. Implementations must tolerate concurrent callers; if the
/// underlying transport cannot be shared they serialize internally.
///
/// Transport failures (connection lost, channel refused) are errors;
/// a command that ran but exited nonzero is a successful call with
/// `success: false` — interpreting that is the caller's business.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, BackendError>;

    /// Releases the underlying transport. Safe to call repeatedly and
    /// never fails; close errors are logged by the implementation.
    async fn close(&self);
}

/// Uniform capability contract over the three container transports
/// (API socket, shell over SSH, local shell).
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// All containers with their current state, captured in one shot.
    async fn list_statuses(&self) -> Result<StatusSnapshot, BackendError>;

    /// Idempotent: starting an already-running container is not an error.
    async fn start(&self, name: &str) -> Result<(), BackendError>;

    /// Idempotent: stopping an already-stopped container is not an error.
    async fn stop(&self, name: &str) -> Result<(), BackendError>;

    /// Single-container state. The default goes through a full listing;
    /// backends override it with a targeted query.
    async fn status(&self, name: &str) -> Result<ContainerState, BackendError> {
        let mut statuses = self.list_statuses().await?;
        Ok(statuses.remove(name).unwrap_or(ContainerState::NotFound))
    }

    /// Releases the transport; repeat-safe, never fails.
    async fn close(&self);
}
