use crate::domain::{BackendError, CommandExecutor, CommandOutput};
use async_trait::async_trait;
use ssh2::Session;
use std::io::Read;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Runs commands on the local host through `sh -c`.
pub struct LocalCommandExecutor;

impl LocalCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for LocalCommandExecutor {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, BackendError> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(BackendError::unavailable)?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
        })
    }

    async fn close(&self) {}
}

/// Runs commands on a remote host over an authenticated SSH session.
///
/// The session is established eagerly at construction; a half-connected
/// executor never escapes `connect`. libssh2 sessions are not shareable,
/// so every command takes the session mutex — one in-flight command per
/// executor, which also satisfies the backend's serialization requirement.
pub struct SshCommandExecutor {
    session: Arc<Mutex<Session>>,
    host: String,
}

impl SshCommandExecutor {
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Self, BackendError> {
        let host = host.to_string();
        let user = user.to_string();
        let password = password.to_string();
        let addr = format!("{host}:{port}");

        let session = tokio::task::spawn_blocking(move || {
            let tcp = TcpStream::connect(&addr).map_err(BackendError::unavailable)?;

            let mut session =
                Session::new().map_err(|e| BackendError::Protocol(e.to_string()))?;
            session.set_tcp_stream(tcp);
            session
                .handshake()
                .map_err(|e| BackendError::Protocol(e.to_string()))?;

            session
                .userauth_password(&user, &password)
                .map_err(|e| BackendError::Authentication(e.to_string()))?;
            if !session.authenticated() {
                return Err(BackendError::Authentication(format!(
                    "credentials rejected for {user}"
                )));
            }

            Ok(session)
        })
        .await
        .map_err(BackendError::unavailable)??;

        info!("ssh session established with {host}");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            host,
        })
    }
}

#[async_trait]
impl CommandExecutor for SshCommandExecutor {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, BackendError> {
        let session = self.session.clone();
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let session = session.lock().unwrap();

            let mut channel = session
                .channel_session()
                .map_err(BackendError::unavailable)?;
            channel.exec(&command).map_err(BackendError::unavailable)?;

            let mut stdout = String::new();
            channel
                .read_to_string(&mut stdout)
                .map_err(BackendError::unavailable)?;
            let mut stderr = String::new();
            channel
                .stderr()
                .read_to_string(&mut stderr)
                .map_err(BackendError::unavailable)?;

            channel.wait_close().map_err(BackendError::unavailable)?;
            let exit = channel.exit_status().map_err(BackendError::unavailable)?;

            Ok(CommandOutput {
                stdout: stdout.trim().to_string(),
                stderr: stderr.trim().to_string(),
                success: exit == 0,
            })
        })
        .await
        .map_err(BackendError::unavailable)?
    }

    async fn close(&self) {
        let session = self.session.clone();
        let host = self.host.clone();

        let result = tokio::task::spawn_blocking(move || {
            let session = session.lock().unwrap();
            session.disconnect(None, "shutting down", None)
        })
        .await;

        match result {
            Ok(Ok(())) => debug!("ssh session with {host} closed"),
            // Already-closed sessions answer with an error; nothing to do.
            Ok(Err(e)) => debug!("ssh disconnect from {host}: {e}"),
            Err(e) => warn!("ssh close task failed for {host}: {e}"),
        }
    }
}
