use crate::domain::{ContainerBackend, Filter};
use crate::infra::executors::{LocalCommandExecutor, SshCommandExecutor};
use crate::infra::shell_backend::ShellBackend;
use crate::infra::socket_backend::SocketBackend;
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_ENTITY_PREFIX: &str = "dockswitch_";
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendMode {
    /// docker CLI through a local shell
    Local,
    /// docker CLI over an SSH session
    Ssh,
    /// Docker API socket
    Socket,
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Resolved configuration, built once in `main` and passed into the
/// constructors that need it. No ambient globals.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub ssh: Option<SshSettings>,
    pub backend: Option<BackendMode>,
    pub poll_interval: Duration,
    pub filter: Filter,
    pub entity_prefix: String,
    pub discovery_prefix: String,
}

impl Settings {
    /// Transport selection: an explicit `--backend` wins; otherwise SSH
    /// when a remote host is configured, the local API socket when not.
    pub fn backend_mode(&self) -> BackendMode {
        if let Some(mode) = self.backend {
            return mode;
        }
        if self.ssh.is_some() {
            BackendMode::Ssh
        } else {
            BackendMode::Socket
        }
    }

    /// Builds the one backend instance this process will use. Selection
    /// happens here exactly once; construction failures are fatal.
    pub async fn build_backend(&self) -> Result<Arc<dyn ContainerBackend>> {
        let mode = self.backend_mode();
        info!("container backend: {mode:?}");

        match mode {
            BackendMode::Socket => {
                let backend = SocketBackend::connect()
                    .await
                    .context("connecting to the docker socket")?;
                Ok(Arc::new(backend))
            }
            BackendMode::Local => Ok(Arc::new(ShellBackend::new(Arc::new(
                LocalCommandExecutor::new(),
            )))),
            BackendMode::Ssh => {
                let Some(ssh) = &self.ssh else {
                    bail!("ssh backend selected but no ssh host configured");
                };
                if ssh.user.is_empty() || ssh.password.is_empty() {
                    bail!("ssh backend requires SSH_USER and SSH_PASSWORD");
                }
                let executor =
                    SshCommandExecutor::connect(&ssh.host, ssh.port, &ssh.user, &ssh.password)
                        .await
                        .with_context(|| format!("connecting to {} over ssh", ssh.host))?;
                Ok(Arc::new(ShellBackend::new(Arc::new(executor))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(ssh: Option<SshSettings>, backend: Option<BackendMode>) -> Settings {
        Settings {
            mqtt: MqttSettings {
                host: "broker".into(),
                port: 1883,
                user: None,
                password: None,
            },
            ssh,
            backend,
            poll_interval: Duration::from_secs(60),
            filter: Filter::default(),
            entity_prefix: DEFAULT_ENTITY_PREFIX.into(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.into(),
        }
    }

    fn ssh_settings() -> SshSettings {
        SshSettings {
            host: "nas".into(),
            port: 22,
            user: "root".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn socket_is_the_default_mode() {
        assert_eq!(settings(None, None).backend_mode(), BackendMode::Socket);
    }

    #[test]
    fn ssh_host_selects_ssh_mode() {
        assert_eq!(
            settings(Some(ssh_settings()), None).backend_mode(),
            BackendMode::Ssh
        );
    }

    #[test]
    fn explicit_mode_wins() {
        assert_eq!(
            settings(Some(ssh_settings()), Some(BackendMode::Local)).backend_mode(),
            BackendMode::Local
        );
    }
}
