pub mod config;
mod executors;
mod shell_backend;
mod socket_backend;

pub use config::{BackendMode, MqttSettings, Settings, SshSettings};
pub use executors::{LocalCommandExecutor, SshCommandExecutor};
pub use shell_backend::ShellBackend;
pub use socket_backend::SocketBackend;
