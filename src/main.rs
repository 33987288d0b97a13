use anyhow::Result;
use clap::Parser;
use dockswitch::infra::config::{DEFAULT_DISCOVERY_PREFIX, DEFAULT_ENTITY_PREFIX};
use dockswitch::infra::{BackendMode, MqttSettings, Settings, SshSettings};
use dockswitch::services::Service;
use dockswitch::Filter;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dockswitch",
    about = "Expose docker containers as Home Assistant MQTT switches"
)]
struct Cli {
    /// MQTT broker host
    #[arg(long, env = "MQTT_HOST")]
    mqtt_host: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,

    #[arg(long, env = "MQTT_USER")]
    mqtt_user: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD")]
    mqtt_password: Option<String>,

    /// Remote docker host; setting this selects the ssh backend
    #[arg(long, env = "SSH_HOST")]
    ssh_host: Option<String>,

    #[arg(long, env = "SSH_PORT", default_value_t = 22)]
    ssh_port: u16,

    #[arg(long, env = "SSH_USER")]
    ssh_user: Option<String>,

    #[arg(long, env = "SSH_PASSWORD")]
    ssh_password: Option<String>,

    /// Force a backend instead of deriving it from the ssh settings
    #[arg(long, env = "BACKEND", value_enum)]
    backend: Option<BackendMode>,

    /// Seconds between poll cycles
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 60)]
    poll_interval: u64,

    /// Only these containers are visible (comma-separated)
    #[arg(long, env = "INCLUDE_ONLY", value_delimiter = ',')]
    include_only: Option<Vec<String>>,

    /// Remove these containers from visibility (comma-separated, applied
    /// after --include-only)
    #[arg(long, env = "EXCLUDE_ONLY", value_delimiter = ',')]
    exclude_only: Option<Vec<String>>,

    /// Prefix for entity ids and topic segments
    #[arg(long, env = "ENTITY_PREFIX", default_value = DEFAULT_ENTITY_PREFIX)]
    entity_prefix: String,

    /// Home Assistant discovery prefix
    #[arg(long, env = "DISCOVERY_PREFIX", default_value = DEFAULT_DISCOVERY_PREFIX)]
    discovery_prefix: String,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn into_settings(self) -> Settings {
        let ssh = self.ssh_host.map(|host| SshSettings {
            host,
            port: self.ssh_port,
            user: self.ssh_user.unwrap_or_default(),
            password: self.ssh_password.unwrap_or_default(),
        });

        Settings {
            mqtt: MqttSettings {
                host: self.mqtt_host,
                port: self.mqtt_port,
                user: self.mqtt_user,
                password: self.mqtt_password,
            },
            ssh,
            backend: self.backend,
            poll_interval: Duration::from_secs(self.poll_interval),
            filter: Filter::new(self.include_only, self.exclude_only),
            entity_prefix: self.entity_prefix,
            discovery_prefix: self.discovery_prefix,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let settings = cli.into_settings();
    tracing::info!(
        "starting dockswitch (broker {}:{})",
        settings.mqtt.host,
        settings.mqtt.port
    );

    let backend = settings.build_backend().await?;
    Service::new(settings, backend).run().await
}
