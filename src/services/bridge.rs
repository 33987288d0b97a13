use crate::domain::{StatusSnapshot, SwitchState};
use crate::services::ContainerService;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause between issuing a start/stop and re-querying status. Container
/// state transitions are not instantaneous.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Narrow publishing seam over the broker client, so the bridge can be
/// exercised against a recording double.
#[async_trait]
pub trait MqttPublisher: Send + Sync {
    /// Publishes a payload; an empty retained payload retracts.
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()>;
}

/// Topic contract: `<discovery>/switch/<prefix><name>/{config,command,state}`.
#[derive(Debug, Clone)]
pub struct TopicScheme {
    discovery_prefix: String,
    entity_prefix: String,
}

/// Where an inbound message goes, decided from its topic alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// ON/OFF request for a container.
    Command(String),
    /// A (retained) discovery config, ours or a stray one.
    Config(String),
    /// Outside this bridge's namespace, or our own state echo.
    Ignore,
}

impl TopicScheme {
    pub fn new(discovery_prefix: impl Into<String>, entity_prefix: impl Into<String>) -> Self {
        Self {
            discovery_prefix: discovery_prefix.into(),
            entity_prefix: entity_prefix.into(),
        }
    }

    pub fn entity_prefix(&self) -> &str {
        &self.entity_prefix
    }

    /// Wildcard covering every switch entity under the discovery prefix.
    /// Other integrations share this namespace; routing filters them out.
    pub fn subscription(&self) -> String {
        format!("{}/switch/#", self.discovery_prefix)
    }

    pub fn config_topic(&self, name: &str) -> String {
        self.entity_topic(name, "config")
    }

    pub fn command_topic(&self, name: &str) -> String {
        self.entity_topic(name, "command")
    }

    pub fn state_topic(&self, name: &str) -> String {
        self.entity_topic(name, "state")
    }

    fn entity_topic(&self, name: &str, leaf: &str) -> String {
        format!(
            "{}/switch/{}{}/{}",
            self.discovery_prefix, self.entity_prefix, name, leaf
        )
    }

    /// Recovers the container name from the second-to-last segment; only
    /// topics carrying this bridge's entity prefix are considered.
    pub fn route(&self, topic: &str) -> Route {
        let segments: Vec<&str> = topic.split('/').collect();
        let [.., entity, leaf] = segments.as_slice() else {
            return Route::Ignore;
        };
        let Some(name) = entity.strip_prefix(self.entity_prefix.as_str()) else {
            return Route::Ignore;
        };
        if name.is_empty() || !topic.starts_with(&format!("{}/switch/", self.discovery_prefix)) {
            return Route::Ignore;
        }

        match *leaf {
            "command" => Route::Command(name.to_string()),
            "config" => Route::Config(name.to_string()),
            _ => Route::Ignore,
        }
    }
}

/// Home Assistant switch discovery payload, retained on the config topic.
#[derive(Debug, Serialize)]
pub struct SwitchDiscovery {
    pub name: String,
    pub unique_id: String,
    pub command_topic: String,
    pub state_topic: String,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
    pub state_on: &'static str,
    pub state_off: &'static str,
    pub device: DeviceConfig,
}

/// Device registry block shared by every entity this bridge publishes.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceConfig {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
}

impl DeviceConfig {
    pub fn new(entity_prefix: &str, entity_name: &str) -> Self {
        Self {
            identifiers: vec![format!("{entity_prefix}containers")],
            name: format!("{entity_name} Containers"),
            model: "Docker Containers".to_string(),
            manufacturer: "Docker Container Manager".to_string(),
        }
    }
}

/// Translates reconciler decisions into discovery/state publishes and
/// decodes inbound broker messages into backend calls.
pub struct BrokerBridge {
    publisher: Arc<dyn MqttPublisher>,
    topics: TopicScheme,
    device: DeviceConfig,
    containers: Arc<ContainerService>,
    known: Arc<RwLock<StatusSnapshot>>,
    settle_interval: Duration,
}

impl BrokerBridge {
    pub fn new(
        publisher: Arc<dyn MqttPublisher>,
        topics: TopicScheme,
        containers: Arc<ContainerService>,
        known: Arc<RwLock<StatusSnapshot>>,
    ) -> Self {
        let device = DeviceConfig::new(topics.entity_prefix(), "Dockswitch");
        Self {
            publisher,
            topics,
            device,
            containers,
            known,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
        }
    }

    pub fn with_settle_interval(mut self, settle_interval: Duration) -> Self {
        self.settle_interval = settle_interval;
        self
    }

    /// Retained discovery message. Republishing identical content is a
    /// broker-side no-op, so this is safe to call on every `created`.
    pub async fn publish_entity(&self, name: &str) -> Result<()> {
        let discovery = SwitchDiscovery {
            name: name.to_string(),
            unique_id: format!("{}{name}", self.topics.entity_prefix()),
            command_topic: self.topics.command_topic(name),
            state_topic: self.topics.state_topic(name),
            payload_on: "ON",
            payload_off: "OFF",
            state_on: "ON",
            state_off: "OFF",
            device: self.device.clone(),
        };
        let payload = serde_json::to_vec(&discovery)?;
        self.publisher
            .publish(&self.topics.config_topic(name), payload, true)
            .await?;
        debug!("discovery published for {name}");
        Ok(())
    }

    /// Empty retained payload on the config topic; the broker convention
    /// for "forget this entity".
    pub async fn retract_entity(&self, name: &str) -> Result<()> {
        self.publisher
            .publish(&self.topics.config_topic(name), Vec::new(), true)
            .await?;
        debug!("discovery retracted for {name}");
        Ok(())
    }

    pub async fn publish_state(&self, name: &str, state: SwitchState) -> Result<()> {
        self.publisher
            .publish(
                &self.topics.state_topic(name),
                state.payload().as_bytes().to_vec(),
                true,
            )
            .await
    }

    /// Entry point for every inbound broker message. Never fails: errors
    /// on this path are logged so later messages keep flowing.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) {
        match self.topics.route(topic) {
            Route::Command(name) => {
                let payload = String::from_utf8_lossy(payload);
                self.handle_command(&name, &payload).await;
            }
            Route::Config(name) => self.handle_config(&name, payload).await,
            Route::Ignore => {}
        }
    }

    async fn handle_command(&self, name: &str, payload: &str) {
        let Some(request) = SwitchState::from_payload(payload) else {
            warn!("unknown command {payload:?} for {name}");
            return;
        };
        info!("command {request} received for {name}");

        let result = match request {
            SwitchState::On => self.containers.start(name).await,
            SwitchState::Off => self.containers.stop(name).await,
        };
        if let Err(e) = result {
            error!("command {request} for {name} failed: {e}");
            return;
        }

        // The published state must reflect an actual query, never the
        // command's assumption.
        tokio::time::sleep(self.settle_interval).await;
        match self.containers.status(name).await {
            Ok(state) => {
                if let Err(e) = self.publish_state(name, state.switch_state()).await {
                    error!("state publish for {name} failed: {e}");
                } else {
                    info!("state refreshed for {name}: {state}");
                }
            }
            Err(e) => error!("status refresh for {name} failed: {e}"),
        }
    }

    /// Retained configs arrive on (re)connect and whenever someone else
    /// publishes one. A config for a container we do not know is stray
    /// (orphaned or externally injected) and is retracted immediately.
    async fn handle_config(&self, name: &str, payload: &[u8]) {
        // Empty config payloads are retraction echoes, ours included.
        if payload.is_empty() {
            return;
        }
        let is_known = self.known.read().unwrap().contains_key(name);
        if is_known {
            return;
        }

        info!("retracting stray config for {name}");
        if let Err(e) = self.retract_entity(name).await {
            error!("stray config retraction for {name} failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> TopicScheme {
        TopicScheme::new("homeassistant", "dockswitch_")
    }

    #[test]
    fn topic_shapes() {
        let t = topics();
        assert_eq!(
            t.config_topic("web"),
            "homeassistant/switch/dockswitch_web/config"
        );
        assert_eq!(
            t.command_topic("web"),
            "homeassistant/switch/dockswitch_web/command"
        );
        assert_eq!(
            t.state_topic("web"),
            "homeassistant/switch/dockswitch_web/state"
        );
        assert_eq!(t.subscription(), "homeassistant/switch/#");
    }

    #[test]
    fn routes_commands_and_configs() {
        let t = topics();
        assert_eq!(
            t.route("homeassistant/switch/dockswitch_web/command"),
            Route::Command("web".to_string())
        );
        assert_eq!(
            t.route("homeassistant/switch/dockswitch_web/config"),
            Route::Config("web".to_string())
        );
    }

    #[test]
    fn ignores_foreign_and_own_state_topics() {
        let t = topics();
        // Another integration under the shared discovery namespace.
        assert_eq!(t.route("homeassistant/switch/garage_door/command"), Route::Ignore);
        // Our own state echo.
        assert_eq!(
            t.route("homeassistant/switch/dockswitch_web/state"),
            Route::Ignore
        );
        // Different namespace entirely.
        assert_eq!(t.route("zigbee2mqtt/bridge/state"), Route::Ignore);
        // Prefix with no name behind it.
        assert_eq!(t.route("homeassistant/switch/dockswitch_/command"), Route::Ignore);
    }

    #[test]
    fn discovery_payload_matches_the_convention() {
        let device = DeviceConfig::new("dockswitch_", "Dockswitch");
        let discovery = SwitchDiscovery {
            name: "web".into(),
            unique_id: "dockswitch_web".into(),
            command_topic: topics().command_topic("web"),
            state_topic: topics().state_topic("web"),
            payload_on: "ON",
            payload_off: "OFF",
            state_on: "ON",
            state_off: "OFF",
            device,
        };

        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&discovery).unwrap()).unwrap();
        assert_eq!(json["unique_id"], "dockswitch_web");
        assert_eq!(json["payload_on"], "ON");
        assert_eq!(
            json["command_topic"],
            "homeassistant/switch/dockswitch_web/command"
        );
        assert_eq!(json["device"]["identifiers"][0], "dockswitch_containers");
        assert_eq!(json["device"]["model"], "Docker Containers");
    }
}
