pub mod bridge;
mod container_service;
pub mod reconciler;
mod runner;
pub mod session;

pub use bridge::{BrokerBridge, DeviceConfig, MqttPublisher, SwitchDiscovery, TopicScheme};
pub use container_service::ContainerService;
pub use reconciler::{Diff, Reconciler, diff};
pub use runner::{Service, ServicePhase};
pub use session::{InboundMessage, MqttSession};
