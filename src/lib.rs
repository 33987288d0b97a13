pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
// In a real production crate, we might use a feature flag "test-utils"
pub mod test_support;

pub use domain::{
    BackendError, CommandExecutor, ContainerBackend, ContainerState, Filter, StatusSnapshot,
    SwitchState,
};
pub use infra::{BackendMode, Settings, ShellBackend, SocketBackend};
pub use services::{BrokerBridge, ContainerService, Reconciler, Service, TopicScheme};
