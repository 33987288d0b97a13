mod container;
mod error;
mod filter;
pub mod traits;

pub use container::{ContainerState, StatusSnapshot, SwitchState};
pub use error::BackendError;
pub use filter::Filter;
pub use traits::{CommandExecutor, CommandOutput, ContainerBackend};
