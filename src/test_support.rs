use crate::domain::{
    BackendError, CommandExecutor, CommandOutput, ContainerBackend, ContainerState,
    StatusSnapshot,
};
use crate::services::MqttPublisher;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory [`ContainerBackend`] recording every call it receives.
pub struct MockBackend {
    containers: RwLock<HashMap<String, ContainerState>>,
    calls: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    frozen: RwLock<bool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            frozen: RwLock::new(false),
        }
    }

    /// start/stop still succeed but no longer change the stored state,
    /// simulating a container that refuses to transition.
    pub fn freeze_states(&self) {
        *self.frozen.write().unwrap() = true;
    }

    pub fn add_container(&self, name: &str, state: ContainerState) {
        self.containers
            .write()
            .unwrap()
            .insert(name.to_string(), state);
    }

    pub fn remove_container(&self, name: &str) {
        self.containers.write().unwrap().remove(name);
    }

    /// Make the named operation fail with `Unavailable`.
    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn clear_fail(&self) {
        *self.fail_on.write().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn state_of(&self, name: &str) -> Option<ContainerState> {
        self.containers.read().unwrap().get(name).cloned()
    }

    fn record(&self, call: String) {
        self.calls.write().unwrap().push(call);
    }

    fn check_fail(&self, operation: &str) -> Result<(), BackendError> {
        if let Some(fail_on) = &*self.fail_on.read().unwrap() {
            if fail_on == operation {
                return Err(BackendError::Unavailable(format!(
                    "mock failure on {operation}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerBackend for MockBackend {
    async fn list_statuses(&self) -> Result<StatusSnapshot, BackendError> {
        self.record("list".to_string());
        self.check_fail("list")?;
        Ok(self
            .containers
            .read()
            .unwrap()
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect())
    }

    async fn start(&self, name: &str) -> Result<(), BackendError> {
        self.record(format!("start:{name}"));
        self.check_fail("start")?;
        let frozen = *self.frozen.read().unwrap();
        let mut containers = self.containers.write().unwrap();
        match containers.get_mut(name) {
            Some(state) => {
                if !frozen {
                    *state = ContainerState::Running;
                }
                Ok(())
            }
            None => Err(BackendError::NotFound(name.to_string())),
        }
    }

    async fn stop(&self, name: &str) -> Result<(), BackendError> {
        self.record(format!("stop:{name}"));
        self.check_fail("stop")?;
        let frozen = *self.frozen.read().unwrap();
        let mut containers = self.containers.write().unwrap();
        match containers.get_mut(name) {
            Some(state) => {
                if !frozen {
                    *state = ContainerState::Exited;
                }
                Ok(())
            }
            None => Err(BackendError::NotFound(name.to_string())),
        }
    }

    async fn status(&self, name: &str) -> Result<ContainerState, BackendError> {
        self.record(format!("status:{name}"));
        self.check_fail("status")?;
        Ok(self
            .containers
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(ContainerState::NotFound))
    }

    async fn close(&self) {
        self.record("close".to_string());
    }
}

/// Message captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl PublishedMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).to_string()
    }
}

/// [`MqttPublisher`] double capturing every publish in order.
pub struct RecordingPublisher {
    messages: RwLock<Vec<PublishedMessage>>,
    fail_on: RwLock<Option<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
        }
    }

    /// Make publishes to the given topic fail, simulating a flaky broker
    /// link.
    pub fn set_fail_on(&self, topic: &str) {
        *self.fail_on.write().unwrap() = Some(topic.to_string());
    }

    pub fn clear_fail(&self) {
        *self.fail_on.write().unwrap() = None;
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.read().unwrap().clone()
    }

    pub fn messages_for(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    pub fn clear(&self) {
        self.messages.write().unwrap().clear();
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MqttPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        if let Some(fail_on) = &*self.fail_on.read().unwrap() {
            if fail_on == topic {
                anyhow::bail!("publish to {topic} failed");
            }
        }
        self.messages.write().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }
}

/// [`CommandExecutor`] double answering from a canned command -> output
/// script; unknown commands fail the transport.
pub struct ScriptedExecutor {
    responses: RwLock<HashMap<String, CommandOutput>>,
    commands: RwLock<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            commands: RwLock::new(Vec::new()),
        }
    }

    pub fn respond(&self, command: &str, output: CommandOutput) {
        self.responses
            .write()
            .unwrap()
            .insert(command.to_string(), output);
    }

    pub fn respond_ok(&self, command: &str, stdout: &str) {
        self.respond(command, CommandOutput::ok(stdout));
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run_command(&self, command: &str) -> Result<CommandOutput, BackendError> {
        self.commands.write().unwrap().push(command.to_string());
        self.responses
            .read()
            .unwrap()
            .get(command)
            .cloned()
            .ok_or_else(|| BackendError::Unavailable(format!("no scripted response: {command}")))
    }

    async fn close(&self) {
        self.commands.write().unwrap().push("close".to_string());
    }
}
