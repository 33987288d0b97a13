use std::collections::BTreeMap;
use std::fmt;

/// Complete name -> state mapping captured by one poll cycle.
///
/// A `BTreeMap` keeps iteration lexicographic, so anything derived from a
/// snapshot (diffs, log lines) comes out in a deterministic order.
pub type StatusSnapshot = BTreeMap<String, ContainerState>;

/// Runtime-reported container state.
///
/// The runtime vocabulary is fixed (docker documents these words), but
/// unknown values are carried through as `Other` rather than rejected —
/// only the `Running` distinction matters downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Created,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    NotFound,
    Other(String),
}

impl ContainerState {
    /// Parses a state word as reported by `docker ps` / the API.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "created" => Self::Created,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            "" => Self::NotFound,
            other => Self::Other(other.to_string()),
        }
    }

    /// Projects the runtime state onto the binary switch vocabulary:
    /// ON iff running, OFF for everything else including "not found".
    pub fn switch_state(&self) -> SwitchState {
        match self {
            Self::Running => SwitchState::On,
            _ => SwitchState::Off,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Running => "running",
            Self::Created => "created",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::NotFound => "not found",
            Self::Other(raw) => raw,
        };
        f.write_str(word)
    }
}

/// Binary entity state as seen by the broker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn payload(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Decodes a command payload. Only the two literal payloads are valid;
    /// anything else is the caller's warn-and-ignore case.
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "ON" => Some(Self::On),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ContainerState::parse("Running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("EXITED"), ContainerState::Exited);
        assert_eq!(ContainerState::parse(" paused "), ContainerState::Paused);
    }

    #[test]
    fn unknown_states_are_preserved() {
        assert_eq!(
            ContainerState::parse("limbo"),
            ContainerState::Other("limbo".to_string())
        );
    }

    #[test]
    fn only_running_projects_to_on() {
        assert_eq!(ContainerState::Running.switch_state(), SwitchState::On);
        assert_eq!(ContainerState::Exited.switch_state(), SwitchState::Off);
        assert_eq!(ContainerState::NotFound.switch_state(), SwitchState::Off);
        assert_eq!(
            ContainerState::Other("limbo".into()).switch_state(),
            SwitchState::Off
        );
    }

    #[test]
    fn payload_round_trip() {
        assert_eq!(SwitchState::from_payload("ON"), Some(SwitchState::On));
        assert_eq!(SwitchState::from_payload("OFF"), Some(SwitchState::Off));
        assert_eq!(SwitchState::from_payload("on"), None);
        assert_eq!(SwitchState::from_payload("TOGGLE"), None);
    }
}
