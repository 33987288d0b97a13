use crate::domain::{
    BackendError, CommandExecutor, CommandOutput, ContainerBackend, ContainerState,
    StatusSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// One `name:state` pair per line. The delimiter never appears in a valid
/// container name, and the state side may contain further `:` characters,
/// so splitting happens on the first occurrence only.
const LIST_COMMAND: &str = "docker ps -a --format '{{.Names}}:{{.State}}'";

/// Drives the docker CLI through a [`CommandExecutor`] — the shape shared
/// by the local-shell and shell-over-SSH transports.
pub struct ShellBackend {
    executor: Arc<dyn CommandExecutor>,
}

impl ShellBackend {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn docker(&self, command: &str) -> Result<CommandOutput, BackendError> {
        debug!("running: {command}");
        self.executor.run_command(command).await
    }
}

#[async_trait]
impl ContainerBackend for ShellBackend {
    async fn list_statuses(&self) -> Result<StatusSnapshot, BackendError> {
        let output = self.docker(LIST_COMMAND).await?;
        if !output.success {
            return Err(BackendError::Unavailable(output.stderr));
        }
        parse_statuses(&output.stdout)
    }

    async fn start(&self, name: &str) -> Result<(), BackendError> {
        validate_name(name)?;
        let output = self.docker(&format!("docker start {name}")).await?;
        check_container_command(name, &output)
    }

    async fn stop(&self, name: &str) -> Result<(), BackendError> {
        validate_name(name)?;
        let output = self.docker(&format!("docker stop {name}")).await?;
        check_container_command(name, &output)
    }

    async fn status(&self, name: &str) -> Result<ContainerState, BackendError> {
        validate_name(name)?;
        let output = self
            .docker(&format!(
                "docker inspect --format '{{{{.State.Status}}}}' {name}"
            ))
            .await?;
        if !output.success {
            if is_no_such_container(&output.stderr) {
                return Ok(ContainerState::NotFound);
            }
            return Err(BackendError::Unavailable(output.stderr));
        }
        Ok(ContainerState::parse(&output.stdout))
    }

    async fn close(&self) {
        self.executor.close().await;
    }
}

fn check_container_command(name: &str, output: &CommandOutput) -> Result<(), BackendError> {
    if output.success {
        return Ok(());
    }
    if is_no_such_container(&output.stderr) {
        return Err(BackendError::NotFound(name.to_string()));
    }
    Err(BackendError::Unavailable(output.stderr.clone()))
}

// `docker start|stop` say "No such container", `docker inspect` says
// "No such object".
fn is_no_such_container(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no such container") || stderr.contains("no such object")
}

/// Container names go straight into shell commands and topic segments, so
/// anything outside the docker name alphabet is rejected up front.
pub fn validate_name(name: &str) -> Result<(), BackendError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphanumeric()
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidName(name.to_string()))
    }
}

fn parse_statuses(output: &str) -> Result<StatusSnapshot, BackendError> {
    let mut statuses = StatusSnapshot::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, state)) = line.split_once(':') else {
            return Err(BackendError::MalformedOutput(format!(
                "missing delimiter in line {line:?}"
            )));
        };
        if validate_name(name).is_err() {
            return Err(BackendError::MalformedOutput(format!(
                "unusable container name in line {line:?}"
            )));
        }

        statuses.insert(name.to_string(), ContainerState::parse(state));
    }

    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SwitchState;

    #[test]
    fn parses_name_state_pairs() {
        let statuses = parse_statuses("web:running\nworker:exited").unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["web"], ContainerState::Running);
        assert_eq!(statuses["worker"], ContainerState::Exited);
        assert_eq!(statuses["web"].switch_state(), SwitchState::On);
        assert_eq!(statuses["worker"].switch_state(), SwitchState::Off);
    }

    #[test]
    fn splits_on_first_delimiter_only() {
        let statuses = parse_statuses("db:up 2 hours:healthy").unwrap();
        assert_eq!(
            statuses["db"],
            ContainerState::Other("up 2 hours:healthy".to_string())
        );
    }

    #[test]
    fn empty_output_is_an_empty_snapshot() {
        assert!(parse_statuses("").unwrap().is_empty());
        assert!(parse_statuses("\n\n").unwrap().is_empty());
    }

    #[test]
    fn line_without_delimiter_is_malformed() {
        let err = parse_statuses("web:running\ngarbage").unwrap_err();
        assert!(matches!(err, BackendError::MalformedOutput(_)));
    }

    #[test]
    fn empty_name_is_malformed() {
        let err = parse_statuses(":running").unwrap_err();
        assert!(matches!(err, BackendError::MalformedOutput(_)));
    }

    #[test]
    fn name_validation_rejects_topic_and_delimiter_characters() {
        assert!(validate_name("web-1.app_x").is_ok());
        assert!(matches!(
            validate_name("a/b"),
            Err(BackendError::InvalidName(_))
        ));
        assert!(matches!(
            validate_name("a:b"),
            Err(BackendError::InvalidName(_))
        ));
        assert!(matches!(
            validate_name("-lead"),
            Err(BackendError::InvalidName(_))
        ));
        assert!(matches!(
            validate_name(""),
            Err(BackendError::InvalidName(_))
        ));
    }
}
