use crate::domain::{BackendError, ContainerBackend, ContainerState, StatusSnapshot};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use tracing::info;

/// Talks to the Docker daemon directly over its API socket. Typed
/// responses end to end, so this variant can never produce
/// `MalformedOutput`.
pub struct SocketBackend {
    docker: Docker,
}

impl SocketBackend {
    /// Connects with the daemon's local defaults and verifies the
    /// connection with a ping before handing the backend out.
    pub async fn connect() -> Result<Self, BackendError> {
        let docker =
            Docker::connect_with_local_defaults().map_err(BackendError::unavailable)?;
        docker.ping().await.map_err(BackendError::unavailable)?;
        info!("connected to the docker daemon");
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerBackend for SocketBackend {
    async fn list_statuses(&self) -> Result<StatusSnapshot, BackendError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(BackendError::unavailable)?;

        let mut statuses = StatusSnapshot::new();
        for container in containers {
            let Some(name) = container
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|name| name.trim_start_matches('/').to_string())
            else {
                continue;
            };
            let state = container
                .state
                .as_deref()
                .map(ContainerState::parse)
                .unwrap_or(ContainerState::NotFound);
            statuses.insert(name, state);
        }
        Ok(statuses)
    }

    async fn start(&self, name: &str) -> Result<(), BackendError> {
        match self
            .docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => map_container_error(name, e),
        }
    }

    async fn stop(&self, name: &str) -> Result<(), BackendError> {
        match self
            .docker
            .stop_container(name, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => map_container_error(name, e),
        }
    }

    async fn status(&self, name: &str) -> Result<ContainerState, BackendError> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspection) => {
                let state = inspection
                    .state
                    .and_then(|s| s.status)
                    .map(|status| ContainerState::parse(&status.to_string()))
                    .unwrap_or(ContainerState::NotFound);
                Ok(state)
            }
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(ContainerState::NotFound),
            Err(e) => Err(BackendError::unavailable(e)),
        }
    }

    // The bollard client holds no resources that need an explicit release.
    async fn close(&self) {}
}

fn map_container_error(name: &str, err: DockerError) -> Result<(), BackendError> {
    match err {
        // 304: the container was already in the requested state. The
        // contract makes start/stop idempotent, so that is a success.
        DockerError::DockerResponseServerError {
            status_code: 304, ..
        } => Ok(()),
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => Err(BackendError::NotFound(name.to_string())),
        e => Err(BackendError::unavailable(e)),
    }
}
