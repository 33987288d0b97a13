use crate::domain::{BackendError, ContainerBackend, ContainerState, Filter, StatusSnapshot};
use std::sync::Arc;

/// Filter-applying facade over the selected backend.
///
/// Visibility is decided here exactly once, above all three transport
/// variants: listings are trimmed to visible names, and operations on
/// non-visible names answer `NotFound` — a filtered container and an
/// unknown one are indistinguishable to callers.
pub struct ContainerService {
    backend: Arc<dyn ContainerBackend>,
    filter: Filter,
}

impl ContainerService {
    pub fn new(backend: Arc<dyn ContainerBackend>, filter: Filter) -> Self {
        Self { backend, filter }
    }

    pub async fn list_statuses(&self) -> Result<StatusSnapshot, BackendError> {
        let statuses = self.backend.list_statuses().await?;
        Ok(self.filter.apply(statuses))
    }

    pub async fn start(&self, name: &str) -> Result<(), BackendError> {
        self.check_visible(name)?;
        self.backend.start(name).await
    }

    pub async fn stop(&self, name: &str) -> Result<(), BackendError> {
        self.check_visible(name)?;
        self.backend.stop(name).await
    }

    pub async fn status(&self, name: &str) -> Result<ContainerState, BackendError> {
        self.check_visible(name)?;
        self.backend.status(name).await
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }

    fn check_visible(&self, name: &str) -> Result<(), BackendError> {
        if self.filter.is_visible(name) {
            Ok(())
        } else {
            Err(BackendError::NotFound(name.to_string()))
        }
    }
}
