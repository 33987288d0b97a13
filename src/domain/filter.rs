use super::StatusSnapshot;

/// Visibility filter applied to every backend's listing before anything
/// reaches the reconciler.
///
/// `include_only` (when set) restricts visibility to the listed names;
/// `exclude_only` is applied afterwards and removes names from whatever
/// remains. Matching is by exact name.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub include_only: Option<Vec<String>>,
    pub exclude_only: Option<Vec<String>>,
}

impl Filter {
    pub fn new(include_only: Option<Vec<String>>, exclude_only: Option<Vec<String>>) -> Self {
        Self {
            include_only,
            exclude_only,
        }
    }

    pub fn is_visible(&self, name: &str) -> bool {
        if let Some(include) = &self.include_only {
            if !include.iter().any(|n| n == name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_only {
            if exclude.iter().any(|n| n == name) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, snapshot: StatusSnapshot) -> StatusSnapshot {
        snapshot
            .into_iter()
            .filter(|(name, _)| self.is_visible(name))
            .collect()
    }
}
