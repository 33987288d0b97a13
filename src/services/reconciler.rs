use crate::domain::{ContainerState, StatusSnapshot};
use std::sync::{Arc, RwLock};

/// Outcome of diffing two snapshot generations. Vectors inherit the
/// snapshot's lexicographic key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// In `current` but not in `previous`: needs a discovery publish.
    pub created: Vec<String>,
    /// In both generations: state publish only.
    pub still_present: Vec<String>,
    /// In `previous` but gone from `current`: needs a retraction and must
    /// not receive a state publish this cycle.
    pub removed: Vec<String>,
}

/// Pure O(n) set diff between the last published generation and the one
/// just fetched.
pub fn diff(previous: &StatusSnapshot, current: &StatusSnapshot) -> Diff {
    let mut created = Vec::new();
    let mut still_present = Vec::new();

    for name in current.keys() {
        if previous.contains_key(name) {
            still_present.push(name.clone());
        } else {
            created.push(name.clone());
        }
    }

    let removed = previous
        .keys()
        .filter(|name| !current.contains_key(*name))
        .cloned()
        .collect();

    Diff {
        created,
        still_present,
        removed,
    }
}

/// Owns the previous-vs-current generation swap over the shared
/// known-status snapshot. The same snapshot is read by the stray-config
/// handler, which may therefore observe a value one cycle stale — accepted,
/// the next cycle self-corrects.
pub struct Reconciler {
    known: Arc<RwLock<StatusSnapshot>>,
}

impl Reconciler {
    pub fn new(known: Arc<RwLock<StatusSnapshot>>) -> Self {
        Self { known }
    }

    /// Diffs `current` against the stored generation, then makes `current`
    /// the stored generation.
    ///
    /// The stored generation stands for "last published". When a publish
    /// that this diff demanded fails, the caller repairs the generation
    /// with [`forget`](Self::forget) or [`restore`](Self::restore) so the
    /// next cycle retries instead of considering the work done.
    pub fn observe(&self, current: &StatusSnapshot) -> Diff {
        let mut known = self.known.write().unwrap();
        let result = diff(&known, current);
        *known = current.clone();
        result
    }

    /// Drops a name whose entity registration could not be published; the
    /// next cycle classifies it as `created` again.
    pub fn forget(&self, name: &str) {
        self.known.write().unwrap().remove(name);
    }

    /// Puts back a name whose retraction could not be published, with its
    /// previous state; the next cycle classifies it as `removed` again.
    pub fn restore(&self, name: &str, state: ContainerState) {
        self.known
            .write()
            .unwrap()
            .insert(name.to_string(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContainerState;

    fn snapshot(names: &[&str]) -> StatusSnapshot {
        names
            .iter()
            .map(|n| (n.to_string(), ContainerState::Running))
            .collect()
    }

    #[test]
    fn partitions_are_disjoint_and_cover_both_generations() {
        let previous = snapshot(&["a", "b", "c"]);
        let current = snapshot(&["b", "c", "d"]);
        let d = diff(&previous, &current);

        assert_eq!(d.created, vec!["d"]);
        assert_eq!(d.still_present, vec!["b", "c"]);
        assert_eq!(d.removed, vec!["a"]);

        // created ∪ still_present = current keys, removed ∪ still_present = previous keys
        let mut from_current: Vec<_> = d.created.iter().chain(&d.still_present).collect();
        from_current.sort();
        assert_eq!(from_current.len(), current.len());
        let mut from_previous: Vec<_> = d.removed.iter().chain(&d.still_present).collect();
        from_previous.sort();
        assert_eq!(from_previous.len(), previous.len());

        assert!(d.created.iter().all(|n| !d.removed.contains(n)));
    }

    #[test]
    fn empty_previous_classifies_everything_as_created() {
        let d = diff(&StatusSnapshot::new(), &snapshot(&["x", "y"]));
        assert_eq!(d.created, vec!["x", "y"]);
        assert!(d.still_present.is_empty());
        assert!(d.removed.is_empty());
    }

    #[test]
    fn reappearing_container_counts_as_created() {
        let known = Arc::new(RwLock::new(StatusSnapshot::new()));
        let reconciler = Reconciler::new(known.clone());

        reconciler.observe(&snapshot(&["web"]));
        reconciler.observe(&StatusSnapshot::new());
        let d = reconciler.observe(&snapshot(&["web"]));

        assert_eq!(d.created, vec!["web"]);
    }

    #[test]
    fn forget_makes_a_container_created_again() {
        let known = Arc::new(RwLock::new(StatusSnapshot::new()));
        let reconciler = Reconciler::new(known);

        reconciler.observe(&snapshot(&["web"]));
        reconciler.forget("web");

        let d = reconciler.observe(&snapshot(&["web"]));
        assert_eq!(d.created, vec!["web"]);
        assert!(d.still_present.is_empty());
    }

    #[test]
    fn restore_makes_a_container_removed_again() {
        let known = Arc::new(RwLock::new(StatusSnapshot::new()));
        let reconciler = Reconciler::new(known);

        reconciler.observe(&snapshot(&["cache"]));
        // cache disappeared but its retraction did not go out
        reconciler.observe(&StatusSnapshot::new());
        reconciler.restore("cache", ContainerState::Running);

        let d = reconciler.observe(&StatusSnapshot::new());
        assert_eq!(d.removed, vec!["cache"]);
    }

    #[test]
    fn observe_swaps_the_shared_generation() {
        let known = Arc::new(RwLock::new(StatusSnapshot::new()));
        let reconciler = Reconciler::new(known.clone());

        reconciler.observe(&snapshot(&["web"]));
        assert!(known.read().unwrap().contains_key("web"));

        let d = reconciler.observe(&snapshot(&["web"]));
        assert_eq!(d.still_present, vec!["web"]);
    }
}
