use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::workflow::{Graph, Step, Transition, VersionId, Workflow};

/// A committed graph and the version it was committed as. Version 0 is the
/// empty graph of a workflow that has never been edited.
#[derive(Debug, Default)]
pub(crate) struct Head {
    pub version: VersionId,
    pub graph: Arc<Graph>,
}

impl Head {
    pub fn new(
        version: VersionId,
        graph: Graph,
    ) -> Self {
        Self {
            version,
            graph: Arc::new(graph),
        }
    }
}

/// Per-workflow commit state. `write` serialises committers; readers only
/// touch `head` and never wait on a commit in progress.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    write: Mutex<()>,
    head: RwLock<Arc<Head>>,
    retired: AtomicBool,
}

impl Slot {
    pub fn new(head: Head) -> Self {
        Self {
            write: Mutex::new(()),
            head: RwLock::new(Arc::new(head)),
            retired: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.write.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load(&self) -> Arc<Head> {
        self.head.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store(
        &self,
        head: Head,
    ) {
        *self.head.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(head);
    }

    /// Marks the workflow as deleted; later commits through a held slot fail.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

/// A workflow with the nodes and edges of its current version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphView {
    pub workflow: Workflow,
    pub version: VersionId,
    pub nodes: Vec<Step>,
    pub edges: Vec<Transition>,
}

impl GraphView {
    pub fn graph(&self) -> Graph {
        Graph::new(self.nodes.clone(), self.edges.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_keep_old_head() {
        let slot = Slot::new(Head::default());
        let before = slot.load();

        slot.store(Head::new(1, Graph::default()));
        assert_eq!(before.version, 0);
        assert_eq!(slot.load().version, 1);
    }

    #[test]
    fn test_retire() {
        let slot = Slot::default();
        assert!(!slot.is_retired());
        slot.retire();
        assert!(slot.is_retired());
    }
}
