//! Change notifications emitted by the engine.
//!
//! Every committed change is broadcast after the commit succeeds, so a
//! subscriber never sees an event for state that was rolled back by a failed
//! validation.

use serde::{Deserialize, Serialize};

use crate::workflow::{VersionId, WorkflowId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FlowEvent {
    WorkflowCreated {
        workflow_id: WorkflowId,
    },
    /// Metadata (name, status, SLA...) changed.
    WorkflowUpdated {
        workflow_id: WorkflowId,
    },
    WorkflowDeleted {
        workflow_id: WorkflowId,
    },
    /// A structural edit produced a new graph version.
    VersionCommitted {
        workflow_id: WorkflowId,
        version: VersionId,
        operation: String,
    },
    /// `version` was committed as a copy of `target`.
    RolledBack {
        workflow_id: WorkflowId,
        target: VersionId,
        version: VersionId,
    },
}

impl FlowEvent {
    pub fn workflow_id(&self) -> &str {
        match self {
            FlowEvent::WorkflowCreated {
                workflow_id,
            }
            | FlowEvent::WorkflowUpdated {
                workflow_id,
            }
            | FlowEvent::WorkflowDeleted {
                workflow_id,
            }
            | FlowEvent::VersionCommitted {
                workflow_id,
                ..
            }
            | FlowEvent::RolledBack {
                workflow_id,
                ..
            } => workflow_id,
        }
    }

    /// The version this event produced, if it produced one.
    pub fn version(&self) -> Option<VersionId> {
        match self {
            FlowEvent::VersionCommitted {
                version,
                ..
            }
            | FlowEvent::RolledBack {
                version,
                ..
            } => Some(*version),
            _ => None,
        }
    }
}
