//! Domain types of the workflow graph model.

mod graph;
mod sla;
mod step;
mod transition;
#[allow(clippy::module_inception)]
mod workflow;

pub use graph::{Graph, GraphUpdate, UpdateMode};
pub use sla::{MAX_SLA_DAYS, Priority, SlaDuration, SlaPolicy};
pub use step::{NewStep, Position, Step, StepId, StepPatch};
pub use transition::{Action, NewTransition, Transition, TransitionId, TransitionPatch};
pub use workflow::{NewWorkflow, Workflow, WorkflowFilter, WorkflowId, WorkflowPatch, WorkflowStatus};

/// Version number of a committed graph, starting at 1 per workflow.
pub type VersionId = u64;
