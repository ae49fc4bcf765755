use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{Priority, StepId, TransitionId, WorkflowId};

/// One arrival of a ticket at a step. `transition_id` is the transition the
/// ticket left through on this visit, unset while it is still waiting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub step_id: StepId,
    #[serde(default)]
    pub transition_id: Option<TransitionId>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl Visit {
    pub fn arrived(step_id: impl Into<StepId>) -> Self {
        Self {
            step_id: step_id.into(),
            transition_id: None,
            at: None,
        }
    }

    pub fn acted(
        step_id: impl Into<StepId>,
        transition_id: impl Into<TransitionId>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            transition_id: Some(transition_id.into()),
            at: None,
        }
    }
}

/// The ticket state the tracker reads. Owned by the ticket store; the engine
/// never mutates it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TicketInstance {
    pub instance_id: String,
    pub workflow_id: WorkflowId,
    pub current_step_id: StepId,
    #[serde(default)]
    pub visit_history: Vec<Visit>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
}

impl TicketInstance {
    pub fn new(
        instance_id: impl Into<String>,
        workflow_id: impl Into<WorkflowId>,
        current_step_id: impl Into<StepId>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            workflow_id: workflow_id.into(),
            current_step_id: current_step_id.into(),
            visit_history: Vec::new(),
            priority: Priority::default(),
            opened_at: None,
        }
    }

    pub fn visits(
        mut self,
        visits: Vec<Visit>,
    ) -> Self {
        self.visit_history = visits;
        self
    }
}
