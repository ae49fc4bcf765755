//! Transitions are the action-labelled edges between steps.
//!
//! A `None` endpoint is a sentinel: `from_step = None` leaves the implicit
//! start, `to_step = None` completes the workflow.

use serde::{Deserialize, Serialize};

use crate::workflow::{StepId, WorkflowId};

/// transition id
pub type TransitionId = String;

/// The named trigger of a transition, e.g. "Approve".
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: TransitionId,
    #[serde(default)]
    pub workflow_id: WorkflowId,
    #[serde(default)]
    pub from_step: Option<StepId>,
    #[serde(default)]
    pub to_step: Option<StepId>,
    pub action: Action,
}

impl Transition {
    /// Whether either endpoint references the step.
    pub fn touches(
        &self,
        step_id: &str,
    ) -> bool {
        self.from_step.as_deref() == Some(step_id) || self.to_step.as_deref() == Some(step_id)
    }

    /// Taking this transition closes the workflow.
    pub fn completes_workflow(&self) -> bool {
        self.to_step.is_none()
    }
}

/// Input for creating a transition.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewTransition {
    #[serde(default)]
    pub from_step: Option<StepId>,
    #[serde(default)]
    pub to_step: Option<StepId>,
    pub action: Action,
}

impl NewTransition {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            from_step: None,
            to_step: None,
            action: Action::new(action_name),
        }
    }

    pub fn from(
        mut self,
        step_id: impl Into<StepId>,
    ) -> Self {
        self.from_step = Some(step_id.into());
        self
    }

    pub fn to(
        mut self,
        step_id: impl Into<StepId>,
    ) -> Self {
        self.to_step = Some(step_id.into());
        self
    }

    pub fn description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.action.description = Some(description.into());
        self
    }

    pub(crate) fn into_transition(
        self,
        id: TransitionId,
        workflow_id: WorkflowId,
    ) -> Transition {
        Transition {
            id,
            workflow_id,
            from_step: self.from_step,
            to_step: self.to_step,
            action: self.action,
        }
    }
}

/// Partial update of a transition. Endpoint fields use `Some(None)` to point
/// at the start/end sentinel; in JSON that is an explicit `null`, while an
/// absent field leaves the endpoint untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TransitionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub from_step: Option<Option<StepId>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub to_step: Option<Option<StepId>>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub action_description: Option<Option<String>>,
}

impl TransitionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_step(
        mut self,
        step_id: Option<StepId>,
    ) -> Self {
        self.from_step = Some(step_id);
        self
    }

    pub fn to_step(
        mut self,
        step_id: Option<StepId>,
    ) -> Self {
        self.to_step = Some(step_id);
        self
    }

    pub fn action_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.action_name = Some(name.into());
        self
    }

    pub fn action_description(
        mut self,
        description: Option<String>,
    ) -> Self {
        self.action_description = Some(description);
        self
    }

    pub fn apply(
        &self,
        transition: &mut Transition,
    ) {
        if let Some(from) = &self.from_step {
            transition.from_step = from.clone();
        }
        if let Some(to) = &self.to_step {
            transition.to_step = to.clone();
        }
        if let Some(name) = &self.action_name {
            transition.action.name = name.clone();
        }
        if let Some(description) = &self.action_description {
            transition.action.description = description.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_either_endpoint() {
        let t = NewTransition::new("Approve").from("a").to("b").into_transition("t1".into(), "w1".into());
        assert!(t.touches("a"));
        assert!(t.touches("b"));
        assert!(!t.touches("c"));
        assert!(!t.completes_workflow());
    }

    #[test]
    fn test_patch_retargets_to_end_sentinel() {
        let mut t = NewTransition::new("Approve").from("a").to("b").into_transition("t1".into(), "w1".into());
        TransitionPatch::new().to_step(None).action_name("Close").apply(&mut t);

        assert_eq!(t.to_step, None);
        assert_eq!(t.action.name, "Close");
        assert!(t.completes_workflow());
    }

    #[test]
    fn test_patch_json_null_targets_sentinel() {
        let patch: TransitionPatch = serde_json::from_str(r#"{"to_step":null,"action_name":"Close"}"#).unwrap();
        assert_eq!(patch.to_step, Some(None));
        assert_eq!(patch.from_step, None);

        let mut t = NewTransition::new("Approve").from("a").to("b").into_transition("t1".into(), "w1".into());
        patch.apply(&mut t);
        assert_eq!(t.from_step.as_deref(), Some("a"));
        assert!(t.completes_workflow());

        let back: TransitionPatch = serde_json::from_str(&serde_json::to_string(&patch).unwrap()).unwrap();
        assert_eq!(back, patch);
    }
}
