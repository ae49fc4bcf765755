//! Steps are the nodes of a workflow graph.

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowId;

/// step id
pub type StepId = String;

/// Display position used by graph editors. The engine stores it verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            x,
            y,
        }
    }
}

/// A named stage in a workflow, owned by exactly one workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// step id, unique across all workflows
    pub id: StepId,
    /// owning workflow
    #[serde(default)]
    pub workflow_id: WorkflowId,
    /// step name
    pub name: String,
    /// role id responsible for the step
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_end: bool,
}

/// Input for creating a step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewStep {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_end: bool,
}

impl NewStep {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    pub fn start(mut self) -> Self {
        self.is_start = true;
        self
    }

    pub fn end(mut self) -> Self {
        self.is_end = true;
        self
    }

    pub fn description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn instruction(
        mut self,
        instruction: impl Into<String>,
    ) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn position(
        mut self,
        x: f64,
        y: f64,
    ) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub(crate) fn into_step(
        self,
        id: StepId,
        workflow_id: WorkflowId,
    ) -> Step {
        Step {
            id,
            workflow_id,
            name: self.name,
            role: self.role,
            description: self.description,
            instruction: self.instruction,
            position: self.position,
            is_start: self.is_start,
            is_end: self.is_end,
        }
    }
}

/// Partial update of a step. `None` leaves a field untouched; for the optional
/// text fields `Some(None)` clears them, written as `null` in JSON.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub instruction: Option<Option<String>>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub is_start: Option<bool>,
    #[serde(default)]
    pub is_end: Option<bool>,
}

impl StepPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn role(
        mut self,
        role: impl Into<String>,
    ) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn description(
        mut self,
        description: Option<String>,
    ) -> Self {
        self.description = Some(description);
        self
    }

    pub fn instruction(
        mut self,
        instruction: Option<String>,
    ) -> Self {
        self.instruction = Some(instruction);
        self
    }

    pub fn position(
        mut self,
        x: f64,
        y: f64,
    ) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn is_start(
        mut self,
        flag: bool,
    ) -> Self {
        self.is_start = Some(flag);
        self
    }

    pub fn is_end(
        mut self,
        flag: bool,
    ) -> Self {
        self.is_end = Some(flag);
        self
    }

    /// Applies the patch in place.
    pub fn apply(
        &self,
        step: &mut Step,
    ) {
        if let Some(name) = &self.name {
            step.name = name.clone();
        }
        if let Some(role) = &self.role {
            step.role = role.clone();
        }
        if let Some(description) = &self.description {
            step.description = description.clone();
        }
        if let Some(instruction) = &self.instruction {
            step.instruction = instruction.clone();
        }
        if let Some(position) = self.position {
            step.position = position;
        }
        if let Some(is_start) = self.is_start {
            step.is_start = is_start;
        }
        if let Some(is_end) = self.is_end {
            step.is_end = is_end;
        }
    }
}
