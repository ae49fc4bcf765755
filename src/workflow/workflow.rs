//! Workflow metadata: identity, lifecycle status, tags and SLA targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::SlaPolicy;

/// workflow id
pub type WorkflowId = String;

/// Lifecycle status of a workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Inactive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub sla: SlaPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a workflow.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub sla: SlaPolicy,
}

impl NewWorkflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(
        mut self,
        category: impl Into<String>,
        sub_category: Option<String>,
    ) -> Self {
        self.category = Some(category.into());
        self.sub_category = sub_category;
        self
    }

    pub fn sla(
        mut self,
        sla: SlaPolicy,
    ) -> Self {
        self.sla = sla;
        self
    }
}

/// Partial update of workflow metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<WorkflowStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub sub_category: Option<Option<String>>,
    #[serde(default)]
    pub sla: Option<SlaPolicy>,
}

impl WorkflowPatch {
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

    pub fn status(
        mut self,
        status: WorkflowStatus,
    ) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sla(
        mut self,
        sla: SlaPolicy,
    ) -> Self {
        self.sla = Some(sla);
        self
    }

    pub fn apply(
        &self,
        workflow: &mut Workflow,
    ) {
        if let Some(name) = &self.name {
            workflow.name = name.clone();
        }
        if let Some(description) = &self.description {
            workflow.description = description.clone();
        }
        if let Some(status) = self.status {
            workflow.status = status;
        }
        if let Some(category) = &self.category {
            workflow.category = category.clone();
        }
        if let Some(sub_category) = &self.sub_category {
            workflow.sub_category = sub_category.clone();
        }
        if let Some(sla) = self.sla {
            workflow.sla = sla;
        }
    }
}

/// Filter for listing workflows. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowFilter {
    pub status: Option<WorkflowStatus>,
    pub category: Option<String>,
}

impl WorkflowFilter {
    pub fn status(
        mut self,
        status: WorkflowStatus,
    ) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(
        mut self,
        category: impl Into<String>,
    ) -> Self {
        self.category = Some(category.into());
        self
    }
}
