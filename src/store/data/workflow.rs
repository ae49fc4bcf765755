use serde::{Deserialize, Serialize};

use crate::{
    Result, TickflowError,
    store::{DbCollectionIden, StoreIden},
    utils,
    workflow::{self, SlaPolicy, WorkflowStatus},
};

/// Stored form of workflow metadata. Optional text is kept as empty strings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub status: String,
    pub category: String,
    pub sub_category: String,
    pub sla: SlaPolicy,
    pub create_time: i64,
    pub update_time: i64,
}

impl DbCollectionIden for Workflow {
    fn iden() -> StoreIden {
        StoreIden::Workflows
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl From<&workflow::Workflow> for Workflow {
    fn from(w: &workflow::Workflow) -> Self {
        Self {
            id: w.id.clone(),
            name: w.name.clone(),
            desc: w.description.clone().unwrap_or_default(),
            status: w.status.as_ref().to_string(),
            category: w.category.clone().unwrap_or_default(),
            sub_category: w.sub_category.clone().unwrap_or_default(),
            sla: w.sla,
            create_time: w.created_at.timestamp_millis(),
            update_time: w.updated_at.timestamp_millis(),
        }
    }
}

impl TryFrom<Workflow> for workflow::Workflow {
    type Error = TickflowError;

    fn try_from(data: Workflow) -> Result<Self> {
        let status = data.status.parse::<WorkflowStatus>().map_err(|e| TickflowError::Convert(format!("workflow {} status {}: {e}", data.id, data.status)))?;
        Ok(Self {
            description: non_empty(&data.desc),
            category: non_empty(&data.category),
            sub_category: non_empty(&data.sub_category),
            id: data.id,
            name: data.name,
            status,
            sla: data.sla,
            created_at: utils::time::from_millis(data.create_time),
            updated_at: utils::time::from_millis(data.update_time),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_optional_fields() {
        let now = utils::time::from_millis(utils::time::time_millis());
        let domain = workflow::Workflow {
            id: "w1".into(),
            name: "Refunds".into(),
            description: None,
            status: WorkflowStatus::Active,
            category: Some("billing".into()),
            sub_category: None,
            sla: SlaPolicy::default(),
            created_at: now,
            updated_at: now,
        };
        let data = Workflow::from(&domain);
        assert_eq!(data.status, "active");
        assert_eq!(data.desc, "");

        let back = workflow::Workflow::try_from(data).unwrap();
        assert_eq!(back, domain);
    }

    #[test]
    fn test_bad_status() {
        let data = Workflow {
            id: "w1".into(),
            name: "x".into(),
            desc: String::new(),
            status: "archived".into(),
            category: String::new(),
            sub_category: String::new(),
            sla: SlaPolicy::default(),
            create_time: 0,
            update_time: 0,
        };
        assert!(matches!(workflow::Workflow::try_from(data), Err(TickflowError::Convert(_))));
    }
}
