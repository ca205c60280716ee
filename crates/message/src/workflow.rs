//! Serde model of the workflow execution message envelope.

use serde::{Deserialize, Serialize};

use crate::event::{ExecutionCounts, ManifestEvent, ManifestPayload};
use crate::execution::{execution_arn, execution_url_from_arn};

/// Errors while reading a workflow message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The JSON does not have the shape of a workflow message.
    #[error("invalid workflow message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

/// A workflow execution message. Every section is optional; unknown fields
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMessage {
    #[serde(default)]
    pub execution: Option<ExecutionSection>,
    #[serde(default)]
    pub meta: Option<MetaSection>,
    #[serde(default)]
    pub payload: Option<PayloadSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSection {
    #[serde(default)]
    pub state_machine: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit execution ARN; takes precedence over `state_machine` + `name`.
    #[serde(default)]
    pub arn: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub workflow_start_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaSection {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub collection: Option<CollectionRef>,
    #[serde(default)]
    pub provider: Option<ProviderRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRef {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadSection {
    #[serde(default)]
    pub pdr: Option<PdrSection>,
    /// Sub-executions still running. Entries are opaque.
    #[serde(default)]
    pub running: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub completed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub failed: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdrSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ack_sent: Option<bool>,
    #[serde(default)]
    pub ack_message: Option<String>,
}

impl WorkflowMessage {
    pub fn from_json(src: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, MessageError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Execution ARN, explicit or derived from the state machine ARN.
    pub fn execution_arn(&self) -> Option<String> {
        let execution = self.execution.as_ref()?;
        if let Some(arn) = &execution.arn {
            return Some(arn.clone());
        }
        match (&execution.state_machine, &execution.name) {
            (Some(state_machine), Some(name)) => Some(execution_arn(state_machine, name)),
            _ => None,
        }
    }
}

fn list_len(list: &Option<Vec<serde_json::Value>>) -> u64 {
    list.as_ref().map_or(0, |l| l.len() as u64)
}

impl ManifestEvent for WorkflowMessage {
    fn manifest(&self) -> Option<ManifestPayload> {
        let pdr = self.payload.as_ref()?.pdr.as_ref()?;
        Some(ManifestPayload {
            name: pdr.name.clone(),
            acknowledgment_sent: pdr.ack_sent.unwrap_or(false),
            acknowledgment_body: pdr.ack_message.clone(),
        })
    }

    /// `{name}___{version}`, present only when both parts are.
    fn collection_id(&self) -> Option<String> {
        let collection = self.meta.as_ref()?.collection.as_ref()?;
        match (&collection.name, &collection.version) {
            (Some(name), Some(version)) => Some(format!("{name}___{version}")),
            _ => None,
        }
    }

    fn provider_id(&self) -> Option<String> {
        self.meta.as_ref()?.provider.as_ref()?.id.clone()
    }

    fn workflow_status(&self) -> Option<String> {
        self.meta.as_ref()?.status.clone()
    }

    fn execution_counts(&self) -> Option<ExecutionCounts> {
        let payload = self.payload.as_ref()?;
        if payload.running.is_none() && payload.completed.is_none() && payload.failed.is_none() {
            return None;
        }
        Some(ExecutionCounts {
            running: list_len(&payload.running),
            completed: list_len(&payload.completed),
            failed: list_len(&payload.failed),
        })
    }

    /// Console URL of the execution; the bare ARN when it carries no region.
    fn execution_ref(&self) -> Option<String> {
        let arn = self.execution_arn()?;
        Some(execution_url_from_arn(&arn).unwrap_or(arn))
    }

    fn workflow_start_time(&self) -> Option<i64> {
        self.execution.as_ref()?.workflow_start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_message() -> WorkflowMessage {
        WorkflowMessage::from_value(json!({
            "execution": {
                "state_machine": "arn:aws:states:us-east-1:123456789012:stateMachine:ParsePdr",
                "name": "run-1",
                "workflow_start_time": 1_700_000_000_000i64
            },
            "meta": {
                "status": "running",
                "collection": { "name": "MOD09GQ", "version": "006" },
                "provider": { "id": "s3_provider" }
            },
            "payload": {
                "pdr": { "name": "MOD09GQ.PDR", "ack_sent": true, "ack_message": "sent" },
                "running": ["arn:a", "arn:b"],
                "completed": ["arn:c"],
                "failed": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn reads_every_field() {
        let msg = full_message();
        assert_eq!(
            msg.manifest(),
            Some(ManifestPayload {
                name: Some("MOD09GQ.PDR".to_string()),
                acknowledgment_sent: true,
                acknowledgment_body: Some("sent".to_string()),
            })
        );
        assert_eq!(msg.collection_id().as_deref(), Some("MOD09GQ___006"));
        assert_eq!(msg.provider_id().as_deref(), Some("s3_provider"));
        assert_eq!(msg.workflow_status().as_deref(), Some("running"));
        assert_eq!(
            msg.execution_counts(),
            Some(ExecutionCounts {
                running: 2,
                completed: 1,
                failed: 0
            })
        );
        assert_eq!(msg.workflow_start_time(), Some(1_700_000_000_000));
        assert_eq!(
            msg.execution_ref().as_deref(),
            Some(
                "https://console.aws.amazon.com/states/home?region=us-east-1\
                 #/executions/details/arn:aws:states:us-east-1:123456789012:execution:ParsePdr:run-1"
            )
        );
    }

    #[test]
    fn message_without_pdr_has_no_manifest() {
        let msg = WorkflowMessage::from_json(r#"{"payload": {"granules": []}}"#).unwrap();
        assert_eq!(msg.manifest(), None);

        let msg = WorkflowMessage::from_json(r#"{"payload": {"pdr": null}}"#).unwrap();
        assert_eq!(msg.manifest(), None);

        let msg = WorkflowMessage::from_json("{}").unwrap();
        assert_eq!(msg.manifest(), None);
    }

    #[test]
    fn pdr_without_name_is_still_a_manifest() {
        let msg = WorkflowMessage::from_json(r#"{"payload": {"pdr": {}}}"#).unwrap();
        let payload = msg.manifest().unwrap();
        assert_eq!(payload.name, None);
        assert!(!payload.acknowledgment_sent);
    }

    #[test]
    fn collection_id_needs_name_and_version() {
        let msg = WorkflowMessage::from_json(r#"{"meta": {"collection": {"name": "MOD09GQ"}}}"#)
            .unwrap();
        assert_eq!(msg.collection_id(), None);
    }

    #[test]
    fn counts_absent_without_any_list() {
        let msg = WorkflowMessage::from_json(r#"{"payload": {"pdr": {"name": "a"}}}"#).unwrap();
        assert_eq!(msg.execution_counts(), None);

        let msg = WorkflowMessage::from_json(r#"{"payload": {"failed": [1, 2]}}"#).unwrap();
        assert_eq!(
            msg.execution_counts(),
            Some(ExecutionCounts {
                running: 0,
                completed: 0,
                failed: 2
            })
        );
    }

    #[test]
    fn explicit_arn_wins_over_state_machine() {
        let msg = WorkflowMessage::from_json(
            r#"{"execution": {"arn": "custom-run", "state_machine": "arn:aws:states:us-east-1:1:stateMachine:X", "name": "n"}}"#,
        )
        .unwrap();
        assert_eq!(msg.execution_arn().as_deref(), Some("custom-run"));
        // no region in a bare id, so the reference is the id itself
        assert_eq!(msg.execution_ref().as_deref(), Some("custom-run"));
    }

    #[test]
    fn structurally_invalid_json_is_rejected() {
        let err = WorkflowMessage::from_json(r#"{"payload": {"pdr": "not-an-object"}}"#);
        assert!(matches!(err, Err(MessageError::InvalidMessage(_))));
        assert!(WorkflowMessage::from_json("not json").is_err());
    }
}
