use serde::{Deserialize, Serialize};

/// Who a workflow run notifies. Knock identifies users by `id` and
/// upserts the email and name it is given alongside.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipient {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize, Clone)]
pub struct WorkflowTrigger {
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowTriggerResponse {
    pub workflow_run_id: String,
}
