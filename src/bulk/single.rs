//! Single-transaction endpoint support
//!
//! `POST /{version}/bulk/single-transaction` carries exactly one transaction
//! as an ordered `operations` list, each entry naming its own `action`.
//! Unlike the grouped bulk endpoints, the outer HTTP status reflects the
//! outcome: `201 Created` with one response per operation when the
//! transaction commits, or the first failing operation's status when it
//! rolls back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{ApiError, ApiResult};

use super::types::{OperationKind, ACTION_DELETE, ACTION_PATCH, ACTION_PUT};

/// Endpoint label used in interface error messages.
pub const SINGLE_TRANSACTION_MODULE: &str = "bulk/single-transaction";

#[derive(Debug, Deserialize)]
pub struct SingleTransaction {
    #[serde(default)]
    pub operations: Vec<SingleOperation>,
}

/// One `{action, uri, body}` entry. Fields are optional at parse time so
/// validation can report every missing property in one message.
#[derive(Debug, Deserialize)]
pub struct SingleOperation {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SingleTransactionResponse {
    #[serde(rename = "operation-responses")]
    pub operation_responses: Vec<SingleOperationResponse>,
}

#[derive(Debug, Serialize)]
pub struct SingleOperationResponse {
    pub action: String,
    pub uri: String,
    #[serde(rename = "response-status-code")]
    pub response_status_code: u16,
    #[serde(rename = "response-body")]
    pub response_body: Option<Value>,
}

/// Result of a single-transaction request once the envelope was accepted.
#[derive(Debug)]
pub enum SingleOutcome {
    Committed(SingleTransactionResponse),
    RolledBack { status: u16, message: String },
}

pub fn parse(raw: &str) -> ApiResult<SingleTransaction> {
    serde_json::from_str(raw).map_err(|_| {
        ApiError::BadRequest(format!(
            "input payload does not follow {SINGLE_TRANSACTION_MODULE} interface"
        ))
    })
}

pub fn action_kind(action: &str) -> Option<OperationKind> {
    match action {
        ACTION_PUT => Some(OperationKind::Create),
        ACTION_DELETE => Some(OperationKind::Delete),
        ACTION_PATCH => Some(OperationKind::Patch),
        _ => None,
    }
}

/// Checks every operation for a known action, a uri, and a body, collecting
/// all violations into one message.
pub fn validate(transaction: &SingleTransaction) -> ApiResult<()> {
    let mut problems = Vec::new();
    for (i, operation) in transaction.operations.iter().enumerate() {
        match operation.action.as_deref() {
            None | Some("") => problems.push(format!("operation {i} missing 'action'")),
            Some(action) if action_kind(action).is_none() => {
                problems.push(format!("operation {i} has invalid action '{action}'"))
            }
            _ => {}
        }
        if operation.uri.as_deref().map_or(true, str::is_empty) {
            problems.push(format!("operation {i} missing 'uri'"));
        }
        if operation.body.is_none() {
            problems.push(format!("operation {i} missing 'body'"));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "input payload missing required properties. [{}]",
            problems.join(", ")
        )))
    }
}
