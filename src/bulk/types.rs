use uuid::Uuid;

use crate::engine::ConnectionKind;
use crate::query::QueryParams;
use crate::schema::{MediaType, TypedObject};

/// Caller-facing action tags.
pub const ACTION_PUT: &str = "put";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_PATCH: &str = "patch";

/// Reserved relationship sub-resource suffix. URIs ending here are routed to
/// the edge variants of create/delete.
pub const RELATIONSHIP_SUFFIX: &str = "/relationship-list/relationship";

/// Internal method tag of one resolved operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Delete,
    Patch,
    CreateEdge,
    DeleteEdge,
}

impl OperationKind {
    /// Map back to the caller's vocabulary. The edge variants fold into the
    /// plain tags.
    pub fn action_tag(self) -> &'static str {
        match self {
            OperationKind::Create | OperationKind::CreateEdge => ACTION_PUT,
            OperationKind::Delete | OperationKind::DeleteEdge => ACTION_DELETE,
            OperationKind::Patch => ACTION_PATCH,
        }
    }
}

/// Which action tags an endpoint permits.
#[derive(Debug, Clone, Copy)]
pub struct ActionMask {
    pub put: bool,
    pub delete: bool,
    pub patch: bool,
}

impl ActionMask {
    /// `bulkadd`: only `put` action blocks.
    pub const ADD_ONLY: ActionMask = ActionMask {
        put: true,
        delete: false,
        patch: false,
    };

    /// `bulkprocess`: `put`, `delete`, and `patch`.
    pub const PROCESS: ActionMask = ActionMask {
        put: true,
        delete: true,
        patch: true,
    };

    pub fn allows(&self, tag: &str) -> bool {
        match tag {
            ACTION_PUT => self.put,
            ACTION_DELETE => self.delete,
            ACTION_PATCH => self.patch,
            _ => false,
        }
    }

    /// Human-readable list of permitted tags, used in error messages.
    pub fn expected_tags(&self) -> String {
        let mut tags = Vec::new();
        if self.put {
            tags.push(ACTION_PUT);
        }
        if self.delete {
            tags.push(ACTION_DELETE);
        }
        if self.patch {
            tags.push(ACTION_PATCH);
        }
        match tags.len() {
            0 | 1 => tags.join(""),
            _ => {
                let (last, rest) = tags.split_last().unwrap_or((&"", &[]));
                format!("{} or {last}", rest.join(" "))
            }
        }
    }
}

/// The resolved unit of work. The URI is filled in as soon as it is known,
/// even when later resolution steps fail, so error responses can still be
/// tagged with it.
#[derive(Debug, Clone)]
pub struct BulkOperation {
    pub kind: OperationKind,
    pub uri: Option<String>,
    pub typed: Option<TypedObject>,
    pub raw_body: String,
    pub params: QueryParams,
}

impl BulkOperation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            uri: None,
            typed: None,
            raw_body: String::new(),
            params: QueryParams::new(),
        }
    }
}

/// One response per executed or failed operation.
#[derive(Debug, Clone)]
pub struct BulkOperationResponse {
    pub kind: OperationKind,
    pub uri: Option<String>,
    pub status: u16,
    pub body: Option<String>,
}

/// Ordered responses of one transaction plus its commit outcome.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub responses: Vec<BulkOperationResponse>,
    pub committed: bool,
}

/// Per-request header context forwarded into the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, from `X-TransactionId` or generated.
    pub correlation_id: String,
    /// Caller application identifier (`X-FromAppId`).
    pub source_of_truth: Option<String>,
    /// `Real-Time` hint for the engine's connection-kind selection.
    pub real_time: bool,
    /// `X-OverrideLimit` credential, when supplied.
    pub override_limit: Option<String>,
    pub media_type: MediaType,
}

impl RequestContext {
    pub fn connection_kind(&self) -> ConnectionKind {
        if self.real_time {
            ConnectionKind::RealTime
        } else {
            ConnectionKind::Cached
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            source_of_truth: None,
            real_time: false,
            override_limit: None,
            media_type: MediaType::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kinds_fold_into_plain_action_tags() {
        assert_eq!(OperationKind::Create.action_tag(), "put");
        assert_eq!(OperationKind::CreateEdge.action_tag(), "put");
        assert_eq!(OperationKind::Delete.action_tag(), "delete");
        assert_eq!(OperationKind::DeleteEdge.action_tag(), "delete");
        assert_eq!(OperationKind::Patch.action_tag(), "patch");
    }

    #[test]
    fn add_only_mask_rejects_delete_and_patch() {
        assert!(ActionMask::ADD_ONLY.allows("put"));
        assert!(!ActionMask::ADD_ONLY.allows("delete"));
        assert!(!ActionMask::ADD_ONLY.allows("patch"));
        assert!(!ActionMask::PROCESS.allows("get"));
    }

    #[test]
    fn expected_tags_reads_naturally() {
        assert_eq!(ActionMask::ADD_ONLY.expected_tags(), "put");
        assert_eq!(ActionMask::PROCESS.expected_tags(), "put delete or patch");
    }

    #[test]
    fn real_time_header_selects_connection_kind() {
        let mut ctx = RequestContext::default();
        assert_eq!(ctx.connection_kind(), ConnectionKind::Cached);
        ctx.real_time = true;
        assert_eq!(ctx.connection_kind(), ConnectionKind::RealTime);
    }
}
