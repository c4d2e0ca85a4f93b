//! Graph engine seam
//!
//! The bulk pipeline talks to graph storage through the [`GraphEngine`] and
//! [`EngineTransaction`] traits. One engine transaction backs one bulk
//! transaction; every operation in the batch executes against the same
//! transaction and is committed or rolled back as a unit.
//!
//! `execute` never fails for ordinary domain outcomes (not-found, conflict) -
//! those are reported as HTTP-style statuses in [`OperationOutcome`]. An
//! [`EngineError`] means the engine itself is broken and the transaction must
//! be rolled back.

pub mod memory;

use serde_json::Value;
use thiserror::Error;

use crate::bulk::OperationKind;
use crate::query::QueryDescriptor;
use crate::schema::TypedObject;

pub use memory::MemoryGraphEngine;

/// Connection kind requested by the caller via the `Real-Time` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    RealTime,
    Cached,
}

/// Fatal engine failures. Domain outcomes are statuses, not errors.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("rollback failed: {0}")]
    RollbackFailed(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The unit of work submitted to the engine.
#[derive(Debug, Clone)]
pub struct DBRequest {
    pub kind: OperationKind,
    pub uri: String,
    pub descriptor: QueryDescriptor,
    pub typed: Option<TypedObject>,
    pub raw_body: String,
    pub correlation_id: String,
}

/// Status/body pair reported for one executed request.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub status: u16,
    pub body: Option<String>,
}

impl OperationOutcome {
    pub fn success(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Graph storage entry point. Cheap to clone; shared across requests.
pub trait GraphEngine: Send + Sync {
    type Txn: EngineTransaction;

    fn begin(&self, kind: ConnectionKind) -> EngineResult<Self::Txn>;
}

/// One engine transaction. Mutations become visible only on `commit`.
pub trait EngineTransaction {
    fn execute(&mut self, request: &DBRequest) -> EngineResult<OperationOutcome>;

    fn commit(self) -> EngineResult<()>;

    fn rollback(self) -> EngineResult<()>;
}

/// Exported view of a committed vertex, used by tests and tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexRecord {
    pub uri: String,
    pub properties: Value,
}
