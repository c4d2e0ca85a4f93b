//! Bulk transaction pipeline
//!
//! Accepts a multi-operation payload of independent transactions. If one
//! transaction fails its effects are rolled back, but the others' aren't.
//! Within a single transaction, if one operation fails, all the others'
//! changes are rolled back too.
//!
//! The pipeline parses the envelope, enforces the payload limit, resolves
//! each action block into typed operations, executes every transaction
//! against its own engine transaction, and folds the per-transaction results
//! into one aggregated response that preserves submission order.

pub mod aggregate;
pub mod builder;
pub mod executor;
pub mod lock;
pub mod pipeline;
pub mod single;
pub mod types;

pub use aggregate::aggregate;
pub use builder::{BuildFailure, OperationBuilder};
pub use executor::TransactionExecutor;
pub use lock::LockRegistry;
pub use pipeline::{guess_kind, BulkPipeline};
pub use single::{
    SingleOperation, SingleOperationResponse, SingleOutcome, SingleTransaction,
    SingleTransactionResponse,
};
pub use types::{
    ActionMask, BulkOperation, BulkOperationResponse, OperationKind, RequestContext,
    TransactionResult, ACTION_DELETE, ACTION_PATCH, ACTION_PUT, RELATIONSHIP_SUFFIX,
};
