//! Bulk pipeline orchestration
//!
//! Drives one request end to end: envelope parsing, payload-limit
//! enforcement (with the override credential), one executor per transaction,
//! and aggregation. Transactions run strictly sequentially in submission
//! order; a failure inside one transaction never aborts its siblings.
//!
//! Top-level envelope errors (malformed JSON, missing `transactions`, empty
//! payload, limit exceeded) fail the whole request via `Err` before any
//! transaction is attempted. Everything past that point produces an `Ok`
//! aggregated payload - callers opted into fire-and-forget batch semantics,
//! so per-operation status lives inside the body and the outer response is a
//! fixed `201 Created`.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use crate::config::BulkConfig;
use crate::core::{ApiError, ApiResult};
use crate::engine::GraphEngine;
use crate::query::UriResolver;
use crate::schema::SchemaRegistry;

use super::aggregate::aggregate;
use super::builder::OperationBuilder;
use super::executor::TransactionExecutor;
use super::lock::LockRegistry;
use super::single::{
    self, SingleOperationResponse, SingleOutcome, SingleTransaction, SingleTransactionResponse,
};
use super::types::{
    ActionMask, BulkOperation, BulkOperationResponse, OperationKind, RequestContext,
    TransactionResult, ACTION_DELETE, ACTION_PATCH, ACTION_PUT,
};

/// Fallback method guess for failures that happen before any operation's
/// method is known, taken from the transaction's own raw keys. The priority
/// order put, then delete, then patch, then default put is contract.
pub fn guess_kind(transaction: &Map<String, Value>) -> OperationKind {
    if transaction.contains_key(ACTION_PUT) {
        OperationKind::Create
    } else if transaction.contains_key(ACTION_DELETE) {
        OperationKind::Delete
    } else if transaction.contains_key(ACTION_PATCH) {
        OperationKind::Patch
    } else {
        OperationKind::Create
    }
}

pub struct BulkPipeline<E: GraphEngine> {
    engine: Arc<E>,
    schema: SchemaRegistry,
    resolver: UriResolver,
    config: BulkConfig,
    locks: LockRegistry<String>,
}

impl<E: GraphEngine> BulkPipeline<E> {
    pub fn new(engine: Arc<E>, config: BulkConfig) -> Self {
        Self {
            engine,
            schema: SchemaRegistry::new(),
            resolver: UriResolver::new(),
            config,
            locks: LockRegistry::new(),
        }
    }

    fn interface_error(module: &str) -> ApiError {
        ApiError::BadRequest(format!(
            "input payload does not follow {module} interface"
        ))
    }

    /// Process one bulk request body. `module` labels the endpoint in error
    /// messages ("bulk add", "bulk process"); `allowed` is its action mask.
    pub fn process(
        &self,
        raw: &str,
        ctx: &RequestContext,
        allowed: ActionMask,
        module: &str,
    ) -> ApiResult<Value> {
        let transactions = Self::parse_envelope(raw, module)?;
        self.enforce_limit(&transactions, ctx)?;

        let builder = OperationBuilder::new(&self.schema, &self.resolver, module);
        let mut results = Vec::with_capacity(transactions.len());
        for (index, transaction) in transactions.iter().enumerate() {
            let result = self.process_transaction(&builder, transaction, ctx, allowed, module);
            debug!(
                "bulk transaction {} [{}]: {} operations, committed={}",
                index,
                ctx.correlation_id,
                result.responses.len(),
                result.committed
            );
            results.push(result);
        }
        Ok(aggregate(&results))
    }

    /// Process one single-transaction request body. Envelope and validation
    /// errors surface as `Err`; anything past that is an outcome whose
    /// status the handler forwards as-is.
    pub fn process_single(&self, raw: &str, ctx: &RequestContext) -> ApiResult<SingleOutcome> {
        let transaction = single::parse(raw)?;
        if transaction.operations.is_empty() {
            return Err(ApiError::BadRequest(
                "payload had no objects to operate on".to_string(),
            ));
        }
        if !self.override_allowed(ctx) && transaction.operations.len() > self.config.payload_limit
        {
            return Err(ApiError::LimitExceeded(self.config.payload_limit));
        }
        single::validate(&transaction)?;

        let builder = OperationBuilder::new(
            &self.schema,
            &self.resolver,
            single::SINGLE_TRANSACTION_MODULE,
        );
        let mut operations = Vec::with_capacity(transaction.operations.len());
        for (index, entry) in transaction.operations.iter().enumerate() {
            let kind = entry
                .action
                .as_deref()
                .and_then(single::action_kind)
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("operation {index} has no resolvable action"))
                })?;
            let item = json!({"uri": entry.uri, "body": entry.body});
            let operation = builder
                .build_entry(kind, &item, ctx.media_type)
                .map_err(|failure| {
                    ApiError::BadRequest(format!(
                        "error with operation {index}: {}",
                        failure.cause
                    ))
                })?;
            operations.push(operation);
        }

        let key = Self::lock_key(&operations);
        let executor = TransactionExecutor::new(self.engine.as_ref(), &self.resolver);
        let result = self
            .locks
            .with_lock(key, move || executor.execute(operations, ctx));
        Ok(Self::single_outcome(&transaction, result))
    }

    /// Committed transactions report per-operation responses in submission
    /// order; rolled-back ones surface the first failure's status.
    fn single_outcome(transaction: &SingleTransaction, result: TransactionResult) -> SingleOutcome {
        if result.committed {
            let operation_responses = transaction
                .operations
                .iter()
                .zip(result.responses)
                .map(|(operation, response)| SingleOperationResponse {
                    action: operation.action.clone().unwrap_or_default(),
                    uri: operation.uri.clone().unwrap_or_default(),
                    response_status_code: response.status,
                    response_body: response.body.map(Value::String),
                })
                .collect();
            return SingleOutcome::Committed(SingleTransactionResponse {
                operation_responses,
            });
        }
        for (index, response) in result.responses.iter().enumerate() {
            if !(200..300).contains(&response.status) {
                return SingleOutcome::RolledBack {
                    status: response.status,
                    message: format!(
                        "operation {index} with action ({}) on uri ({}) failed with status code ({}) and msg ({})",
                        response.kind.action_tag(),
                        response.uri.as_deref().unwrap_or("unknown"),
                        response.status,
                        response.body.as_deref().unwrap_or("none")
                    ),
                };
            }
        }
        SingleOutcome::RolledBack {
            status: 500,
            message: "transaction reported failure with no failing operation".to_string(),
        }
    }

    fn parse_envelope(raw: &str, module: &str) -> ApiResult<Vec<Value>> {
        let input: Value =
            serde_json::from_str(raw).map_err(|_| Self::interface_error(module))?;
        let envelope = input
            .as_object()
            .ok_or_else(|| Self::interface_error(module))?;
        let transactions = envelope.get("transactions").ok_or_else(|| {
            ApiError::BadRequest(format!(
                "input payload does not follow {module} interface - missing \"transactions\""
            ))
        })?;
        let transactions = transactions
            .as_array()
            .ok_or_else(|| Self::interface_error(module))?;
        if transactions.is_empty() {
            return Err(ApiError::BadRequest(
                "payload had no objects to operate on".to_string(),
            ));
        }
        Ok(transactions.clone())
    }

    /// Every array entry under an action tag counts as one operation;
    /// anything else under a tag counts as one.
    fn count_operations(transactions: &[Value]) -> usize {
        transactions
            .iter()
            .map(|transaction| match transaction.as_object() {
                Some(map) => map
                    .values()
                    .map(|v| v.as_array().map_or(1, |a| a.len()))
                    .sum(),
                None => 1,
            })
            .sum()
    }

    fn override_allowed(&self, ctx: &RequestContext) -> bool {
        match &ctx.override_limit {
            Some(credential) => {
                self.config.allow_override_limit
                    && !self.config.override_limit_secret.is_empty()
                    && credential == &self.config.override_limit_secret
            }
            None => false,
        }
    }

    fn enforce_limit(&self, transactions: &[Value], ctx: &RequestContext) -> ApiResult<()> {
        let total = Self::count_operations(transactions);
        if total == 0 {
            return Err(ApiError::BadRequest(
                "payload had no objects to operate on".to_string(),
            ));
        }
        if self.override_allowed(ctx) {
            info!(
                "payload limit overridden by {} [{}]",
                ctx.source_of_truth.as_deref().unwrap_or("unknown"),
                ctx.correlation_id
            );
            return Ok(());
        }
        if total > self.config.payload_limit {
            return Err(ApiError::LimitExceeded(self.config.payload_limit));
        }
        Ok(())
    }

    fn process_transaction(
        &self,
        builder: &OperationBuilder<'_>,
        transaction: &Value,
        ctx: &RequestContext,
        allowed: ActionMask,
        module: &str,
    ) -> TransactionResult {
        let map = match transaction.as_object() {
            Some(map) => map,
            None => {
                return Self::failure_result(
                    None,
                    OperationKind::Create,
                    &Self::interface_error(module),
                )
            }
        };

        let operations = match builder.build(map, allowed, ctx.media_type) {
            Ok(operations) if operations.is_empty() => {
                // Validly formatted transaction with nothing to do counts as
                // a client error.
                return Self::failure_result(
                    None,
                    guess_kind(map),
                    &ApiError::BadRequest("payload had no objects to operate on".to_string()),
                );
            }
            Ok(operations) => operations,
            Err(failure) => {
                let (uri, kind) = match failure.operations.last() {
                    Some(partial) => (partial.uri.clone(), partial.kind),
                    None => (None, guess_kind(map)),
                };
                return Self::failure_result(uri, kind, &failure.cause);
            }
        };

        // Serialize against other bulk requests touching the same URI set.
        // One key per transaction, so two pipelines can never deadlock.
        let key = Self::lock_key(&operations);
        let executor = TransactionExecutor::new(self.engine.as_ref(), &self.resolver);
        self.locks
            .with_lock(key, move || executor.execute(operations, ctx))
    }

    fn lock_key(operations: &[BulkOperation]) -> String {
        let mut uris: Vec<&str> = operations
            .iter()
            .filter_map(|op| op.uri.as_deref())
            .collect();
        uris.sort_unstable();
        uris.dedup();
        uris.join("\n")
    }

    fn failure_result(
        uri: Option<String>,
        kind: OperationKind,
        cause: &ApiError,
    ) -> TransactionResult {
        warn!("bulk transaction failed before execution: {cause}");
        TransactionResult {
            responses: vec![BulkOperationResponse {
                kind,
                uri,
                status: cause.status(),
                body: Some(cause.to_string()),
            }],
            committed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: Value) -> Map<String, Value> {
        value.as_object().expect("not an object").clone()
    }

    #[test]
    fn guess_kind_priority_is_put_delete_patch() {
        assert_eq!(
            guess_kind(&keys(json!({"patch": [], "delete": [], "put": []}))),
            OperationKind::Create
        );
        assert_eq!(
            guess_kind(&keys(json!({"patch": [], "delete": []}))),
            OperationKind::Delete
        );
        assert_eq!(guess_kind(&keys(json!({"patch": []}))), OperationKind::Patch);
    }

    #[test]
    fn guess_kind_defaults_to_put() {
        assert_eq!(guess_kind(&keys(json!({"get": []}))), OperationKind::Create);
        assert_eq!(guess_kind(&keys(json!({}))), OperationKind::Create);
    }

    #[test]
    fn count_operations_counts_array_elements_and_odd_values() {
        let transactions = vec![
            json!({"put": [{"uri": "/a"}, {"uri": "/b"}]}),
            json!({"delete": [{"uri": "/c"}], "patch": "not-an-array"}),
            json!("not-an-object"),
        ];
        assert_eq!(
            BulkPipeline::<crate::engine::MemoryGraphEngine>::count_operations(&transactions),
            5
        );
    }

    #[test]
    fn lock_key_is_sorted_and_deduplicated() {
        let mut a = BulkOperation::new(OperationKind::Create);
        a.uri = Some("/b".to_string());
        let mut b = BulkOperation::new(OperationKind::Create);
        b.uri = Some("/a".to_string());
        let mut c = BulkOperation::new(OperationKind::Delete);
        c.uri = Some("/b".to_string());
        assert_eq!(
            BulkPipeline::<crate::engine::MemoryGraphEngine>::lock_key(&[a, b, c]),
            "/a\n/b"
        );
    }
}
