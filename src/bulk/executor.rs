//! Transaction executor
//!
//! Runs one transaction's ordered operations against a single engine
//! transaction. Atomicity is at transaction granularity: one failing
//! operation rolls back every operation in the transaction, including ones
//! that individually reported success.
//!
//! Fatal engine failures are converted into a single synthetic failure
//! response tagged with the last known URI and method, the same fallback the
//! pipeline uses for build failures, so the two layers never double-report.

use log::{debug, error, warn};

use crate::core::ApiError;
use crate::engine::{DBRequest, EngineTransaction, GraphEngine};
use crate::query::UriResolver;

use super::types::{
    BulkOperation, BulkOperationResponse, OperationKind, RequestContext, TransactionResult,
};

pub struct TransactionExecutor<'a, E: GraphEngine> {
    engine: &'a E,
    resolver: &'a UriResolver,
}

impl<'a, E: GraphEngine> TransactionExecutor<'a, E> {
    pub fn new(engine: &'a E, resolver: &'a UriResolver) -> Self {
        Self { engine, resolver }
    }

    pub fn execute(
        &self,
        operations: Vec<BulkOperation>,
        ctx: &RequestContext,
    ) -> TransactionResult {
        let mut responses: Vec<BulkOperationResponse> = Vec::with_capacity(operations.len());
        let mut last_uri: Option<String> = None;
        let mut last_kind = OperationKind::Create;

        // Resolve every operation into a DB request up front; a resolution
        // failure is fatal for the whole transaction.
        let mut requests = Vec::with_capacity(operations.len());
        for operation in &operations {
            last_kind = operation.kind;
            last_uri.clone_from(&operation.uri);
            let uri = match &operation.uri {
                Some(uri) => uri.clone(),
                None => {
                    return Self::fatal(
                        responses,
                        last_kind,
                        None,
                        &ApiError::Internal("operation reached executor without a uri".into()),
                    )
                }
            };
            let descriptor = match self.resolver.resolve(&uri, &operation.params) {
                Ok(descriptor) => descriptor,
                Err(cause) => return Self::fatal(responses, last_kind, last_uri, &cause),
            };
            requests.push(DBRequest {
                kind: operation.kind,
                uri,
                descriptor,
                typed: operation.typed.clone(),
                raw_body: operation.raw_body.clone(),
                correlation_id: ctx.correlation_id.clone(),
            });
        }

        let mut txn = match self.engine.begin(ctx.connection_kind()) {
            Ok(txn) => txn,
            Err(cause) => return Self::fatal(responses, last_kind, last_uri, &cause.into()),
        };

        for request in &requests {
            last_kind = request.kind;
            last_uri = Some(request.uri.clone());
            match txn.execute(request) {
                Ok(outcome) => {
                    debug!(
                        "bulk op {:?} {} -> {} [{}]",
                        request.kind, request.uri, outcome.status, request.correlation_id
                    );
                    responses.push(BulkOperationResponse {
                        kind: request.kind,
                        uri: Some(request.uri.clone()),
                        status: outcome.status,
                        body: outcome.body.clone(),
                    });
                }
                Err(cause) => {
                    if let Err(rollback_err) = txn.rollback() {
                        error!("rollback after engine failure also failed: {rollback_err}");
                    }
                    return Self::fatal(responses, last_kind, last_uri, &cause.into());
                }
            }
        }

        let all_succeeded = responses
            .iter()
            .all(|r| (200..300).contains(&r.status));
        if all_succeeded {
            match txn.commit() {
                Ok(()) => TransactionResult {
                    responses,
                    committed: true,
                },
                Err(cause) => Self::fatal(responses, last_kind, last_uri, &cause.into()),
            }
        } else {
            if let Err(rollback_err) = txn.rollback() {
                error!("transaction rollback failed: {rollback_err}");
            }
            TransactionResult {
                responses,
                committed: false,
            }
        }
    }

    fn fatal(
        mut responses: Vec<BulkOperationResponse>,
        kind: OperationKind,
        uri: Option<String>,
        cause: &ApiError,
    ) -> TransactionResult {
        warn!("bulk transaction failed: {cause}");
        responses.push(BulkOperationResponse {
            kind,
            uri,
            status: cause.status(),
            body: Some(cause.to_string()),
        });
        TransactionResult {
            responses,
            committed: false,
        }
    }
}
