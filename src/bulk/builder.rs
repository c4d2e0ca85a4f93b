//! Operation builder
//!
//! Walks one transaction's action blocks and resolves every `{uri, body?}`
//! entry into a typed [`BulkOperation`], consulting the URI resolver and the
//! schema marshaling layer. When a transaction mixes several recognized
//! action tags, blocks are processed in the fixed priority create, then
//! delete, then patch.
//!
//! A failed entry is still appended to the output - partially built, with
//! whatever URI and method were established - so the caller can produce a
//! URI-tagged error response. Both are carried in [`BuildFailure`].

use serde_json::{Map, Value};

use crate::core::{ApiError, ApiResult};
use crate::query::{split_uri, validate_encoding, UriResolver, RELATIONSHIP_TYPE};
use crate::schema::{MediaType, SchemaRegistry};

use super::types::{
    ActionMask, BulkOperation, OperationKind, ACTION_DELETE, ACTION_PATCH, ACTION_PUT,
    RELATIONSHIP_SUFFIX,
};

/// A build error together with every operation established before it,
/// including the partially built one that caused it.
#[derive(Debug)]
pub struct BuildFailure {
    pub operations: Vec<BulkOperation>,
    pub cause: ApiError,
}

pub struct OperationBuilder<'a> {
    schema: &'a SchemaRegistry,
    resolver: &'a UriResolver,
    module: &'a str,
}

impl<'a> OperationBuilder<'a> {
    pub fn new(schema: &'a SchemaRegistry, resolver: &'a UriResolver, module: &'a str) -> Self {
        Self {
            schema,
            resolver,
            module,
        }
    }

    fn interface_error(&self) -> ApiError {
        ApiError::BadRequest(format!(
            "input payload does not follow {} interface",
            self.module
        ))
    }

    /// Resolve one transaction into its ordered operation list.
    pub fn build(
        &self,
        transaction: &Map<String, Value>,
        allowed: ActionMask,
        media: MediaType,
    ) -> Result<Vec<BulkOperation>, BuildFailure> {
        let mut operations = Vec::new();
        let mut matched = false;

        let blocks = [
            (ACTION_PUT, OperationKind::Create),
            (ACTION_DELETE, OperationKind::Delete),
            (ACTION_PATCH, OperationKind::Patch),
        ];
        for (tag, kind) in blocks {
            if !allowed.allows(tag) {
                continue;
            }
            let Some(block) = transaction.get(tag) else {
                continue;
            };
            matched = true;
            if let Err(cause) = self.push_block(&mut operations, block, kind, media) {
                return Err(BuildFailure { operations, cause });
            }
        }

        if !matched {
            return Err(BuildFailure {
                operations,
                cause: ApiError::BadRequest(format!(
                    "input payload does not follow {} interface - missing {}",
                    self.module,
                    allowed.expected_tags()
                )),
            });
        }
        Ok(operations)
    }

    /// Resolve one `{uri, body}` entry under an already-known method, for
    /// callers that carry the action per operation instead of per block.
    pub fn build_entry(
        &self,
        kind: OperationKind,
        item: &Value,
        media: MediaType,
    ) -> Result<BulkOperation, BuildFailure> {
        let mut operation = BulkOperation::new(kind);
        match self.fill(&mut operation, item, kind, media) {
            Ok(()) => Ok(operation),
            Err(cause) => Err(BuildFailure {
                operations: vec![operation],
                cause,
            }),
        }
    }

    fn push_block(
        &self,
        operations: &mut Vec<BulkOperation>,
        block: &Value,
        kind: OperationKind,
        media: MediaType,
    ) -> ApiResult<()> {
        let items = match block.as_array() {
            Some(items) => items,
            None => {
                operations.push(BulkOperation::new(kind));
                return Err(self.interface_error());
            }
        };
        for item in items {
            let mut operation = BulkOperation::new(kind);
            let filled = self.fill(&mut operation, item, kind, media);
            // Appended even on failure so the error response stays URI-tagged.
            operations.push(operation);
            filled?;
        }
        Ok(())
    }

    fn fill(
        &self,
        operation: &mut BulkOperation,
        item: &Value,
        kind: OperationKind,
        media: MediaType,
    ) -> ApiResult<()> {
        let entry = item.as_object().ok_or_else(|| self.interface_error())?;

        let raw_uri = entry
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::MissingField("must include object uri".to_string()))?;
        let (path, params) = split_uri(raw_uri);

        // Relationship sub-resources get the edge variants of create/delete.
        if path.ends_with(RELATIONSHIP_SUFFIX) {
            operation.kind = match kind {
                OperationKind::Create => OperationKind::CreateEdge,
                OperationKind::Delete => OperationKind::DeleteEdge,
                other => other,
            };
        }

        operation.uri = Some(path.clone());
        operation.params = params;

        if !validate_encoding(&path) {
            return Err(ApiError::InvalidUriEncoding(path));
        }

        let body = if operation.kind == OperationKind::Delete {
            Value::Object(Map::new())
        } else {
            let body = entry.get("body").ok_or_else(|| {
                ApiError::MissingField(format!(
                    "input payload does not follow {} interface - missing \"body\"",
                    self.module
                ))
            })?;
            if !body.is_object() {
                return Err(self.interface_error());
            }
            body.clone()
        };
        operation.raw_body = serde_json::to_string(&body)
            .map_err(|e| ApiError::Internal(format!("body serialization failed: {e}")))?;

        match operation.kind {
            OperationKind::CreateEdge | OperationKind::DeleteEdge => {
                operation.typed =
                    Some(
                        self.schema
                            .unmarshal(RELATIONSHIP_TYPE, &operation.raw_body, media)?,
                    );
            }
            OperationKind::Delete => {
                let descriptor = self.resolver.resolve(&path, &operation.params)?;
                operation.typed = Some(self.schema.introspect(&descriptor.result_type));
            }
            _ => {
                let descriptor = self.resolver.resolve(&path, &operation.params)?;
                let typed = self
                    .schema
                    .unmarshal(&descriptor.result_type, &operation.raw_body, media)?;
                self.schema.validate(&typed, &path, operation.kind)?;
                operation.typed = Some(typed);
            }
        }
        Ok(())
    }
}
