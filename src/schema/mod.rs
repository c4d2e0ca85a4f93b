//! Object marshaling
//!
//! Converts raw request bodies plus a resource-type name into typed
//! in-memory objects, and runs the object-level validation pass. The bulk
//! pipeline consumes this through [`SchemaRegistry`]; the concrete checks
//! here are intentionally shallow since resource schemas are not part of the
//! pipeline's contract.

use serde_json::{Map, Value};

use crate::bulk::OperationKind;
use crate::core::{ApiError, ApiResult};
use crate::query::RELATIONSHIP_TYPE;

/// Supported wire encodings for resource bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Json,
}

/// A validated, typed in-memory object.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedObject {
    pub type_name: String,
    pub value: Value,
}

impl TypedObject {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw body into a typed object. Failure embeds the raw body so
    /// error responses stay diagnosable.
    pub fn unmarshal(
        &self,
        type_name: &str,
        raw: &str,
        _media: MediaType,
    ) -> ApiResult<TypedObject> {
        let value: Value =
            serde_json::from_str(raw).map_err(|_| ApiError::Unmarshal(raw.to_string()))?;
        if !value.is_object() {
            return Err(ApiError::Unmarshal(raw.to_string()));
        }
        Ok(TypedObject::new(type_name, value))
    }

    /// An empty object of the named type, used for delete operations where
    /// no body is supplied.
    pub fn introspect(&self, type_name: &str) -> TypedObject {
        TypedObject::new(type_name, Value::Object(Map::new()))
    }

    /// Object-level validation pass, run for non-delete, non-edge
    /// operations before the operation is accepted.
    pub fn validate(&self, obj: &TypedObject, uri: &str, _kind: OperationKind) -> ApiResult<()> {
        let properties = match obj.value.as_object() {
            Some(map) => map,
            None => {
                return Err(ApiError::Validation(format!(
                    "body for uri={uri} is not an object"
                )))
            }
        };
        if properties.keys().any(|k| k.is_empty()) {
            return Err(ApiError::Validation(format!(
                "body for uri={uri} contains an empty property name"
            )));
        }
        if obj.type_name == RELATIONSHIP_TYPE && !properties.contains_key("related-link") {
            return Err(ApiError::Validation(format!(
                "relationship for uri={uri} must include related-link"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unmarshal_accepts_json_objects() {
        let schema = SchemaRegistry::new();
        let obj = schema
            .unmarshal("pserver", r#"{"hostname": "ps-1"}"#, MediaType::Json)
            .expect("unmarshal failed");
        assert_eq!(obj.type_name, "pserver");
        assert_eq!(obj.value, json!({"hostname": "ps-1"}));
    }

    #[test]
    fn unmarshal_rejects_non_objects_and_garbage() {
        let schema = SchemaRegistry::new();
        for raw in ["[1,2]", "42", "{\"broken\""] {
            let err = schema
                .unmarshal("pserver", raw, MediaType::Json)
                .expect_err("expected unmarshal failure");
            match err {
                ApiError::Unmarshal(body) => assert_eq!(body, raw),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn empty_object_passes_validation() {
        let schema = SchemaRegistry::new();
        let obj = TypedObject::new("pserver", json!({}));
        schema
            .validate(&obj, "/a/b/x", OperationKind::Create)
            .expect("validation failed");
    }

    #[test]
    fn empty_property_name_fails_validation() {
        let schema = SchemaRegistry::new();
        let obj = TypedObject::new("pserver", json!({"": 1}));
        let err = schema
            .validate(&obj, "/a/b/x", OperationKind::Create)
            .expect_err("expected validation failure");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn introspect_yields_empty_object() {
        let schema = SchemaRegistry::new();
        let obj = schema.introspect("pserver");
        assert_eq!(obj.value, json!({}));
    }
}
