//! Response aggregation
//!
//! Folds the ordered per-transaction result lists into the unified
//! `{"transaction": [...]}` payload. Each transaction entry groups its
//! responses under the caller-facing action tag of the first response's
//! method; edge methods map back onto the plain tags. Null URIs are emitted
//! explicitly so clients can positionally correlate failures that occurred
//! before a URI was known.

use serde_json::{Map, Value};

use super::types::{TransactionResult, ACTION_PUT};

pub fn aggregate(results: &[TransactionResult]) -> Value {
    let mut transactions = Vec::with_capacity(results.len());
    for result in results {
        let tag = result
            .responses
            .first()
            .map(|r| r.kind.action_tag())
            .unwrap_or(ACTION_PUT);

        let mut items = Vec::with_capacity(result.responses.len());
        for response in &result.responses {
            let mut body = Map::new();
            body.insert(
                response.status.to_string(),
                response
                    .body
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );

            let mut item = Map::new();
            item.insert(
                "uri".to_string(),
                response.uri.clone().map(Value::String).unwrap_or(Value::Null),
            );
            item.insert("body".to_string(), Value::Object(body));
            items.push(Value::Object(item));
        }

        let mut entry = Map::new();
        entry.insert(tag.to_string(), Value::Array(items));
        transactions.push(Value::Object(entry));
    }

    let mut root = Map::new();
    root.insert("transaction".to_string(), Value::Array(transactions));
    Value::Object(root)
}
