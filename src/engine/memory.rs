//! In-memory graph engine
//!
//! Backs the service with a process-local property graph. Each transaction
//! stages its mutations privately; `commit` applies them under the write
//! lock, `rollback` drops them. Readers never observe a half-applied batch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::bulk::{OperationKind, RELATIONSHIP_SUFFIX};

use super::{
    ConnectionKind, DBRequest, EngineResult, EngineTransaction, GraphEngine, OperationOutcome,
    VertexRecord,
};

/// Edge endpoints, normalized so `(a, b)` and `(b, a)` address the same edge.
type EdgeKey = (String, String);

fn edge_key(a: &str, b: &str) -> EdgeKey {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Default)]
struct GraphData {
    vertices: HashMap<String, Value>,
    edges: HashMap<EdgeKey, Value>,
}

#[derive(Clone, Default)]
pub struct MemoryGraphEngine {
    graph: Arc<RwLock<GraphData>>,
}

impl MemoryGraphEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed properties of a vertex, if present.
    pub fn vertex(&self, uri: &str) -> Option<Value> {
        self.graph.read().vertices.get(uri).cloned()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.read().vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.read().edges.len()
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.graph.read().edges.contains_key(&edge_key(a, b))
    }

    pub fn vertices(&self) -> Vec<VertexRecord> {
        self.graph
            .read()
            .vertices
            .iter()
            .map(|(uri, properties)| VertexRecord {
                uri: uri.clone(),
                properties: properties.clone(),
            })
            .collect()
    }
}

impl GraphEngine for MemoryGraphEngine {
    type Txn = MemoryTransaction;

    fn begin(&self, _kind: ConnectionKind) -> EngineResult<Self::Txn> {
        Ok(MemoryTransaction {
            graph: Arc::clone(&self.graph),
            staged: Vec::new(),
        })
    }
}

enum Mutation {
    PutVertex(String, Value),
    MergeVertex(String, Value),
    RemoveVertex(String),
    PutEdge(EdgeKey, Value),
    RemoveEdge(EdgeKey),
}

pub struct MemoryTransaction {
    graph: Arc<RwLock<GraphData>>,
    staged: Vec<Mutation>,
}

impl MemoryTransaction {
    /// Vertex existence as seen by this transaction: committed state plus
    /// the staged mutations applied in order.
    fn vertex_exists(&self, uri: &str) -> bool {
        let mut exists = self.graph.read().vertices.contains_key(uri);
        for mutation in &self.staged {
            match mutation {
                Mutation::PutVertex(u, _) if u == uri => exists = true,
                Mutation::RemoveVertex(u) if u == uri => exists = false,
                _ => {}
            }
        }
        exists
    }

    fn edge_exists(&self, key: &EdgeKey) -> bool {
        let mut exists = self.graph.read().edges.contains_key(key);
        for mutation in &self.staged {
            match mutation {
                Mutation::PutEdge(k, _) if k == key => exists = true,
                Mutation::RemoveEdge(k) if k == key => exists = false,
                _ => {}
            }
        }
        exists
    }

    fn request_properties(request: &DBRequest) -> Value {
        request
            .typed
            .as_ref()
            .map(|t| t.value.clone())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Source and target endpoints of an edge request. The source is the
    /// resource owning the relationship sub-resource; the target comes from
    /// the relationship body's `related-link`.
    fn edge_endpoints(request: &DBRequest) -> Result<(String, String), OperationOutcome> {
        let source = request
            .uri
            .strip_suffix(RELATIONSHIP_SUFFIX)
            .unwrap_or(&request.uri)
            .to_string();
        let related = request
            .typed
            .as_ref()
            .and_then(|t| t.value.get("related-link"))
            .and_then(Value::as_str)
            .map(str::to_string);
        match related {
            Some(target) => Ok((source, target)),
            None => Err(OperationOutcome::failure(
                400,
                "relationship body must include related-link",
            )),
        }
    }
}

impl EngineTransaction for MemoryTransaction {
    fn execute(&mut self, request: &DBRequest) -> EngineResult<OperationOutcome> {
        let outcome = match request.kind {
            OperationKind::Create => {
                let existed = self.vertex_exists(&request.uri);
                self.staged.push(Mutation::PutVertex(
                    request.uri.clone(),
                    Self::request_properties(request),
                ));
                OperationOutcome::success(if existed { 200 } else { 201 })
            }
            OperationKind::Patch => {
                if !self.vertex_exists(&request.uri) {
                    OperationOutcome::failure(
                        404,
                        format!("resource not found for uri={}", request.uri),
                    )
                } else {
                    self.staged.push(Mutation::MergeVertex(
                        request.uri.clone(),
                        Self::request_properties(request),
                    ));
                    OperationOutcome::success(200)
                }
            }
            OperationKind::Delete => {
                if !self.vertex_exists(&request.uri) {
                    OperationOutcome::failure(
                        404,
                        format!("resource not found for uri={}", request.uri),
                    )
                } else {
                    self.staged.push(Mutation::RemoveVertex(request.uri.clone()));
                    OperationOutcome::success(204)
                }
            }
            OperationKind::CreateEdge => match Self::edge_endpoints(request) {
                Ok((source, target)) => {
                    if !self.vertex_exists(&source) {
                        OperationOutcome::failure(
                            404,
                            format!("resource not found for uri={source}"),
                        )
                    } else {
                        let key = edge_key(&source, &target);
                        let existed = self.edge_exists(&key);
                        self.staged
                            .push(Mutation::PutEdge(key, Self::request_properties(request)));
                        OperationOutcome::success(if existed { 200 } else { 201 })
                    }
                }
                Err(outcome) => outcome,
            },
            OperationKind::DeleteEdge => match Self::edge_endpoints(request) {
                Ok((source, target)) => {
                    let key = edge_key(&source, &target);
                    if !self.edge_exists(&key) {
                        OperationOutcome::failure(
                            404,
                            format!("relationship not found between {source} and {target}"),
                        )
                    } else {
                        self.staged.push(Mutation::RemoveEdge(key));
                        OperationOutcome::success(204)
                    }
                }
                Err(outcome) => outcome,
            },
        };
        Ok(outcome)
    }

    fn commit(self) -> EngineResult<()> {
        let mut graph = self.graph.write();
        for mutation in self.staged {
            match mutation {
                Mutation::PutVertex(uri, value) => {
                    graph.vertices.insert(uri, value);
                }
                Mutation::MergeVertex(uri, value) => match graph.vertices.get_mut(&uri) {
                    Some(Value::Object(existing)) => {
                        if let Value::Object(incoming) = value {
                            for (k, v) in incoming {
                                existing.insert(k, v);
                            }
                        }
                    }
                    Some(slot) => *slot = value,
                    // Target vanished between staging and apply (removed by
                    // a concurrently committed transaction). The patch lands
                    // as an insert so the batch always applies in full.
                    None => {
                        graph.vertices.insert(uri, value);
                    }
                },
                Mutation::RemoveVertex(uri) => {
                    graph.vertices.remove(&uri);
                }
                Mutation::PutEdge(key, value) => {
                    graph.edges.insert(key, value);
                }
                Mutation::RemoveEdge(key) => {
                    graph.edges.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn rollback(self) -> EngineResult<()> {
        // Staged mutations were never applied; dropping them is the rollback.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryDescriptor;
    use crate::schema::TypedObject;
    use serde_json::json;

    fn request(kind: OperationKind, uri: &str, body: Value) -> DBRequest {
        DBRequest {
            kind,
            uri: uri.to_string(),
            descriptor: QueryDescriptor::new(uri.to_string(), "pserver".to_string()),
            typed: Some(TypedObject::new("pserver", body)),
            raw_body: String::new(),
            correlation_id: "test".to_string(),
        }
    }

    #[test]
    fn staged_mutations_invisible_before_commit() {
        let engine = MemoryGraphEngine::new();
        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");

        let outcome = txn
            .execute(&request(
                OperationKind::Create,
                "/network/pservers/pserver/ps-1",
                json!({"hostname": "ps-1"}),
            ))
            .expect("execute failed");
        assert_eq!(outcome.status, 201);
        assert_eq!(engine.vertex_count(), 0);

        txn.commit().expect("commit failed");
        assert_eq!(engine.vertex_count(), 1);
        assert_eq!(
            engine.vertex("/network/pservers/pserver/ps-1"),
            Some(json!({"hostname": "ps-1"}))
        );
    }

    #[test]
    fn rollback_discards_all_staged_work() {
        let engine = MemoryGraphEngine::new();
        let mut txn = engine.begin(ConnectionKind::Cached).expect("begin failed");
        txn.execute(&request(OperationKind::Create, "/a/b/x", json!({})))
            .expect("execute failed");
        txn.execute(&request(OperationKind::Create, "/a/b/y", json!({})))
            .expect("execute failed");
        txn.rollback().expect("rollback failed");
        assert_eq!(engine.vertex_count(), 0);
    }

    #[test]
    fn create_sees_earlier_staged_create() {
        let engine = MemoryGraphEngine::new();
        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        let first = txn
            .execute(&request(OperationKind::Create, "/a/b/x", json!({"n": 1})))
            .expect("execute failed");
        let second = txn
            .execute(&request(OperationKind::Create, "/a/b/x", json!({"n": 2})))
            .expect("execute failed");
        assert_eq!(first.status, 201);
        assert_eq!(second.status, 200);
    }

    #[test]
    fn delete_missing_vertex_is_404_not_fatal() {
        let engine = MemoryGraphEngine::new();
        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        let outcome = txn
            .execute(&request(OperationKind::Delete, "/a/b/x", json!({})))
            .expect("execute failed");
        assert_eq!(outcome.status, 404);
        assert!(outcome.body.is_some());
    }

    #[test]
    fn patch_merges_into_existing_properties() {
        let engine = MemoryGraphEngine::new();

        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        txn.execute(&request(
            OperationKind::Create,
            "/a/b/x",
            json!({"hostname": "x", "in-maint": false}),
        ))
        .expect("execute failed");
        txn.commit().expect("commit failed");

        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        let outcome = txn
            .execute(&request(
                OperationKind::Patch,
                "/a/b/x",
                json!({"in-maint": true}),
            ))
            .expect("execute failed");
        assert_eq!(outcome.status, 200);
        txn.commit().expect("commit failed");

        assert_eq!(
            engine.vertex("/a/b/x"),
            Some(json!({"hostname": "x", "in-maint": true}))
        );
    }

    #[test]
    fn edge_lifecycle() {
        let engine = MemoryGraphEngine::new();

        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        txn.execute(&request(OperationKind::Create, "/a/b/x", json!({})))
            .expect("execute failed");
        txn.execute(&request(OperationKind::Create, "/a/b/y", json!({})))
            .expect("execute failed");
        let uri = format!("/a/b/x{RELATIONSHIP_SUFFIX}");
        let outcome = txn
            .execute(&request(
                OperationKind::CreateEdge,
                &uri,
                json!({"related-link": "/a/b/y"}),
            ))
            .expect("execute failed");
        assert_eq!(outcome.status, 201);
        txn.commit().expect("commit failed");
        assert!(engine.has_edge("/a/b/x", "/a/b/y"));

        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        let outcome = txn
            .execute(&request(
                OperationKind::DeleteEdge,
                &uri,
                json!({"related-link": "/a/b/y"}),
            ))
            .expect("execute failed");
        assert_eq!(outcome.status, 204);
        txn.commit().expect("commit failed");
        assert_eq!(engine.edge_count(), 0);
    }

    #[test]
    fn commit_applies_fully_when_patch_target_was_deleted_concurrently() {
        let engine = MemoryGraphEngine::new();

        let mut seed = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        seed.execute(&request(
            OperationKind::Create,
            "/a/b/target",
            json!({"hostname": "t"}),
        ))
        .expect("execute failed");
        seed.commit().expect("commit failed");

        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        txn.execute(&request(OperationKind::Create, "/a/b/fresh", json!({})))
            .expect("execute failed");
        let outcome = txn
            .execute(&request(
                OperationKind::Patch,
                "/a/b/target",
                json!({"in-maint": true}),
            ))
            .expect("execute failed");
        assert_eq!(outcome.status, 200);

        // A second transaction removes the patch target and commits first.
        let mut other = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        other
            .execute(&request(OperationKind::Delete, "/a/b/target", json!({})))
            .expect("execute failed");
        other.commit().expect("commit failed");

        // The first commit still applies as a whole: the create lands and
        // the patch falls back to an insert.
        txn.commit().expect("commit failed");
        assert_eq!(engine.vertex("/a/b/fresh"), Some(json!({})));
        assert_eq!(engine.vertex("/a/b/target"), Some(json!({"in-maint": true})));
    }

    #[test]
    fn edge_without_related_link_is_400() {
        let engine = MemoryGraphEngine::new();
        let mut txn = engine.begin(ConnectionKind::RealTime).expect("begin failed");
        txn.execute(&request(OperationKind::Create, "/a/b/x", json!({})))
            .expect("execute failed");
        let uri = format!("/a/b/x{RELATIONSHIP_SUFFIX}");
        let outcome = txn
            .execute(&request(OperationKind::CreateEdge, &uri, json!({})))
            .expect("execute failed");
        assert_eq!(outcome.status, 400);
    }
}
