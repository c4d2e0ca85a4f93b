//! invgraph - A network-inventory graph store with a bulk REST pipeline
//!
//! This crate exposes a property-graph inventory over HTTP. Clients submit
//! batched create/update/delete operations; each transaction in a batch is
//! executed atomically against the graph engine and failures are isolated
//! between independent transactions.

pub mod api;
pub mod bulk;
pub mod config;
pub mod core;
pub mod engine;
pub mod query;
pub mod schema;
