//! HTTP service module
//!
//! Exposes the bulk pipeline over REST.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::HttpError;
pub use router::create_router;
pub use state::AppState;
