//! HTTP API handlers for mtm-orchestrator
//!
//! REST control surface plus an SSE event stream for a front end.

pub mod health;
pub mod pipeline;
pub mod remote;
pub mod resolution;
pub mod session;
pub mod sse;

pub use health::health_routes;
pub use pipeline::pipeline_routes;
pub use remote::remote_routes;
pub use resolution::resolution_routes;
pub use session::session_routes;
pub use sse::event_stream;
