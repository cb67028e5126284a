//! HTTP adapter for the Switchboard orchestration core
//!
//! Exposes the minimal surface collaborators need: the node catalog,
//! ad-hoc node execution, event intake (fire-and-forget or fire-and-wait
//! depending on the matched trigger), direct workflow invocation,
//! execution-result polling, and event-source lifecycle control.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
