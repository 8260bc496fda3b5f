//! HTTP API layer for formkit.
//!
//! - **Endpoints**: auth, forms, questions and health under one router
//! - **Extractors**: authenticated identity, validated JSON bodies
//! - **State**: services shared by every handler
//!
//! Built on Axum 0.8. The server binary mounts [`router`] under `/api` and
//! adds the Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, CookieSettings};
