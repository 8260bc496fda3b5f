//! Client data layer for the formkit API.
//!
//! [`ApiClient`] issues the REST calls and keeps read results in a
//! [`QueryCache`]. Writes invalidate the cached keys they affect so the next
//! read goes back to the server.

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use cache::{QueryCache, QueryKey};
pub use client::ApiClient;
pub use error::{ClientError, ClientResult};
pub use types::*;
