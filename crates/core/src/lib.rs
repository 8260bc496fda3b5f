//! Core business logic for formkit.
//!
//! Services enforce ownership: every form and question operation takes the
//! requesting user's id and checks it against the form owner before touching
//! question rows.

pub mod services;
pub mod token;

pub use services::*;
pub use token::{Claims, Identity, TokenCodec};
