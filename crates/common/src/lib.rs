//! Common utilities and shared types for formkit.
//!
//! This crate provides foundational components used across all formkit crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: UUID-based identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use formkit_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Listening on {}:{} with id {}", config.server.host, config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{Config, Environment, LogFormat};
pub use error::{AppError, AppResult, expose_internal_details, first_validation_message};
pub use id::{IdGenerator, is_uuid};
