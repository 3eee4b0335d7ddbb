//! buggywhip Core Library
//!
//! Shared functionality for buggywhip components:
//! - Configuration resolution and hierarchy
//! - Source navigation (line listing and keyword search)
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod source;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use source::SourceNavigator;
