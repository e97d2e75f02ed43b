//! MowForce Core: error types and consent configuration.

pub mod config;
pub mod error;

pub use config::ConsentConfig;
pub use error::{Error, Result};
