//! PromptCut Service
//!
//! Microservice for text-directive video editing: upload reservation,
//! payment gating, directive compilation, and the edit-job lifecycle.

pub mod config;
pub mod db;
pub mod directive;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
