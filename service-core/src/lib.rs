//! Shared plumbing for capstan services: configuration loading, the common
//! error taxonomy and tracing setup.

pub mod config;
pub mod error;
pub mod observability;

pub use config::Config;
pub use error::AppError;
