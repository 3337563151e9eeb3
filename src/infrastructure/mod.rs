//! Infrastructure layer module
//!
//! Adapters behind the domain ports and the ambient services of the binary:
//! - Configuration loading (figment)
//! - Logging (tracing)
//! - Statistics backends (console, CSV)
//! - Bundled execution targets

pub mod config;
pub mod logging;
pub mod statistics;
pub mod targets;
