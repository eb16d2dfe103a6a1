//! System-level modules
//!
//! This module contains system-level functionality:
//! - Logging setup (tracing subscriber, file rotation)

pub mod logging;

pub use logging::init_logging;
