//! ipinfo - A self-hosted IP information service
//!
//! Answers "what is known about this IP address?" from local MaxMind
//! GeoLite2 City and ASN databases, with reverse DNS, and keeps those
//! databases fresh with a background refresher.
//!
//! # Architecture
//! - `api`: HTTP handlers, middleware and error mapping
//! - `services`: lookup logic, GeoIP/DNS seams and the database refresher
//! - `config`: configuration loading and validation
//! - `runtime`: execution modes (serve, refresh, config)
//! - `system`: logging setup
//! - `utils`: client address extraction

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
