//! Mode routing
//!
//! - `serve`: HTTP lookup server
//! - `refresh`: database refresher loop (or a single cycle)
//! - `config`: configuration helpers

pub mod config;
pub mod refresher;
pub mod server;

pub use config::generate_config;
pub use refresher::run_refresher;
pub use server::run_server;
