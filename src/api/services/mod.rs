pub mod health;
pub mod lookup;

pub use health::{DatabaseStatus, HealthResponse, HealthService, health_routes};
pub use lookup::{LookupApi, TrustedProxies, lookup_routes};
