//! Server mode
//!
//! Configures and starts the HTTP lookup server.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::configure_routes;
use crate::api::middleware::{RequestIdMiddleware, TimingMiddleware};
use crate::api::services::{DatabaseStatus, TrustedProxies};
use crate::config::{CorsConfig, get_config};
use crate::runtime::lifetime;
use crate::services::{DnsResolver, GeoIpLookup, HostResolver, LookupService, MaxMindProvider};

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if !cors_config.enabled {
        return;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed. \
            Set allowed_origins explicitly or use '[\"*\"]' for any origin."
        );
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        error!(
            "allow_any_origin + allow_credentials would let any website make \
            credentialed requests. Credentials are disabled."
        );
    }
}

/// Build CORS middleware from configuration
pub fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // Disabled: browser same-origin policy
    if !cors_config.enabled {
        return Cors::default();
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "HEAD", "OPTIONS"])
        .allowed_header(actix_web::http::header::ACCEPT)
        .allowed_header(actix_web::http::header::CONTENT_TYPE)
        .expose_headers(vec!["x-request-id"])
        .max_age(cors_config.max_age as usize);

    if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    if cors_config.allow_credentials && !is_any_origin {
        cors = cors.supports_credentials();
    }

    cors
}

/// Run the HTTP server
///
/// Configuration and logging must be initialized before calling this function.
pub async fn run_server() -> Result<()> {
    let config = get_config();
    let geo: Arc<dyn GeoIpLookup> = Arc::new(MaxMindProvider::from_config(&config.geoip));
    let geoip_config = config.geoip.clone();
    let cors_config = config.cors.clone();
    let trusted_proxies = TrustedProxies(config.server.trusted_proxies.clone());

    validate_cors_config(&cors_config);

    if trusted_proxies.0.is_empty() {
        info!("No trusted proxies configured, using peer addresses for client lookups");
    } else {
        warn!(
            "Trusting X-Forwarded-For from proxies: {:?}",
            trusted_proxies.0
        );
    }

    let databases = DatabaseStatus::probe(&geoip_config).await;
    if !databases.all_present() {
        warn!(
            "GeoLite2 databases missing (city: {}, asn: {}). Lookups will return empty fields until the refresher runs.",
            databases.city_db_exists, databases.asn_db_exists
        );
    }

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} worker threads", cpu_count);

    let bind_address = (config.server.host.clone(), config.server.port);

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);
        // 每个 worker 有自己的 runtime，resolver 的后台任务跟随 worker
        let dns: Arc<dyn HostResolver> = Arc::new(DnsResolver::from_system_conf());
        let lookup = LookupService::new(geo.clone(), dns);

        App::new()
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .wrap(Compress::default())
            .app_data(web::Data::new(lookup))
            .app_data(web::Data::new(geoip_config.clone()))
            .app_data(web::Data::new(trusted_proxies.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(configure_routes)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count)
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}:{}", bind_address.0, bind_address.1))?;

    warn!(
        "Starting server at http://{}:{}",
        bind_address.0, bind_address.1
    );

    let server = server.run();
    let handle = server.handle();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::wait_for_shutdown_signal() => {
            if tokio::time::timeout(lifetime::shutdown::shutdown_timeout(), handle.stop(true))
                .await
                .is_err()
            {
                error!(
                    "Server did not stop within {} seconds",
                    lifetime::shutdown::SHUTDOWN_TIMEOUT_SECS
                );
            }
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{HttpResponse, test};

    #[actix_web::test]
    async fn test_cors_any_origin() {
        let cors_config = CorsConfig::default();
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(&cors_config))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Origin", "https://example.org"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(
            resp.headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[actix_web::test]
    async fn test_cors_restricted_origin() {
        let cors_config = CorsConfig {
            allowed_origins: vec!["https://allowed.example".to_string()],
            ..Default::default()
        };
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(&cors_config))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Origin", "https://allowed.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://allowed.example"
        );
    }
}
