use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::trace;

use crate::config::GeoIpConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStatus {
    pub city_db_exists: bool,
    pub asn_db_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_db_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_db_size: Option<u64>,
}

impl DatabaseStatus {
    pub async fn probe(config: &GeoIpConfig) -> Self {
        let city_db_size = file_size(&config.city_db_path()).await;
        let asn_db_size = file_size(&config.asn_db_path()).await;

        Self {
            city_db_exists: city_db_size.is_some(),
            asn_db_exists: asn_db_size.is_some(),
            city_db_size,
            asn_db_size,
        }
    }

    pub fn all_present(&self) -> bool {
        self.city_db_exists && self.asn_db_exists
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub databases: DatabaseStatus,
    pub caching: String,
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(geoip: web::Data<GeoIpConfig>) -> impl Responder {
        trace!("Received health check request");

        let databases = DatabaseStatus::probe(&geoip).await;

        HttpResponse::Ok().json(HealthResponse {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            databases,
            caching: "disabled".to_string(),
        })
    }

    // 两个数据库文件都存在才算就绪
    pub async fn readiness_check(geoip: web::Data<GeoIpConfig>) -> impl Responder {
        trace!("Received readiness check request");

        if DatabaseStatus::probe(&geoip).await.all_present() {
            HttpResponse::Ok()
                .append_header(("Content-Type", "text/plain"))
                .body("OK")
        } else {
            HttpResponse::ServiceUnavailable()
                .append_header(("Content-Type", "text/plain"))
                .body("databases missing")
        }
    }

    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由，挂载在 `/health` 下
pub fn health_routes() -> actix_web::Scope {
    web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
}
