use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::api::error::{ErrorDetail, error_response};
use crate::errors::IpInfoError;
use crate::services::LookupService;
use crate::utils::extract_client_ip;

/// 允许读取转发头的代理地址（IP 或 CIDR）
#[derive(Clone, Debug, Default)]
pub struct TrustedProxies(pub Vec<String>);

#[derive(Debug, Deserialize)]
pub struct BulkQuery {
    pub ips: Option<String>,
}

pub struct LookupApi;

impl LookupApi {
    /// `GET /`：查询请求方自己的地址
    pub async fn client_lookup(
        req: HttpRequest,
        service: web::Data<LookupService>,
        proxies: Option<web::Data<TrustedProxies>>,
    ) -> impl Responder {
        let trusted: &[String] = proxies.as_ref().map(|p| p.0.as_slice()).unwrap_or(&[]);

        let Some(ip) = extract_client_ip(&req, trusted) else {
            return error_response(&IpInfoError::internal("client address unavailable"));
        };

        trace!("Client lookup for {}", ip);
        HttpResponse::Ok().json(service.lookup(ip).await)
    }

    /// `GET /{address}` 与 `GET /ip/{address}`
    pub async fn address_lookup(
        path: web::Path<String>,
        service: web::Data<LookupService>,
    ) -> impl Responder {
        let address = path.into_inner();
        match service.lookup_input(&address).await {
            Ok(result) => HttpResponse::Ok().json(result),
            Err(e) => {
                debug!("Lookup for {:?} rejected: {}", address, e);
                error_response(&e)
            }
        }
    }

    /// `GET /field/{address}/{field}`
    pub async fn field_lookup(
        path: web::Path<(String, String)>,
        service: web::Data<LookupService>,
    ) -> impl Responder {
        let (address, field) = path.into_inner();
        match service.lookup_field(&address, &field).await {
            Ok(body) => HttpResponse::Ok().json(body),
            Err(e) => {
                debug!("Field lookup {}/{} rejected: {}", address, field, e);
                error_response(&e)
            }
        }
    }

    /// `GET /bulk?ips=a,b,c`
    pub async fn bulk_lookup(
        query: web::Query<BulkQuery>,
        service: web::Data<LookupService>,
    ) -> impl Responder {
        let Some(ips) = query.into_inner().ips else {
            return HttpResponse::BadRequest()
                .json(ErrorDetail::new("Missing required query parameter: ips"));
        };

        match service.bulk_lookup(&ips).await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(e) => error_response(&e),
        }
    }
}

/// 查询路由
///
/// `/{address}` 匹配任意单段路径，必须最后注册。
pub fn lookup_routes() -> actix_web::Scope {
    web::scope("")
        .route("/bulk", web::get().to(LookupApi::bulk_lookup))
        .route("/ip/{address}", web::get().to(LookupApi::address_lookup))
        .route(
            "/field/{address}/{field}",
            web::get().to(LookupApi::field_lookup),
        )
        .route("/{address}", web::get().to(LookupApi::address_lookup))
        .route("/", web::get().to(LookupApi::client_lookup))
}
