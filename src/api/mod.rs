//! HTTP surface: handlers, middleware and error mapping.

pub mod error;
pub mod middleware;
pub mod services;

use actix_web::web;

use services::{health_routes, lookup_routes};

/// 注册全部路由
///
/// `/health` 必须先于 `/{address}` 注册，否则会被当作主机名查询。
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/health").service(health_routes()))
        .service(lookup_routes());
}
