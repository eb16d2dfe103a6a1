//! 客户端地址提取
//!
//! 默认使用 TCP 连接的对端地址。只有当对端位于配置的可信代理
//! 列表（单个 IP 或 CIDR）中时，才读取 X-Forwarded-For / X-Real-IP。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &IpAddr, trusted_proxies: &[String]) -> bool {
    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(ip, proxy)
        } else {
            parse_addr(proxy).is_some_and(|proxy_addr| *ip == proxy_addr)
        }
    })
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.trim().parse() else {
        return false;
    };

    let Ok(network_addr) = network.trim().parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

/// 解析 "ip" 或 "ip:port"
fn parse_addr(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|s| s.ip()))
}

/// 从请求头提取转发的客户端地址
///
/// 优先取 X-Forwarded-For 的第一项（原始客户端），其次 X-Real-IP。
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(parse_addr);

    forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(parse_addr)
    })
}

/// 确定请求方地址
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> Option<IpAddr> {
    let peer_ip = req.peer_addr()?.ip();

    if !trusted_proxies.is_empty() && is_trusted_proxy(&peer_ip, trusted_proxies) {
        if let Some(real_ip) = extract_forwarded_ip_from_headers(req.headers()) {
            debug!("Trusted proxy {} forwarded for {}", peer_ip, real_ip);
            return Some(real_ip);
        }
        debug!("Trusted proxy {} sent no forwarding header", peer_ip);
    }

    Some(peer_ip)
}
