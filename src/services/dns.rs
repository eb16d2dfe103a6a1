//! DNS 解析
//!
//! 主机名 → IP（正向）与 IP → 主机名（PTR 反向）解析。

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use tracing::{debug, trace, warn};

/// DNS 查询超时
const DNS_TIMEOUT_SECS: u64 = 3;

/// 主机名解析 trait
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// 将主机名解析为一个 IP 地址，优先 IPv4
    async fn resolve(&self, host: &str) -> Option<IpAddr>;

    /// 反向解析，没有 PTR 记录时返回 None
    async fn reverse(&self, ip: IpAddr) -> Option<String>;
}

/// 基于 hickory-resolver 的实现
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// 使用系统 DNS 配置创建解析器，读取失败时回退到默认配置
    pub fn from_system_conf() -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(
                    "Failed to read system DNS configuration: {}, using default resolvers",
                    e
                );
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
        opts.attempts = 2;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Option<IpAddr> {
        let lookup = match self.resolver.lookup_ip(host).await {
            Ok(lookup) => lookup,
            Err(e) => {
                debug!("Forward DNS lookup for {} failed: {}", host, e);
                return None;
            }
        };

        let addrs: Vec<IpAddr> = lookup.iter().collect();
        let ip = addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied();

        trace!("Resolved {} to {:?}", host, ip);
        ip
    }

    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        match self.resolver.reverse_lookup(ip).await {
            Ok(response) => response
                .iter()
                .next()
                .map(|name| normalize_hostname(&name.to_utf8())),
            Err(e) => {
                trace!("No PTR record for {}: {}", ip, e);
                None
            }
        }
    }
}

/// 去掉 FQDN 末尾的根点
pub fn normalize_hostname(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("dns.google."), "dns.google");
        assert_eq!(normalize_hostname("one.one.one.one"), "one.one.one.one");
        assert_eq!(normalize_hostname(""), "");
    }
}
