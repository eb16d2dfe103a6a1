//! IP 信息查询服务
//!
//! 把地址（IP 字面量或主机名）解析为 IP，然后合并反向 DNS、
//! City 数据库、ASN 数据库的结果。不做任何缓存。

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::errors::{IpInfoError, Result};
use crate::services::dns::HostResolver;
use crate::services::geoip::{AsnInfo, CityInfo, GeoIpLookup};

/// 单次批量查询的最大地址数
pub const MAX_BULK_ADDRESSES: usize = 100;

pub const INVALID_ADDRESS_MESSAGE: &str = "Invalid IP address or hostname";
pub const BULK_INVALID_ADDRESS_MESSAGE: &str = "Invalid IP address";
pub const BULK_LIMIT_MESSAGE: &str = "Maximum 100 IPs per request";

/// `/field/{address}/{field}` 可以查询的字段
pub const LOOKUP_FIELDS: [&str; 14] = [
    "ip",
    "hostname",
    "city",
    "region",
    "country",
    "loc",
    "org",
    "postal",
    "timezone",
    "asn",
    "asn_org",
    "is_vpn",
    "is_proxy",
    "is_hosting",
];

/// 单个地址的查询结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub ip: String,
    pub hostname: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// "lat,lon"
    pub loc: Option<String>,
    pub org: Option<String>,
    pub postal: Option<String>,
    pub timezone: Option<String>,
    /// "AS15169"
    pub asn: Option<String>,
    pub asn_org: Option<String>,
    // 没有威胁情报数据源，恒为 false
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_hosting: bool,
}

impl LookupResult {
    /// 只有地址、其余字段为空的结果
    pub fn empty(ip: IpAddr) -> Self {
        Self {
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    fn apply_city(&mut self, info: CityInfo) {
        self.city = non_empty(info.city);
        self.region = non_empty(info.region);
        self.country = non_empty(info.country);
        self.loc = format_location(info.latitude, info.longitude);
        self.postal = non_empty(info.postal);
        self.timezone = non_empty(info.timezone);
    }

    fn apply_asn(&mut self, info: AsnInfo) {
        self.asn = info.number.filter(|n| *n != 0).map(|n| format!("AS{}", n));
        if let Some(org) = non_empty(info.organization) {
            self.org = Some(org.clone());
            self.asn_org = Some(org);
        }
    }

    /// 按名称取单个字段，未知字段返回 None
    pub fn field(&self, name: &str) -> Result<Option<serde_json::Value>> {
        if !LOOKUP_FIELDS.contains(&name) {
            return Ok(None);
        }
        let value = serde_json::to_value(self)?;
        Ok(value.get(name).cloned())
    }
}

/// 批量查询中单个条目的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkEntry {
    Found(LookupResult),
    Failed { error: String },
}

/// 经纬度都存在且非 0 时才输出 "lat,lon"
pub fn format_location(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some(format!("{:?},{:?}", lat, lon)),
        _ => None,
    }
}

pub fn parse_ip_literal(input: &str) -> Option<IpAddr> {
    input.parse().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// 查询服务
#[derive(Clone)]
pub struct LookupService {
    geo: Arc<dyn GeoIpLookup>,
    dns: Arc<dyn HostResolver>,
}

impl LookupService {
    pub fn new(geo: Arc<dyn GeoIpLookup>, dns: Arc<dyn HostResolver>) -> Self {
        Self { geo, dns }
    }

    /// IP 字面量直接返回；否则尝试正向解析主机名
    pub async fn resolve_address(&self, input: &str) -> Result<IpAddr> {
        if let Some(ip) = parse_ip_literal(input) {
            return Ok(ip);
        }

        match self.dns.resolve(input).await {
            Some(ip) => {
                debug!("Resolved hostname {} to {}", input, ip);
                Ok(ip)
            }
            None => Err(IpInfoError::invalid_address(INVALID_ADDRESS_MESSAGE)),
        }
    }

    /// 查询单个 IP，数据库错误只会让对应字段组为空
    pub async fn lookup(&self, ip: IpAddr) -> LookupResult {
        debug!("Looking up IP {} (no cache)", ip);

        let (hostname, city, asn) = tokio::join!(
            self.dns.reverse(ip),
            self.geo.lookup_city(ip),
            self.geo.lookup_asn(ip)
        );

        self.assemble(ip, hostname, city, asn)
    }

    fn assemble(
        &self,
        ip: IpAddr,
        hostname: Option<String>,
        city: Result<Option<CityInfo>>,
        asn: Result<Option<AsnInfo>>,
    ) -> LookupResult {
        let mut result = LookupResult::empty(ip);
        result.hostname = non_empty(hostname);

        match city {
            Ok(Some(info)) => result.apply_city(info),
            Ok(None) => trace!("No City data for {}", ip),
            Err(e) => error!(
                "Error getting City data for {} from {}: {}",
                ip,
                self.geo.name(),
                e
            ),
        }

        match asn {
            Ok(Some(info)) => result.apply_asn(info),
            Ok(None) => trace!("No ASN data for {}", ip),
            Err(e) => error!(
                "Error getting ASN data for {} from {}: {}",
                ip,
                self.geo.name(),
                e
            ),
        }

        trace!("IP data for {}: {:?}", ip, result);
        result
    }

    pub async fn lookup_input(&self, input: &str) -> Result<LookupResult> {
        let ip = self.resolve_address(input).await?;
        Ok(self.lookup(ip).await)
    }

    /// 查询单个字段，返回 `{field: value}`
    ///
    /// 地址无效优先于字段不存在。
    pub async fn lookup_field(
        &self,
        input: &str,
        field: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let ip = self.resolve_address(input).await?;

        if !LOOKUP_FIELDS.contains(&field) {
            return Err(IpInfoError::field_not_found(format!(
                "Field '{}' not found",
                field
            )));
        }

        let result = self.lookup(ip).await;
        let value = result.field(field)?.unwrap_or(serde_json::Value::Null);

        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), value);
        Ok(body)
    }

    /// 批量查询逗号分隔的 IP 列表
    ///
    /// 超过上限时整体拒绝；每个条目单独校验，不做主机名解析。
    pub async fn bulk_lookup(&self, ips: &str) -> Result<BTreeMap<String, BulkEntry>> {
        let tokens: Vec<&str> = ips.split(',').map(str::trim).collect();

        if tokens.len() > MAX_BULK_ADDRESSES {
            return Err(IpInfoError::bulk_limit_exceeded(BULK_LIMIT_MESSAGE));
        }

        let unique: BTreeSet<&str> = tokens.into_iter().collect();
        debug!("Bulk lookup for {} unique addresses", unique.len());

        let mut entries = BTreeMap::new();
        let mut valid: Vec<(&str, IpAddr)> = Vec::new();
        for token in unique {
            match parse_ip_literal(token) {
                Some(ip) => valid.push((token, ip)),
                None => {
                    entries.insert(
                        token.to_string(),
                        BulkEntry::Failed {
                            error: BULK_INVALID_ADDRESS_MESSAGE.to_string(),
                        },
                    );
                }
            }
        }

        // 数据库整批读取，每个文件只打开一次
        let ips: Vec<IpAddr> = valid.iter().map(|(_, ip)| *ip).collect();
        let (hostnames, cities, asns) = tokio::join!(
            join_all(ips.iter().map(|ip| self.dns.reverse(*ip))),
            self.geo.lookup_city_batch(&ips),
            self.geo.lookup_asn_batch(&ips)
        );

        let rows = valid.into_iter().zip(hostnames).zip(cities).zip(asns);
        for ((((token, ip), hostname), city), asn) in rows {
            let result = self.assemble(ip, hostname, city, asn);
            entries.insert(token.to_string(), BulkEntry::Found(result));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录单条查询与批量查询的次数
    #[derive(Default)]
    struct CountingGeo {
        single: AtomicUsize,
        batches: AtomicUsize,
        batch_sizes: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl GeoIpLookup for CountingGeo {
        async fn lookup_city(&self, _ip: IpAddr) -> Result<Option<CityInfo>> {
            self.single.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn lookup_asn(&self, _ip: IpAddr) -> Result<Option<AsnInfo>> {
            self.single.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn lookup_city_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<CityInfo>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(ips.len());
            ips.iter()
                .map(|ip| {
                    Ok(Some(CityInfo {
                        country: Some(format!("C{}", ip)),
                        ..Default::default()
                    }))
                })
                .collect()
        }

        async fn lookup_asn_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<AsnInfo>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            ips.iter()
                .map(|_| Err(IpInfoError::database_unavailable("asn file corrupt")))
                .collect()
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct NoDns;

    #[async_trait]
    impl HostResolver for NoDns {
        async fn resolve(&self, _host: &str) -> Option<IpAddr> {
            None
        }

        async fn reverse(&self, _ip: IpAddr) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_bulk_lookup_reads_each_database_once() {
        let geo = Arc::new(CountingGeo::default());
        let service = LookupService::new(geo.clone(), Arc::new(NoDns));

        let ips: Vec<String> = (1..=MAX_BULK_ADDRESSES)
            .map(|n| format!("10.0.{}.{}", n / 250, n % 250))
            .collect();
        let entries = service.bulk_lookup(&ips.join(",")).await.unwrap();

        assert_eq!(entries.len(), MAX_BULK_ADDRESSES);
        assert_eq!(geo.single.load(Ordering::SeqCst), 0);
        assert_eq!(geo.batches.load(Ordering::SeqCst), 2);
        assert_eq!(*geo.batch_sizes.lock().unwrap(), vec![MAX_BULK_ADDRESSES]);

        // 结果按地址对应，ASN 错误只清空 ASN 字段
        match &entries["10.0.0.7"] {
            BulkEntry::Found(result) => {
                assert_eq!(result.country.as_deref(), Some("C10.0.0.7"));
                assert_eq!(result.asn, None);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bulk_lookup_skips_invalid_tokens_in_batch() {
        let geo = Arc::new(CountingGeo::default());
        let service = LookupService::new(geo.clone(), Arc::new(NoDns));

        let entries = service.bulk_lookup("8.8.8.8, nope ,8.8.8.8").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(matches!(entries["nope"], BulkEntry::Failed { .. }));
        assert!(matches!(entries["8.8.8.8"], BulkEntry::Found(_)));
        assert_eq!(*geo.batch_sizes.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_format_location() {
        assert_eq!(
            format_location(Some(37.751), Some(-97.822)),
            Some("37.751,-97.822".to_string())
        );
        assert_eq!(
            format_location(Some(48.0), Some(2.5)),
            Some("48.0,2.5".to_string())
        );
        assert_eq!(format_location(Some(0.0), Some(10.0)), None);
        assert_eq!(format_location(Some(10.0), None), None);
        assert_eq!(format_location(None, None), None);
    }

    #[test]
    fn test_empty_result_has_only_address() {
        let result = LookupResult::empty("2001:db8::1".parse().unwrap());
        assert_eq!(result.ip, "2001:db8::1");
        assert!(result.hostname.is_none());
        assert!(result.loc.is_none());
        assert!(!result.is_vpn && !result.is_proxy && !result.is_hosting);
    }

    #[test]
    fn test_apply_city_drops_empty_strings() {
        let mut result = LookupResult::empty("1.2.3.4".parse().unwrap());
        result.apply_city(CityInfo {
            city: Some(String::new()),
            region: Some("California".to_string()),
            country: Some("US".to_string()),
            latitude: Some(37.386),
            longitude: Some(-122.0838),
            postal: None,
            timezone: Some("America/Los_Angeles".to_string()),
        });

        assert_eq!(result.city, None);
        assert_eq!(result.region.as_deref(), Some("California"));
        assert_eq!(result.loc.as_deref(), Some("37.386,-122.0838"));
        assert_eq!(result.timezone.as_deref(), Some("America/Los_Angeles"));
    }

    #[test]
    fn test_apply_asn_copies_org() {
        let mut result = LookupResult::empty("8.8.8.8".parse().unwrap());
        result.apply_asn(AsnInfo {
            number: Some(15169),
            organization: Some("GOOGLE".to_string()),
        });

        assert_eq!(result.asn.as_deref(), Some("AS15169"));
        assert_eq!(result.asn_org.as_deref(), Some("GOOGLE"));
        assert_eq!(result.org.as_deref(), Some("GOOGLE"));
    }

    #[test]
    fn test_field_lookup() {
        let mut result = LookupResult::empty("8.8.8.8".parse().unwrap());
        result.country = Some("US".to_string());

        assert_eq!(
            result.field("country").unwrap(),
            Some(serde_json::Value::String("US".to_string()))
        );
        assert_eq!(result.field("city").unwrap(), Some(serde_json::Value::Null));
        assert_eq!(
            result.field("is_vpn").unwrap(),
            Some(serde_json::Value::Bool(false))
        );
        assert_eq!(result.field("bogus_field_name").unwrap(), None);
    }

    #[test]
    fn test_lookup_fields_match_serialized_keys() {
        let value = serde_json::to_value(LookupResult::default()).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), LOOKUP_FIELDS.len());
        for field in LOOKUP_FIELDS {
            assert!(keys.contains(&field), "missing field {}", field);
        }
    }

    #[test]
    fn test_bulk_entry_serialization() {
        let failed = BulkEntry::Failed {
            error: BULK_INVALID_ADDRESS_MESSAGE.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"error": "Invalid IP address"})
        );
    }
}
