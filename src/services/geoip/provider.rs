//! GeoIP Provider 抽象层
//!
//! 统一的 GeoIP 查询接口。City 与 ASN 两个数据库分别查询，
//! 任何一方失败都只影响对应的字段组。

use std::net::IpAddr;

use async_trait::async_trait;

use crate::errors::Result;

/// City 数据库中的地理位置信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityInfo {
    /// 城市名称（英文）
    pub city: Option<String>,
    /// 最具体的行政区划名称
    pub region: Option<String>,
    /// ISO 3166-1 alpha-2 国家代码 (e.g., "CN", "US")
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal: Option<String>,
    pub timezone: Option<String>,
}

/// ASN 数据库中的自治系统信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsnInfo {
    pub number: Option<u32>,
    pub organization: Option<String>,
}

/// GeoIP 查询 trait
///
/// - `Ok(None)`：数据库不存在或地址不在数据库中
/// - `Err(_)`：数据库无法打开或解析
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup_city(&self, ip: IpAddr) -> Result<Option<CityInfo>>;

    async fn lookup_asn(&self, ip: IpAddr) -> Result<Option<AsnInfo>>;

    /// 批量查询 City，结果与 `ips` 一一对应
    ///
    /// 默认逐个调用 `lookup_city`；基于文件的实现应覆盖它，
    /// 让整批地址共用一次数据库打开。
    async fn lookup_city_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<CityInfo>>> {
        let mut results = Vec::with_capacity(ips.len());
        for ip in ips {
            results.push(self.lookup_city(*ip).await);
        }
        results
    }

    /// 批量查询 ASN，结果与 `ips` 一一对应
    async fn lookup_asn_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<AsnInfo>>> {
        let mut results = Vec::with_capacity(ips.len());
        for ip in ips {
            results.push(self.lookup_asn(*ip).await);
        }
        results
    }

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}
