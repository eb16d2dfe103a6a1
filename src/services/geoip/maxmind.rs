//! MaxMind GeoLite2 数据库实现
//!
//! 每次查询时打开本地 `.mmdb` 文件，读取完字段后立即释放。
//! 刷新任务随时可能替换文件，因此不持有长期的 Reader。
//! 批量查询时整批地址共用一次打开。

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::trace;

use super::provider::{AsnInfo, CityInfo, GeoIpLookup};
use crate::config::GeoIpConfig;
use crate::errors::{IpInfoError, Result};

type Decode<T> = fn(&Reader<Vec<u8>>, IpAddr) -> Result<Option<T>>;

/// MaxMind GeoIP Provider
#[derive(Debug, Clone)]
pub struct MaxMindProvider {
    city_path: PathBuf,
    asn_path: PathBuf,
}

impl MaxMindProvider {
    pub fn new(city_path: impl Into<PathBuf>, asn_path: impl Into<PathBuf>) -> Self {
        Self {
            city_path: city_path.into(),
            asn_path: asn_path.into(),
        }
    }

    pub fn from_config(config: &GeoIpConfig) -> Self {
        Self::new(config.city_db_path(), config.asn_db_path())
    }

    /// 打开数据库文件，文件不存在时返回 None
    fn open(path: &Path) -> Result<Option<Reader<Vec<u8>>>> {
        if !path.exists() {
            trace!("MaxMind database {} is not present", path.display());
            return Ok(None);
        }

        Reader::open_readfile(path).map(Some).map_err(|e| {
            IpInfoError::database_unavailable(format!(
                "failed to open {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn read_one<T>(path: &Path, ip: IpAddr, decode: Decode<T>) -> Result<Option<T>> {
        match Self::open(path)? {
            Some(reader) => decode(&reader, ip),
            None => Ok(None),
        }
    }

    fn read_batch<T>(path: &Path, ips: &[IpAddr], decode: Decode<T>) -> Vec<Result<Option<T>>> {
        match Self::open(path) {
            Ok(Some(reader)) => ips.iter().map(|ip| decode(&reader, *ip)).collect(),
            Ok(None) => ips.iter().map(|_| Ok(None)).collect(),
            Err(e) => fail_all(ips.len(), &e),
        }
    }

    async fn spawn_batch<T: Send + 'static>(
        path: &Path,
        ips: &[IpAddr],
        decode: Decode<T>,
    ) -> Vec<Result<Option<T>>> {
        if ips.is_empty() {
            return Vec::new();
        }

        let path = path.to_path_buf();
        let owned = ips.to_vec();
        match tokio::task::spawn_blocking(move || Self::read_batch(&path, &owned, decode)).await {
            Ok(results) => results,
            Err(e) => fail_all(ips.len(), &IpInfoError::from(e)),
        }
    }

    fn city_record(reader: &Reader<Vec<u8>>, ip: IpAddr) -> Result<Option<CityInfo>> {
        let result = reader.lookup(ip)?;
        let Some(city) = result.decode::<maxminddb::geoip2::City>()? else {
            return Ok(None);
        };

        let info = CityInfo {
            city: city.city.names.english.map(String::from),
            region: city
                .subdivisions
                .last()
                .and_then(|s| s.names.english)
                .map(String::from),
            country: city.country.iso_code.map(String::from),
            latitude: city.location.latitude,
            longitude: city.location.longitude,
            postal: city.postal.code.map(String::from),
            timezone: city.location.time_zone.map(String::from),
        };

        trace!(
            "MaxMind city lookup for {}: country={:?}, city={:?}",
            ip, info.country, info.city
        );

        Ok(Some(info))
    }

    fn asn_record(reader: &Reader<Vec<u8>>, ip: IpAddr) -> Result<Option<AsnInfo>> {
        let result = reader.lookup(ip)?;
        let Some(asn) = result.decode::<maxminddb::geoip2::Asn>()? else {
            return Ok(None);
        };

        let info = AsnInfo {
            number: asn.autonomous_system_number,
            organization: asn.autonomous_system_organization.map(String::from),
        };

        trace!(
            "MaxMind ASN lookup for {}: asn={:?}, org={:?}",
            ip, info.number, info.organization
        );

        Ok(Some(info))
    }
}

/// 打开失败时整批地址得到同一个错误
fn fail_all<T>(count: usize, err: &IpInfoError) -> Vec<Result<Option<T>>> {
    (0..count)
        .map(|_| Err(IpInfoError::database_unavailable(err.message())))
        .collect()
}

#[async_trait]
impl GeoIpLookup for MaxMindProvider {
    async fn lookup_city(&self, ip: IpAddr) -> Result<Option<CityInfo>> {
        let path = self.city_path.clone();
        tokio::task::spawn_blocking(move || Self::read_one(&path, ip, Self::city_record)).await?
    }

    async fn lookup_asn(&self, ip: IpAddr) -> Result<Option<AsnInfo>> {
        let path = self.asn_path.clone();
        tokio::task::spawn_blocking(move || Self::read_one(&path, ip, Self::asn_record)).await?
    }

    async fn lookup_city_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<CityInfo>>> {
        Self::spawn_batch(&self.city_path, ips, Self::city_record).await
    }

    async fn lookup_asn_batch(&self, ips: &[IpAddr]) -> Vec<Result<Option<AsnInfo>>> {
        Self::spawn_batch(&self.asn_path, ips, Self::asn_record).await
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
