//! GeoIP 服务模块
//!
//! 提供 IP 地址地理位置与自治系统查询功能，数据来源为
//! MaxMind GeoLite2 City / ASN 本地数据库。

mod maxmind;
mod provider;

pub use maxmind::MaxMindProvider;
pub use provider::{AsnInfo, CityInfo, GeoIpLookup};
