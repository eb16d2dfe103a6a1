//! Service layer
//!
//! Lookup logic shared by the HTTP handlers, plus the background
//! database refresher.

pub mod dns;
pub mod geoip;
pub mod lookup;
pub mod refresher;

pub use dns::{DnsResolver, HostResolver};
pub use geoip::{AsnInfo, CityInfo, GeoIpLookup, MaxMindProvider};
pub use lookup::{BulkEntry, LookupResult, LookupService};
pub use refresher::{CycleReport, DatabaseRefresher, RefreshState};
