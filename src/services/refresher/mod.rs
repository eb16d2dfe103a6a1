//! GeoLite2 数据库刷新任务
//!
//! 两个状态：Idle（睡眠）与 Refreshing。每个周期依次下载各个数据集，
//! 解压出 `.mmdb` 文件并替换发布路径下的旧文件。单个数据集失败
//! 只记录日志，不影响其他数据集；整个周期失败时缩短下次等待时间。

mod extract;
mod fetcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::StaticConfig;
use crate::errors::{IpInfoError, Result};

pub use extract::{extract_member, publish};
pub use fetcher::{ArchiveFetcher, MaxMindDownloader, expand_download_url};

pub const CITY_EDITION: &str = "GeoLite2-City";
pub const ASN_EDITION: &str = "GeoLite2-ASN";

/// 远程数据集描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub edition: String,
    /// 发布路径
    pub path: PathBuf,
    /// 未配置 license key 时写入的占位内容
    pub placeholder: &'static [u8],
}

impl Dataset {
    pub fn new(edition: &str, path: impl Into<PathBuf>, placeholder: &'static [u8]) -> Self {
        Self {
            edition: edition.to_string(),
            path: path.into(),
            placeholder,
        }
    }
}

/// 一次刷新周期的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub refreshed: Vec<String>,
    /// (edition, reason)
    pub failed: Vec<(String, String)>,
    pub placeholders: Vec<String>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

pub struct DatabaseRefresher {
    datasets: Vec<Dataset>,
    data_dir: PathBuf,
    scratch_dir: PathBuf,
    member_suffix: String,
    interval: Duration,
    retry_interval: Duration,
    fetcher: Option<Arc<dyn ArchiveFetcher>>,
    refreshing: AtomicBool,
}

impl DatabaseRefresher {
    pub fn from_config(config: &StaticConfig) -> Self {
        let geoip = &config.geoip;
        let refresh = &config.refresh;

        let fetcher = refresh.license_key().map(|key| {
            Arc::new(MaxMindDownloader::new(
                &refresh.download_url,
                key,
                Duration::from_secs(refresh.request_timeout_secs),
            )) as Arc<dyn ArchiveFetcher>
        });

        Self {
            datasets: vec![
                Dataset::new(CITY_EDITION, geoip.city_db_path(), b"dummy city database"),
                Dataset::new(ASN_EDITION, geoip.asn_db_path(), b"dummy asn database"),
            ],
            data_dir: PathBuf::from(&geoip.data_dir),
            scratch_dir: geoip.scratch_dir(),
            member_suffix: refresh.member_suffix.clone(),
            interval: Duration::from_secs(refresh.interval_secs),
            retry_interval: Duration::from_secs(refresh.retry_interval_secs),
            fetcher,
            refreshing: AtomicBool::new(false),
        }
    }

    /// 替换下载实现；`None` 表示占位模式
    pub fn with_fetcher(mut self, fetcher: Option<Arc<dyn ArchiveFetcher>>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn state(&self) -> RefreshState {
        if self.refreshing.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// 执行一次刷新周期
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.refreshing.store(true, Ordering::Release);
        let outcome = self.cycle().await;
        self.refreshing.store(false, Ordering::Release);
        outcome
    }

    /// 下一次刷新前的等待时间
    pub fn next_delay(&self, outcome: &Result<CycleReport>) -> Duration {
        match outcome {
            Ok(_) => self.interval,
            Err(_) => self.retry_interval,
        }
    }

    /// 永久循环：刷新、睡眠、再刷新
    pub async fn run_forever(&self) {
        loop {
            let outcome = self.run_cycle().await;
            match &outcome {
                Ok(report) => info!(
                    refreshed = report.refreshed.len(),
                    failed = report.failed.len(),
                    placeholders = report.placeholders.len(),
                    "Database refresh cycle finished"
                ),
                Err(e) => error!("Database refresh cycle failed: {}", e),
            }

            let delay = self.next_delay(&outcome);
            info!("Next database refresh in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }

    async fn cycle(&self) -> Result<CycleReport> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| {
                IpInfoError::refresh_cycle(format!(
                    "cannot create data directory {}: {}",
                    self.data_dir.display(),
                    e
                ))
            })?;

        let Some(fetcher) = &self.fetcher else {
            return self.write_placeholders().await;
        };

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| {
                IpInfoError::refresh_cycle(format!(
                    "cannot create scratch directory {}: {}",
                    self.scratch_dir.display(),
                    e
                ))
            })?;

        if !scratch_is_isolated(&self.data_dir, &self.scratch_dir).await {
            return Err(IpInfoError::refresh_cycle(format!(
                "scratch directory {} must be a subdirectory of {}",
                self.scratch_dir.display(),
                self.data_dir.display()
            )));
        }

        let mut report = CycleReport::default();
        for dataset in &self.datasets {
            info!("Refreshing {}", dataset.edition);
            let outcome = self.refresh_dataset(fetcher.as_ref(), dataset).await;
            self.clean_scratch().await;

            match outcome {
                Ok(()) => {
                    info!(
                        "{} updated at {}",
                        dataset.edition,
                        dataset.path.display()
                    );
                    report.refreshed.push(dataset.edition.clone());
                }
                Err(e) => {
                    error!("Failed to refresh {}: {}", dataset.edition, e);
                    report.failed.push((dataset.edition.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn refresh_dataset(&self, fetcher: &dyn ArchiveFetcher, dataset: &Dataset) -> Result<()> {
        let archive = self.scratch_dir.join(format!("{}.tar.gz", dataset.edition));
        fetcher.fetch(&dataset.edition, &archive).await?;

        let scratch = self.scratch_dir.clone();
        let suffix = self.member_suffix.clone();
        let dest = dataset.path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let member = extract_member(&archive, &suffix, &scratch)?;
            publish(&member, &dest)?;
            std::fs::remove_file(&archive)?;
            Ok(())
        })
        .await?
    }

    /// 删除临时目录下的所有残留
    async fn clean_scratch(&self) {
        if !scratch_is_isolated(&self.data_dir, &self.scratch_dir).await {
            warn!(
                "Refusing to clean {}: it is not a subdirectory of {}",
                self.scratch_dir.display(),
                self.data_dir.display()
            );
            return;
        }

        let mut entries = match tokio::fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    "Scratch directory {} not readable: {}",
                    self.scratch_dir.display(),
                    e
                );
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let removed = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            if let Err(e) = removed {
                warn!("Failed to remove scratch file {}: {}", path.display(), e);
            }
        }
    }

    async fn write_placeholders(&self) -> Result<CycleReport> {
        info!("No MaxMind license key configured, skipping download");

        let mut report = CycleReport::default();
        for dataset in &self.datasets {
            match write_new_file(&dataset.path, dataset.placeholder).await {
                Ok(true) => {
                    warn!(
                        "Wrote placeholder {} database to {}",
                        dataset.edition,
                        dataset.path.display()
                    );
                    report.placeholders.push(dataset.edition.clone());
                }
                Ok(false) => {
                    debug!("{} already present, leaving it alone", dataset.path.display());
                }
                Err(e) => {
                    error!(
                        "Failed to write placeholder {}: {}",
                        dataset.path.display(),
                        e
                    );
                    report.failed.push((dataset.edition.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }
}

/// 临时目录必须严格位于 data_dir 之下
async fn scratch_is_isolated(data_dir: &Path, scratch_dir: &Path) -> bool {
    let (Ok(data), Ok(scratch)) = (
        tokio::fs::canonicalize(data_dir).await,
        tokio::fs::canonicalize(scratch_dir).await,
    ) else {
        return false;
    };
    scratch != data && scratch.starts_with(&data)
}

/// 只在文件不存在时创建并写入，返回是否写入
async fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<bool> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    file.write_all(content).await?;
    file.flush().await?;
    Ok(true)
}
