//! 数据库压缩包下载

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use ureq::Agent;

use crate::errors::{IpInfoError, Result};

/// 下载某个 edition 的压缩包到 `dest`
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, edition: &str, dest: &Path) -> Result<()>;
}

/// MaxMind 官方下载接口
pub struct MaxMindDownloader {
    agent: Agent,
    url_template: String,
    license_key: String,
}

impl MaxMindDownloader {
    /// `url_template` 支持 `{edition}` 与 `{license_key}` 占位符
    pub fn new(url_template: &str, license_key: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            url_template: url_template.to_string(),
            license_key: license_key.to_string(),
        }
    }

    fn download_sync(agent: &Agent, url: &str, edition: &str, dest: &Path) -> Result<()> {
        let resp = agent.get(url).call().map_err(|e| {
            IpInfoError::download_failed(format!("request for {} failed: {}", edition, e))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.into_body().read_to_string().unwrap_or_default();
            warn!(
                "Download of {} returned HTTP {}: {}",
                edition,
                status.as_u16(),
                body.trim()
            );
            return Err(IpInfoError::download_failed(format!(
                "{} returned HTTP {}",
                edition,
                status.as_u16()
            )));
        }

        let mut reader = resp.into_body().into_reader();
        let mut file = File::create(dest)?;
        let bytes = io::copy(&mut reader, &mut file).map_err(|e| {
            IpInfoError::download_failed(format!("failed to read {} body: {}", edition, e))
        })?;

        debug!("Downloaded {} ({} bytes)", edition, bytes);
        Ok(())
    }
}

#[async_trait]
impl ArchiveFetcher for MaxMindDownloader {
    async fn fetch(&self, edition: &str, dest: &Path) -> Result<()> {
        let url = expand_download_url(&self.url_template, edition, &self.license_key);
        let agent = self.agent.clone();
        let edition = edition.to_string();
        let dest: PathBuf = dest.to_path_buf();

        debug!("Downloading {} to {}", edition, dest.display());
        tokio::task::spawn_blocking(move || Self::download_sync(&agent, &url, &edition, &dest))
            .await?
    }
}

/// 展开下载地址模板
pub fn expand_download_url(template: &str, edition: &str, license_key: &str) -> String {
    template
        .replace("{edition}", edition)
        .replace("{license_key}", license_key)
}
