//! 压缩包解压与发布
//!
//! MaxMind 的下载包是 `.tar.gz`，里面有一个带日期的目录，
//! 数据库文件位于其中。只按文件名匹配，忽略目录部分。

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, trace};

use crate::errors::{IpInfoError, Result};

/// 从 `archive` 中取出第一个文件名以 `suffix` 结尾的普通文件，写入 `scratch_dir`
///
/// 返回解压后的文件路径。
pub fn extract_member(archive: &Path, suffix: &str, scratch_dir: &Path) -> Result<PathBuf> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));

    let entries = tar.entries().map_err(|e| {
        IpInfoError::extraction_failed(format!(
            "failed to read {}: {}",
            archive.display(),
            e
        ))
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| {
            IpInfoError::extraction_failed(format!("corrupt entry in {}: {}", archive.display(), e))
        })?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| IpInfoError::extraction_failed(format!("invalid entry path: {}", e)))?
            .into_owned();

        // 只取最后一段文件名，防止 `../` 之类的路径逃出临时目录
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(suffix) {
            trace!("Skipping archive member {}", path.display());
            continue;
        }

        let target = scratch_dir.join(file_name);
        let mut out = File::create(&target)?;
        let bytes = io::copy(&mut entry, &mut out).map_err(|e| {
            IpInfoError::extraction_failed(format!("failed to extract {}: {}", path.display(), e))
        })?;

        debug!(
            "Extracted {} from {} ({} bytes)",
            file_name,
            archive.display(),
            bytes
        );
        return Ok(target);
    }

    Err(IpInfoError::extraction_failed(format!(
        "no member ending with {} in {}",
        suffix,
        archive.display()
    )))
}

/// 把解压出的文件移动到发布路径
///
/// 先尝试 rename，跨文件系统失败时改为复制后删除源文件。
pub fn publish(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    if let Err(e) = fs::rename(src, dest) {
        debug!(
            "rename {} -> {} failed ({}), falling back to copy",
            src.display(),
            dest.display(),
            e
        );
        fs::copy(src, dest)?;
        fs::remove_file(src)?;
    }

    Ok(())
}
