//! 配置值验证模块
//!
//! 启动时检查静态配置，返回所有发现的问题。

use super::StaticConfig;

/// 验证静态配置
///
/// - 刷新间隔不能为 0
/// - 下载地址模板必须包含 `{edition}` 占位符
/// - 日志格式只能是 text 或 json
/// - 数据库文件名不能为空
/// - 临时目录必须是 data_dir 下的单层子目录
/// - 归档成员后缀不能为空
pub fn validate_static_config(config: &StaticConfig) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if config.refresh.interval_secs == 0 {
        problems.push("refresh.interval_secs must be greater than 0".to_string());
    }
    if config.refresh.retry_interval_secs == 0 {
        problems.push("refresh.retry_interval_secs must be greater than 0".to_string());
    }
    if !config.refresh.download_url.contains("{edition}") {
        problems.push(format!(
            "refresh.download_url must contain the {{edition}} placeholder: {}",
            config.refresh.download_url
        ));
    }
    if !matches!(config.logging.format.as_str(), "text" | "json") {
        problems.push(format!(
            "Invalid logging.format: '{}'. Valid: text, json",
            config.logging.format
        ));
    }
    if config.geoip.city_file.trim().is_empty() || config.geoip.asn_file.trim().is_empty() {
        problems.push("geoip.city_file and geoip.asn_file must not be empty".to_string());
    }
    if !is_plain_dir_name(&config.geoip.scratch_dir_name) {
        problems.push(format!(
            "geoip.scratch_dir_name must be a single directory name inside data_dir: '{}'",
            config.geoip.scratch_dir_name
        ));
    }
    if config.refresh.member_suffix.trim().is_empty() {
        problems.push("refresh.member_suffix must not be empty".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

/// 清理临时目录会删除其中所有文件，所以它不能是 data_dir 本身或其上级
fn is_plain_dir_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
