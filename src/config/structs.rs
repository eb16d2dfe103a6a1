use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、CPU 数量、可信代理
/// - cors: 跨域配置
/// - geoip: GeoLite2 数据库文件位置
/// - refresh: 数据库刷新任务配置
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：兼容环境变量 > IPINFO__ 环境变量 > TOML 文件 > 默认值
    /// ENV 前缀：IPINFO，分隔符：__
    /// 示例：IPINFO__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 IPINFO，分隔符 __
            .add_source(
                Environment::with_prefix("IPINFO")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        };

        // 3. 兼容旧部署使用的环境变量名
        for warning in config.apply_env_overrides(|key| std::env::var(key).ok()) {
            eprintln!("[WARN] {}", warning);
        }

        config
    }

    /// 使用兼容环境变量覆盖配置
    ///
    /// `lookup` 按变量名返回值，便于测试注入。返回无法解析的变量的警告信息。
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(key) = lookup("MAXMIND_LICENSE_KEY") {
            self.refresh.license_key = Some(key);
        }
        if let Some(interval) = lookup("UPDATE_INTERVAL") {
            match interval.trim().parse::<u64>() {
                Ok(secs) => self.refresh.interval_secs = secs,
                Err(_) => warnings.push(format!("Invalid UPDATE_INTERVAL: {}", interval)),
            }
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warnings.push(format!("Invalid SERVER_PORT: {}", port)),
            }
        }
        if let Some(dir) = lookup("GEOIP_DATA_DIR") {
            self.geoip.data_dir = dir;
        }

        warnings
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 可信反向代理（单 IP 或 CIDR），仅来自这些地址的 X-Forwarded-For 会被采用
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cors_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

/// GeoLite2 数据库文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_city_file")]
    pub city_file: String,
    #[serde(default = "default_asn_file")]
    pub asn_file: String,
    /// 下载过程中使用的临时目录（位于 data_dir 下）
    #[serde(default = "default_scratch_dir_name")]
    pub scratch_dir_name: String,
}

impl GeoIpConfig {
    pub fn city_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.city_file)
    }

    pub fn asn_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.asn_file)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.scratch_dir_name)
    }
}

/// 数据库刷新任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// MaxMind license key，未配置时只写入占位文件
    #[serde(default)]
    pub license_key: Option<String>,
    /// 正常刷新间隔（秒）
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
    /// 整轮刷新失败后的重试间隔（秒）
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
    /// 下载地址模板，`{edition}` 与 `{license_key}` 为占位符
    #[serde(default = "default_download_url")]
    pub download_url: String,
    /// 归档中需要提取的文件后缀
    #[serde(default = "default_member_suffix")]
    pub member_suffix: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl RefreshConfig {
    /// 去除空白后的 license key，空字符串视为未配置
    pub fn license_key(&self) -> Option<&str> {
        self.license_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_city_file() -> String {
    "GeoLite2-City.mmdb".to_string()
}

fn default_asn_file() -> String {
    "GeoLite2-ASN.mmdb".to_string()
}

fn default_scratch_dir_name() -> String {
    "temp".to_string()
}

fn default_refresh_interval() -> u64 {
    86400
}

fn default_retry_interval() -> u64 {
    3600
}

fn default_download_url() -> String {
    "https://download.maxmind.com/app/geoip_download?edition_id={edition}&license_key={license_key}&suffix=tar.gz".to_string()
}

fn default_member_suffix() -> String {
    ".mmdb".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_cors_allowed_origins(),
            allow_credentials: false,
            max_age: default_cors_max_age(),
        }
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            city_file: default_city_file(),
            asn_file: default_asn_file(),
            scratch_dir_name: default_scratch_dir_name(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            license_key: None,
            interval_secs: default_refresh_interval(),
            retry_interval_secs: default_retry_interval(),
            download_url: default_download_url(),
            member_suffix: default_member_suffix(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.refresh.interval_secs, 86400);
        assert_eq!(config.refresh.retry_interval_secs, 3600);
        assert!(config.refresh.license_key().is_none());
        assert_eq!(
            config.geoip.city_db_path(),
            PathBuf::from("data").join("GeoLite2-City.mmdb")
        );
        assert_eq!(
            config.geoip.scratch_dir(),
            PathBuf::from("data").join("temp")
        );
    }

    #[test]
    fn test_env_overrides_applied() {
        let mut config = StaticConfig::default();
        let warnings = config.apply_env_overrides(lookup_from(&[
            ("MAXMIND_LICENSE_KEY", "abc123"),
            ("UPDATE_INTERVAL", "600"),
            ("SERVER_PORT", "9000"),
            ("GEOIP_DATA_DIR", "/app/data"),
        ]));

        assert!(warnings.is_empty());
        assert_eq!(config.refresh.license_key(), Some("abc123"));
        assert_eq!(config.refresh.interval_secs, 600);
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.geoip.asn_db_path(),
            PathBuf::from("/app/data").join("GeoLite2-ASN.mmdb")
        );
    }

    #[test]
    fn test_env_overrides_invalid_values_keep_defaults() {
        let mut config = StaticConfig::default();
        let warnings = config.apply_env_overrides(lookup_from(&[
            ("UPDATE_INTERVAL", "daily"),
            ("SERVER_PORT", "99999"),
        ]));

        assert_eq!(warnings.len(), 2);
        assert_eq!(config.refresh.interval_secs, 86400);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_blank_license_key_is_unset() {
        let mut config = StaticConfig::default();
        config.apply_env_overrides(lookup_from(&[("MAXMIND_LICENSE_KEY", "   ")]));
        assert!(config.refresh.license_key().is_none());
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[refresh]"));
        let parsed: StaticConfig = toml::from_str(&sample).expect("sample should parse");
        assert_eq!(parsed.refresh.download_url, default_download_url());
    }
}
