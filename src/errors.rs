use std::fmt;

#[derive(Debug, Clone)]
pub enum IpInfoError {
    InvalidAddress(String),
    FieldNotFound(String),
    BulkLimitExceeded(String),
    DatabaseUnavailable(String),
    DownloadFailed(String),
    ExtractionFailed(String),
    RefreshCycle(String),
    FileOperation(String),
    Serialization(String),
    Configuration(String),
    Internal(String),
}

impl IpInfoError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            IpInfoError::InvalidAddress(_) => "E001",
            IpInfoError::FieldNotFound(_) => "E002",
            IpInfoError::BulkLimitExceeded(_) => "E003",
            IpInfoError::DatabaseUnavailable(_) => "E004",
            IpInfoError::DownloadFailed(_) => "E005",
            IpInfoError::ExtractionFailed(_) => "E006",
            IpInfoError::RefreshCycle(_) => "E007",
            IpInfoError::FileOperation(_) => "E008",
            IpInfoError::Serialization(_) => "E009",
            IpInfoError::Configuration(_) => "E010",
            IpInfoError::Internal(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            IpInfoError::InvalidAddress(_) => "Invalid Address",
            IpInfoError::FieldNotFound(_) => "Field Not Found",
            IpInfoError::BulkLimitExceeded(_) => "Bulk Limit Exceeded",
            IpInfoError::DatabaseUnavailable(_) => "Database Unavailable",
            IpInfoError::DownloadFailed(_) => "Download Failed",
            IpInfoError::ExtractionFailed(_) => "Extraction Failed",
            IpInfoError::RefreshCycle(_) => "Refresh Cycle Error",
            IpInfoError::FileOperation(_) => "File Operation Error",
            IpInfoError::Serialization(_) => "Serialization Error",
            IpInfoError::Configuration(_) => "Configuration Error",
            IpInfoError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            IpInfoError::InvalidAddress(msg) => msg,
            IpInfoError::FieldNotFound(msg) => msg,
            IpInfoError::BulkLimitExceeded(msg) => msg,
            IpInfoError::DatabaseUnavailable(msg) => msg,
            IpInfoError::DownloadFailed(msg) => msg,
            IpInfoError::ExtractionFailed(msg) => msg,
            IpInfoError::RefreshCycle(msg) => msg,
            IpInfoError::FileOperation(msg) => msg,
            IpInfoError::Serialization(msg) => msg,
            IpInfoError::Configuration(msg) => msg,
            IpInfoError::Internal(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for IpInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for IpInfoError {}

// 便捷的构造函数
impl IpInfoError {
    pub fn invalid_address<T: Into<String>>(msg: T) -> Self {
        IpInfoError::InvalidAddress(msg.into())
    }

    pub fn field_not_found<T: Into<String>>(msg: T) -> Self {
        IpInfoError::FieldNotFound(msg.into())
    }

    pub fn bulk_limit_exceeded<T: Into<String>>(msg: T) -> Self {
        IpInfoError::BulkLimitExceeded(msg.into())
    }

    pub fn database_unavailable<T: Into<String>>(msg: T) -> Self {
        IpInfoError::DatabaseUnavailable(msg.into())
    }

    pub fn download_failed<T: Into<String>>(msg: T) -> Self {
        IpInfoError::DownloadFailed(msg.into())
    }

    pub fn extraction_failed<T: Into<String>>(msg: T) -> Self {
        IpInfoError::ExtractionFailed(msg.into())
    }

    pub fn refresh_cycle<T: Into<String>>(msg: T) -> Self {
        IpInfoError::RefreshCycle(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        IpInfoError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        IpInfoError::Serialization(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        IpInfoError::Configuration(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        IpInfoError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for IpInfoError {
    fn from(err: std::io::Error) -> Self {
        IpInfoError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for IpInfoError {
    fn from(err: serde_json::Error) -> Self {
        IpInfoError::Serialization(err.to_string())
    }
}

impl From<maxminddb::MaxMindDbError> for IpInfoError {
    fn from(err: maxminddb::MaxMindDbError) -> Self {
        IpInfoError::DatabaseUnavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IpInfoError {
    fn from(err: tokio::task::JoinError) -> Self {
        IpInfoError::Internal(format!("blocking task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, IpInfoError>;
