use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};

/// 等待 HTTP server 排空连接的最长时间（秒）
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub fn shutdown_timeout() -> Duration {
    Duration::from_secs(SHUTDOWN_TIMEOUT_SECS)
}

/// 等待 Ctrl+C
///
/// 无法注册信号监听时永远挂起，由进程的其他退出路径负责。
pub async fn wait_for_shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Graceful shutdown is unavailable.",
                e
            );
            std::future::pending::<()>().await;
        }
    }
}
