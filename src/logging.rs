use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            enable_file_logs: config.enable_file_logs,
            log_dir: config.log_dir.clone(),
        }
    }
}

/// 安装全局 subscriber：stdout 输出可读日志，启用时另写按天滚动的 JSON 文件。
/// 可重复调用。
pub fn init_tracing(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false));

    if !config.enable_file_logs {
        return tolerate_existing(registry.try_init());
    }

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("drowsiness-alert")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&config.log_dir);
    match appender {
        Ok(appender) => {
            let file_layer = fmt::layer().with_writer(appender).with_ansi(false).json();
            tolerate_existing(registry.with(file_layer).try_init());
        }
        Err(e) => {
            tolerate_existing(registry.try_init());
            tracing::error!(error = %e, log_dir = %config.log_dir, "file logging disabled");
        }
    }
}

fn tolerate_existing(result: Result<(), TryInitError>) {
    // 测试中重复初始化属于正常情况；首次启动失败则说明配置有误
    if let Err(e) = result {
        let msg = e.to_string();
        if !msg.contains("already been set") {
            panic!("Failed to initialize tracing: {e}");
        }
    }
}
