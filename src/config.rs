use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::actuator::Endpoint;
use crate::constants::{
    DEFAULT_ACTUATOR_PORT, DEFAULT_BAUD_RATE, DEFAULT_CLOSURE_THRESHOLD_SECS, DEFAULT_FRAME_RATE,
    DEFAULT_SETTLE_MS, DEFAULT_WRITE_TIMEOUT_MS, STDIN_SCRIPT,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub actuator: ActuatorConfig,
    pub detection: DetectionConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone)]
pub struct ActuatorConfig {
    pub enabled: bool,
    /// 用内存链路代替串口。
    pub mock: bool,
    pub port: String,
    pub baud_rate: u32,
    pub settle_ms: u64,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub closure_threshold_secs: f64,
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub script: String,
    pub frame_rate: u32,
    pub history_export_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            actuator: ActuatorConfig {
                enabled: env_or_bool("ACTUATOR_ENABLED", true),
                mock: env_or_bool("ACTUATOR_MOCK", false),
                port: env_or("ACTUATOR_PORT", DEFAULT_ACTUATOR_PORT),
                baud_rate: env_or_parse("ACTUATOR_BAUD_RATE", DEFAULT_BAUD_RATE),
                settle_ms: env_or_parse("ACTUATOR_SETTLE_MS", DEFAULT_SETTLE_MS),
                write_timeout_ms: env_or_positive_millis(
                    "ACTUATOR_WRITE_TIMEOUT_MS",
                    DEFAULT_WRITE_TIMEOUT_MS,
                ),
            },
            detection: DetectionConfig {
                closure_threshold_secs: env_or_positive_secs(
                    "DROWSINESS_THRESHOLD_SECS",
                    DEFAULT_CLOSURE_THRESHOLD_SECS,
                ),
            },
            replay: ReplayConfig {
                script: env_or("SIGNAL_SCRIPT", STDIN_SCRIPT),
                frame_rate: env_or_parse("FRAME_RATE", DEFAULT_FRAME_RATE),
                history_export_path: env::var("HISTORY_EXPORT_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty()),
            },
        }
    }
}

impl ActuatorConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.port.clone(), self.baud_rate)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl DetectionConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs_f64(self.closure_threshold_secs)
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// 必须是有限正数的秒数。
pub fn env_or_positive_secs(key: &str, default: f64) -> f64 {
    let secs = env_or_parse(key, default);
    if secs.is_finite() && secs > 0.0 && secs <= u32::MAX as f64 {
        secs
    } else {
        tracing::warn!(key, value = secs, "Out-of-range duration, using default");
        default
    }
}

/// 必须大于零的毫秒数；零超时会让串口写入立即失败。
pub fn env_or_positive_millis(key: &str, default: u64) -> u64 {
    match env_or_parse(key, default) {
        0 => {
            tracing::warn!(key, "Zero duration is not allowed, using default");
            default
        }
        ms => ms,
    }
}
