/// 执行器串口默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 打开串口后等待微控制器复位的时长（毫秒）
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// 单次写入的上限（毫秒），超时视为链路故障
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

/// 连续闭眼多少秒后触发报警
pub const DEFAULT_CLOSURE_THRESHOLD_SECS: f64 = 1.0;

/// 回放脚本的默认帧率
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// 状态历史最多保留的帧数（30fps 下约两小时）
pub const HISTORY_CAPACITY: usize = 216_000;

#[cfg(windows)]
pub const DEFAULT_ACTUATOR_PORT: &str = "COM7";
#[cfg(not(windows))]
pub const DEFAULT_ACTUATOR_PORT: &str = "/dev/ttyACM0";

/// 脚本路径为该值时从 stdin 读取
pub const STDIN_SCRIPT: &str = "-";

/// 后台读取线程等待下一帧时，检查停止信号的间隔（毫秒）
pub const SHUTDOWN_POLL_MS: u64 = 50;
