use crate::debounce::AlertLevel;

/// 执行器固件识别的单字节命令。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Activate,
    Clear,
}

impl Command {
    pub const ACTIVATE_BYTE: u8 = b'1';
    pub const CLEAR_BYTE: u8 = b'0';

    /// 只有 `Alarm` 拉高执行器；预警仍发送清零字节。
    pub fn for_level(level: AlertLevel) -> Self {
        if level.is_alarm() {
            Command::Activate
        } else {
            Command::Clear
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Command::Activate => Self::ACTIVATE_BYTE,
            Command::Clear => Self::CLEAR_BYTE,
        }
    }
}
