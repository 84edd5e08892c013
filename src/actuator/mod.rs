//! 串口执行器通道
//!
//! 持有到微控制器的链路。链路缺失或中断时帧循环照常运行：失败以返回值报告，
//! 不会 panic；链路断开后保持断开，直到再次调用 `connect()`。

pub mod memory;
pub mod protocol;
pub mod serial;

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::debounce::AlertLevel;
use protocol::Command;

pub use memory::MemoryOpener;
pub use serial::SerialOpener;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to open actuator at {endpoint}: {reason}")]
    ConnectionFailure { endpoint: String, reason: String },
    #[error("actuator write failed: {0}")]
    WriteFailure(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub port: String,
    pub baud_rate: u32,
}

impl Endpoint {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.port, self.baud_rate)
    }
}

/// 已打开、可写入的执行器连接。
pub trait ActuatorLink: Send {
    fn write_command(&mut self, byte: u8) -> io::Result<()>;
}

pub trait LinkOpener: Send {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn ActuatorLink>, ActuatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connected,
    Faulted,
}

enum LinkState {
    Disconnected,
    Connected(Box<dyn ActuatorLink>),
    Faulted,
}

pub struct ActuatorChannel {
    opener: Box<dyn LinkOpener>,
    endpoint: Endpoint,
    settle: Duration,
    state: LinkState,
    last_level_sent: Option<AlertLevel>,
}

impl fmt::Debug for ActuatorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActuatorChannel")
            .field("endpoint", &self.endpoint)
            .field("settle", &self.settle)
            .field("status", &self.status())
            .field("last_level_sent", &self.last_level_sent)
            .finish()
    }
}

impl ActuatorChannel {
    pub fn new(opener: Box<dyn LinkOpener>, endpoint: Endpoint, settle: Duration) -> Self {
        Self {
            opener,
            endpoint,
            settle,
            state: LinkState::Disconnected,
            last_level_sent: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn status(&self) -> ChannelStatus {
        match self.state {
            LinkState::Disconnected => ChannelStatus::Disconnected,
            LinkState::Connected(_) => ChannelStatus::Connected,
            LinkState::Faulted => ChannelStatus::Faulted,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ChannelStatus::Connected
    }

    pub fn last_level_sent(&self) -> Option<AlertLevel> {
        self.last_level_sent
    }

    /// 打开端点，并阻塞等待微控制器复位。失败时状态保持不变。
    pub fn connect(&mut self) -> Result<(), ActuatorError> {
        if self.is_connected() {
            tracing::debug!(endpoint = %self.endpoint, "actuator already connected");
            return Ok(());
        }

        tracing::info!(endpoint = %self.endpoint, "connecting to actuator");
        let link = self.opener.open(&self.endpoint)?;
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        self.state = LinkState::Connected(link);
        self.last_level_sent = None;
        tracing::info!(endpoint = %self.endpoint, "actuator connected");
        Ok(())
    }

    /// 发送 `level` 对应的命令。未连接时什么也不做；命令字节与上次相同时跳过写入。
    pub fn send(&mut self, level: AlertLevel) -> Result<(), ActuatorError> {
        let command = Command::for_level(level);
        let unchanged = self
            .last_level_sent
            .is_some_and(|sent| Command::for_level(sent) == command);
        if unchanged {
            if self.is_connected() {
                self.last_level_sent = Some(level);
            }
            return Ok(());
        }
        self.write(level, command)
    }

    /// 清零执行器并释放链路，任何状态下都可以调用。
    pub fn disconnect(&mut self) -> Result<(), ActuatorError> {
        if !self.is_connected() {
            return Ok(());
        }

        // 无论之前状态如何，关闭前强制发送一次清除指令
        let fail_safe = self.write(AlertLevel::Normal, Command::Clear);
        if let Err(e) = &fail_safe {
            tracing::warn!(error = %e, "fail-safe clear before disconnect failed");
        }
        // 清除指令失败时链路已释放，关闭流程仍视为完成
        self.state = LinkState::Disconnected;
        tracing::info!(endpoint = %self.endpoint, "actuator disconnected");
        fail_safe
    }

    fn write(&mut self, level: AlertLevel, command: Command) -> Result<(), ActuatorError> {
        let LinkState::Connected(link) = &mut self.state else {
            return Ok(());
        };

        match link.write_command(command.byte()) {
            Ok(()) => {
                self.last_level_sent = Some(level);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.endpoint,
                    error = %e,
                    "actuator write failed, link released"
                );
                // drop 链路即关闭串口，之后不再自动重连
                self.state = LinkState::Faulted;
                Err(ActuatorError::WriteFailure(e))
            }
        }
    }
}
