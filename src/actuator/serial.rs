use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::{ActuatorError, ActuatorLink, Endpoint, LinkOpener};

/// 打开真实串口，每次写入都受 `write_timeout` 限制。
#[derive(Debug, Clone)]
pub struct SerialOpener {
    write_timeout: Duration,
}

impl SerialOpener {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }
}

impl LinkOpener for SerialOpener {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn ActuatorLink>, ActuatorError> {
        let port = serialport::new(endpoint.port.as_str(), endpoint.baud_rate)
            .timeout(self.write_timeout)
            .open()
            .map_err(|e| ActuatorError::ConnectionFailure {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SerialLink { port }))
    }
}

pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl ActuatorLink for SerialLink {
    fn write_command(&mut self, byte: u8) -> io::Result<()> {
        // 超时由串口本身的 timeout 限定，返回 TimedOut
        self.port.write_all(&[byte])?;
        self.port.flush()
    }
}
