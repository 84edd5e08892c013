//! 内存执行器链路，供 `ACTUATOR_MOCK` 和测试使用。

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ActuatorError, ActuatorLink, Endpoint, LinkOpener};

#[derive(Debug, Default)]
struct Wire {
    written: Vec<u8>,
    opens: usize,
    refuse_open: bool,
    /// 链路开始故障前还允许成功写入的次数。
    writes_before_fault: Option<usize>,
}

/// 打开的链路把每个字节追加到共享缓冲区，克隆之间看到同一条线路。
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    wire: Arc<Mutex<Wire>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后每次 `open` 都失败，相当于串口不存在。
    pub fn refuse_open(self) -> Self {
        self.lock().refuse_open = true;
        self
    }

    /// 再放行 `n` 次写入，之后每次写入都出错。
    pub fn fault_after_writes(&self, n: usize) {
        self.lock().writes_before_fault = Some(n);
    }

    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn last_byte(&self) -> Option<u8> {
        self.lock().written.last().copied()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    fn lock(&self) -> MutexGuard<'_, Wire> {
        // 测试线程 panic 后仍可读取已写入的数据
        self.wire.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LinkOpener for MemoryOpener {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn ActuatorLink>, ActuatorError> {
        let mut wire = self.lock();
        if wire.refuse_open {
            return Err(ActuatorError::ConnectionFailure {
                endpoint: endpoint.to_string(),
                reason: "port unavailable".to_string(),
            });
        }
        wire.opens += 1;
        Ok(Box::new(MemoryLink {
            opener: self.clone(),
        }))
    }
}

struct MemoryLink {
    opener: MemoryOpener,
}

impl ActuatorLink for MemoryLink {
    fn write_command(&mut self, byte: u8) -> io::Result<()> {
        let mut wire = self.opener.lock();
        match wire.writes_before_fault {
            Some(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "actuator stopped responding",
                ))
            }
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        wire.written.push(byte);
        tracing::trace!(byte = %char::from(byte), "memory link write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_bytes_until_fault() {
        let opener = MemoryOpener::new();
        let endpoint = Endpoint::new("mock", 9600);
        let mut link = opener.open(&endpoint).expect("open");

        link.write_command(b'1').expect("first write");
        opener.fault_after_writes(1);
        link.write_command(b'0').expect("second write");
        assert!(link.write_command(b'1').is_err());

        assert_eq!(opener.written(), b"10".to_vec());
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn refused_open_reports_endpoint() {
        let opener = MemoryOpener::new().refuse_open();
        let err = opener
            .open(&Endpoint::new("COM7", 9600))
            .err()
            .expect("open must fail");
        assert!(err.to_string().contains("COM7"));
    }
}
