//! 帧信号来源
//!
//! 真正的眼部分类器不在本 crate 内；可执行程序改为回放一份分类脚本。
//! 会阻塞的来源（如 stdin）交给 `BackgroundSource` 在独立线程上读取，
//! 帧循环在等待期间仍能响应停止信号。

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::constants::STDIN_SCRIPT;
use crate::shutdown::shutdown_requested;
use crate::signal::{Classification, UnknownToken};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("frame source io error: {0}")]
    Io(#[from] io::Error),
    #[error("script line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: UnknownToken,
    },
    #[error("script line {line}: invalid repeat count {raw:?}")]
    Repeat { line: usize, raw: String },
    #[error("frame source interrupted by shutdown")]
    Interrupted,
}

pub trait SignalSource {
    /// `Ok(None)` 表示流结束；返回错误表示帧来源本身失效。
    fn next_frame(&mut self) -> Result<Option<Classification>, SourceError>;
}

impl<F> SignalSource for F
where
    F: FnMut() -> Result<Option<Classification>, SourceError>,
{
    fn next_frame(&mut self) -> Result<Option<Classification>, SourceError> {
        self()
    }
}

/// 逐行回放分类脚本：每行一个标记，可带 `*N` 重复次数，空行与 `#` 注释忽略。
///
/// ```text
/// # 30fps 下闭眼一秒半
/// open*10
/// closed*45
/// none
/// ```
pub struct ScriptedSource<R> {
    reader: R,
    line_no: usize,
    pending: Option<(Classification, u64)>,
    buf: String,
}

impl ScriptedSource<Box<dyn BufRead + Send>> {
    /// 路径为 `-` 时从 stdin 读取。
    pub fn open(path: &str) -> Result<Self, SourceError> {
        let reader: Box<dyn BufRead + Send> = if path == STDIN_SCRIPT {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(Path::new(path))?))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> ScriptedSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            pending: None,
            buf: String::new(),
        }
    }

    fn parse_line(&self, line: &str) -> Result<Option<(Classification, u64)>, SourceError> {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            return Ok(None);
        }

        let (token, count) = match content.split_once('*') {
            Some((token, raw)) => {
                let count = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| SourceError::Repeat {
                        line: self.line_no,
                        raw: raw.trim().to_string(),
                    })?;
                (token, count)
            }
            None => (content, 1),
        };

        let classification = token.parse::<Classification>().map_err(|source| {
            SourceError::Parse {
                line: self.line_no,
                source,
            }
        })?;
        Ok(Some((classification, count)))
    }
}

impl<R: BufRead> SignalSource for ScriptedSource<R> {
    fn next_frame(&mut self) -> Result<Option<Classification>, SourceError> {
        loop {
            if let Some((classification, left)) = self.pending.as_mut() {
                if *left > 0 {
                    *left -= 1;
                    return Ok(Some(*classification));
                }
                self.pending = None;
            }

            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            self.pending = self.parse_line(&self.buf)?;
        }
    }
}

type FrameResult = Result<Option<Classification>, SourceError>;

/// 后台读取来源
///
/// 内部来源在名为 `signal-reader` 的线程上运行，结果经容量为 1 的通道送回。
/// `next_frame` 每隔 `poll` 检查一次停止信号，收到后返回 `SourceError::Interrupted`。
pub struct BackgroundSource {
    frames: mpsc::Receiver<FrameResult>,
    shutdown: broadcast::Receiver<()>,
    poll: Duration,
    finished: bool,
}

impl BackgroundSource {
    pub fn spawn<S>(
        mut inner: S,
        shutdown: broadcast::Receiver<()>,
        poll: Duration,
    ) -> Result<Self, SourceError>
    where
        S: SignalSource + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<FrameResult>(1);
        thread::Builder::new()
            .name("signal-reader".to_string())
            .spawn(move || loop {
                let item = inner.next_frame();
                let last = !matches!(item, Ok(Some(_)));
                // 帧循环结束后接收端关闭，读取线程随之退出
                if tx.send(item).is_err() || last {
                    break;
                }
            })?;

        Ok(Self {
            frames: rx,
            shutdown,
            poll,
            finished: false,
        })
    }
}

impl SignalSource for BackgroundSource {
    fn next_frame(&mut self) -> FrameResult {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.frames.recv_timeout(self.poll) {
                Ok(item) => {
                    self.finished = !matches!(item, Ok(Some(_)));
                    return item;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if shutdown_requested(&mut self.shutdown) {
                        return Err(SourceError::Interrupted);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.finished = true;
                    return Err(SourceError::Io(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "signal reader thread exited unexpectedly",
                    )));
                }
            }
        }
    }
}
