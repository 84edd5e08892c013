//! 逐帧记录引擎的判定结果，用于结束时的汇总和可选的 JSON 导出。

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::clock::Timestamp;
use crate::debounce::{AlertKind, AlertLevel};
use crate::signal::FrameSignal;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub frame: u64,
    pub at_ms: u64,
    pub signal: FrameSignal,
    pub alert: AlertKind,
    /// 该帧所在闭眼段的时长（仅闭眼时有值）。
    pub closed_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub frames: u64,
    pub alarm_frames: u64,
    pub alarm_episodes: u64,
    pub no_face_frames: u64,
    pub longest_closure_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryExport<'a> {
    generated_at: DateTime<Utc>,
    summary: HistorySummary,
    /// 超出缓冲容量的旧记录不包含在内。
    entries: &'a VecDeque<HistoryEntry>,
}

/// 有界的帧历史。汇总覆盖所有记录过的帧，包括已被挤出缓冲区的帧。
#[derive(Debug, Clone)]
pub struct StateHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
    summary: HistorySummary,
    last_alert: Option<AlertKind>,
}

impl StateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            summary: HistorySummary::default(),
            last_alert: None,
        }
    }

    pub fn record(&mut self, at: Timestamp, signal: FrameSignal, level: AlertLevel) {
        let closed = match level {
            AlertLevel::Warning(d) => Some(d),
            AlertLevel::Alarm | AlertLevel::Normal => None,
        };
        let alert = level.kind();
        let entry = HistoryEntry {
            frame: self.summary.frames,
            at_ms: millis(at.offset()),
            signal,
            alert,
            closed_ms: closed.map(millis),
        };

        self.summary.frames += 1;
        match alert {
            AlertKind::Alarm => {
                self.summary.alarm_frames += 1;
                if self.last_alert != Some(AlertKind::Alarm) {
                    self.summary.alarm_episodes += 1;
                }
            }
            AlertKind::Warning | AlertKind::Normal => {}
        }
        if signal == FrameSignal::NoFaceDetected {
            self.summary.no_face_frames += 1;
        }
        if let Some(ms) = entry.closed_ms {
            self.summary.longest_closure_ms = self.summary.longest_closure_ms.max(ms);
        }
        self.last_alert = Some(alert);

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// 报警帧本身不带闭眼时长，由知道闭眼段长度的调用方在这里补上。
    pub fn note_closure(&mut self, closed_for: Duration) {
        self.summary.longest_closure_ms = self.summary.longest_closure_ms.max(millis(closed_for));
        if let Some(last) = self.entries.back_mut() {
            if last.signal.is_closed() {
                last.closed_ms = Some(millis(closed_for));
            }
        }
    }

    pub fn summary(&self) -> HistorySummary {
        self.summary
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn export_json(&self, path: &Path) -> Result<(), HistoryError> {
        let export = HistoryExport {
            generated_at: Utc::now(),
            summary: self.summary,
            entries: &self.entries,
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.flush()?;
        Ok(())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
