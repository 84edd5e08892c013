//! 帧循环：分类结果 → 防抖引擎 → 执行器，每帧一次。
//!
//! 无论循环因何结束（流结束、帧来源失效、收到停止信号，或 panic 展开穿过会话），
//! 执行器都会被清零并断开，且只执行一次。

use tokio::sync::broadcast;

use crate::actuator::ActuatorChannel;
use crate::clock::Clock;
use crate::constants::HISTORY_CAPACITY;
use crate::debounce::{AlertKind, AlertLevel, DebounceEngine};
use crate::history::StateHistory;
use crate::pacing::FramePacer;
use crate::shutdown::shutdown_requested;
use crate::signal::{Classification, FrameSignal};
use crate::source::{SignalSource, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    ShutdownRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub reason: StopReason,
    pub frames: u64,
}

pub struct Session<C: Clock> {
    engine: DebounceEngine,
    channel: ActuatorChannel,
    clock: C,
    history: StateHistory,
    pacer: Option<FramePacer>,
    last_alert: AlertKind,
    torn_down: bool,
}

impl<C: Clock> Session<C> {
    pub fn new(engine: DebounceEngine, channel: ActuatorChannel, clock: C) -> Self {
        Self {
            engine,
            channel,
            clock,
            history: StateHistory::new(HISTORY_CAPACITY),
            pacer: None,
            last_alert: AlertKind::Normal,
            torn_down: false,
        }
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.pacer = FramePacer::new(fps);
        self
    }

    pub fn engine(&self) -> &DebounceEngine {
        &self.engine
    }

    pub fn channel(&self) -> &ActuatorChannel {
        &self.channel
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// 连接执行器。失败只记录一次日志，会话在没有硬件输出的情况下继续运行。
    pub fn start(&mut self) -> bool {
        match self.channel.connect() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "actuator unavailable, continuing without hardware alerts"
                );
                false
            }
        }
    }

    /// 处理一帧，返回转发给执行器的报警级别。
    pub fn step(&mut self, signal: FrameSignal) -> AlertLevel {
        let now = self.clock.now();
        let level = self.engine.evaluate(signal, now);

        self.history.record(now, signal, level);
        if level.is_alarm() {
            if let Some(start) = self.engine.closure_started_at() {
                self.history.note_closure(now.saturating_duration_since(start));
            }
        }
        self.log_transition(signal, level);

        if let Err(e) = self.channel.send(level) {
            tracing::warn!(error = %e, "actuator send failed");
        }
        level
    }

    /// 从 `source` 取帧直到流结束、来源失效或收到停止信号，随后执行清理。
    pub fn run<S>(
        &mut self,
        source: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<RunReport, SourceError>
    where
        S: SignalSource + ?Sized,
    {
        let outcome = self.drive(source, shutdown);
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "frame source failed, stopping");
        }
        self.teardown();
        outcome
    }

    fn drive<S>(
        &mut self,
        source: &mut S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<RunReport, SourceError>
    where
        S: SignalSource + ?Sized,
    {
        let mut frames = 0_u64;
        loop {
            if shutdown_requested(shutdown) {
                tracing::info!(frames, "shutdown requested, leaving frame loop");
                return Ok(RunReport {
                    reason: StopReason::ShutdownRequested,
                    frames,
                });
            }

            if let Some(pacer) = self.pacer.as_mut() {
                pacer.begin_frame();
            }

            let classification = match source.next_frame() {
                Ok(Some(c)) => c,
                Ok(None) => {
                    tracing::info!(frames, "frame source exhausted");
                    return Ok(RunReport {
                        reason: StopReason::EndOfStream,
                        frames,
                    });
                }
                // 来源在等待下一帧时已看到停止信号
                Err(SourceError::Interrupted) => {
                    tracing::info!(frames, "shutdown requested while waiting for a frame");
                    return Ok(RunReport {
                        reason: StopReason::ShutdownRequested,
                        frames,
                    });
                }
                Err(e) => return Err(e),
            };
            if classification == Classification::ClassifierUnavailable {
                tracing::debug!(frame = frames, "classifier unavailable, treating as no face");
            }
            self.step(classification.into());
            frames += 1;

            if let Some(pacer) = self.pacer.as_mut() {
                pacer.end_frame();
            }
        }
    }

    /// 清零并断开执行器，只有第一次调用生效。
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        tracing::info!(status = ?self.channel.status(), "tearing down session");
        if let Err(e) = self.channel.send(AlertLevel::Normal) {
            tracing::warn!(error = %e, "final clear command failed");
        }
        if let Err(e) = self.channel.disconnect() {
            tracing::warn!(error = %e, "actuator disconnect reported an error");
        }

        let summary = self.history.summary();
        tracing::info!(
            frames = summary.frames,
            alarm_frames = summary.alarm_frames,
            alarm_episodes = summary.alarm_episodes,
            no_face_frames = summary.no_face_frames,
            longest_closure_ms = summary.longest_closure_ms,
            "session summary"
        );
        if let Some(pacer) = &self.pacer {
            let stats = pacer.stats();
            tracing::info!(
                frame_budget_ms = stats.frame_budget.as_millis() as u64,
                deadline_misses = stats.deadline_misses,
                worst_case_ms = stats.worst_case.as_millis() as u64,
                "frame pacing"
            );
        }
    }

    fn log_transition(&mut self, signal: FrameSignal, level: AlertLevel) {
        let kind = level.kind();
        if kind == self.last_alert {
            return;
        }
        match (self.last_alert, level) {
            (_, AlertLevel::Alarm) => tracing::warn!(
                threshold_ms = self.engine.threshold().as_millis() as u64,
                "drowsiness alarm raised"
            ),
            (AlertKind::Alarm, _) => tracing::info!(%signal, "drowsiness alarm cleared"),
            (_, AlertLevel::Warning(_)) => tracing::debug!("eyes closed, closure timer started"),
            (_, AlertLevel::Normal) => tracing::debug!(%signal, "closure run ended"),
        }
        self.last_alert = kind;
    }
}

impl<C: Clock> Drop for Session<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
