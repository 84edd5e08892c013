//! 闭眼防抖模块
//!
//! 把逐帧的"是否闭眼"信号转换为稳定的报警等级：
//! 连续闭眼达到阈值才升级为 Alarm，任何睁眼或丢脸帧立即回到 Normal。
//! 升级有延迟，降级没有延迟。

use std::time::Duration;

use crate::clock::Timestamp;
use crate::signal::FrameSignal;

/// 防抖引擎的稳定输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    Normal,
    /// 已闭眼给定时长，尚未达到阈值。
    Warning(Duration),
    Alarm,
}

impl AlertLevel {
    pub fn is_alarm(&self) -> bool {
        matches!(self, AlertLevel::Alarm)
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            AlertLevel::Normal => AlertKind::Normal,
            AlertLevel::Warning(_) => AlertKind::Warning,
            AlertLevel::Alarm => AlertKind::Alarm,
        }
    }
}

/// 去掉时长的 `AlertLevel`，用于日志和历史记录。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Normal,
    Warning,
    Alarm,
}

/// 当前闭眼段的起点（如果有）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosureTimer {
    started_at: Option<Timestamp>,
}

impl ClosureTimer {
    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    fn clear(&mut self) {
        self.started_at = None;
    }

    /// 第一帧闭眼时开始计时，返回已持续的时长。
    fn observe_closed(&mut self, now: Timestamp) -> Duration {
        match self.started_at {
            Some(start) => now.saturating_duration_since(start),
            None => {
                self.started_at = Some(now);
                Duration::ZERO
            }
        }
    }
}

/// 闭眼防抖引擎
#[derive(Debug, Clone)]
pub struct DebounceEngine {
    threshold: Duration,
    timer: ClosureTimer,
}

impl DebounceEngine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            timer: ClosureTimer::default(),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn closure_started_at(&self) -> Option<Timestamp> {
        self.timer.started_at()
    }

    pub fn evaluate(&mut self, signal: FrameSignal, now: Timestamp) -> AlertLevel {
        match signal {
            // 丢失人脸与睁眼同样处理：无法断言困倦
            FrameSignal::EyesOpen | FrameSignal::NoFaceDetected => {
                self.timer.clear();
                AlertLevel::Normal
            }
            FrameSignal::EyesClosed => {
                let first = self.timer.started_at().is_none();
                let closed_for = self.timer.observe_closed(now);
                if !first && closed_for >= self.threshold {
                    AlertLevel::Alarm
                } else {
                    AlertLevel::Warning(closed_for)
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.timer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_secs_f64(secs)
    }

    #[test]
    fn closure_run_escalates_after_threshold() {
        let mut engine = DebounceEngine::new(Duration::from_secs(1));
        let ticks = [0.0, 0.3, 0.6, 0.9, 1.2, 1.5];
        let signals = [
            FrameSignal::EyesClosed,
            FrameSignal::EyesClosed,
            FrameSignal::EyesClosed,
            FrameSignal::EyesClosed,
            FrameSignal::EyesClosed,
            FrameSignal::EyesOpen,
        ];

        let levels: Vec<AlertLevel> = ticks
            .iter()
            .zip(signals)
            .map(|(t, s)| engine.evaluate(s, at(*t)))
            .collect();

        assert_eq!(
            levels,
            vec![
                AlertLevel::Warning(Duration::ZERO),
                AlertLevel::Warning(at(0.3).offset()),
                AlertLevel::Warning(at(0.6).offset()),
                AlertLevel::Warning(at(0.9).offset()),
                AlertLevel::Alarm,
                AlertLevel::Normal,
            ]
        );
    }

    #[test]
    fn no_face_resets_like_open() {
        let mut engine = DebounceEngine::new(Duration::from_secs(1));
        engine.evaluate(FrameSignal::EyesClosed, at(0.0));
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, at(1.0)),
            AlertLevel::Alarm
        );

        assert_eq!(
            engine.evaluate(FrameSignal::NoFaceDetected, at(1.1)),
            AlertLevel::Normal
        );
        assert_eq!(engine.closure_started_at(), None);
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, at(1.2)),
            AlertLevel::Warning(Duration::ZERO)
        );
    }

    #[test]
    fn exactly_threshold_is_alarm() {
        let mut engine = DebounceEngine::new(Duration::from_millis(500));
        engine.evaluate(FrameSignal::EyesClosed, Timestamp::from_millis(1000));
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, Timestamp::from_millis(1500)),
            AlertLevel::Alarm
        );
    }

    #[test]
    fn zero_threshold_still_needs_a_second_closed_frame() {
        let mut engine = DebounceEngine::new(Duration::ZERO);
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, at(0.0)),
            AlertLevel::Warning(Duration::ZERO)
        );
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, at(0.0)),
            AlertLevel::Alarm
        );
    }

    #[test]
    fn clock_going_backwards_does_not_panic() {
        let mut engine = DebounceEngine::new(Duration::from_secs(1));
        engine.evaluate(FrameSignal::EyesClosed, at(2.0));
        assert_eq!(
            engine.evaluate(FrameSignal::EyesClosed, at(1.0)),
            AlertLevel::Warning(Duration::ZERO)
        );
    }

    #[test]
    fn reset_clears_timer() {
        let mut engine = DebounceEngine::new(Duration::from_secs(1));
        engine.evaluate(FrameSignal::EyesClosed, at(0.0));
        engine.reset();
        assert_eq!(engine.closure_started_at(), None);
    }
}
