use std::time::{Duration, Instant};

/// 让帧循环保持固定帧率，并统计超时的周期。
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_budget: Duration,
    cycle_start: Option<Instant>,
    deadline_misses: u64,
    worst_case: Duration,
    total_frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingStats {
    pub frame_budget: Duration,
    pub deadline_misses: u64,
    pub worst_case: Duration,
    pub total_frames: u64,
}

impl FramePacer {
    /// 帧率为零时返回 `None`，即有帧就处理、不做节流。
    pub fn new(fps: u32) -> Option<Self> {
        if fps == 0 {
            return None;
        }
        Some(Self {
            frame_budget: Duration::from_secs(1) / fps,
            cycle_start: None,
            deadline_misses: 0,
            worst_case: Duration::ZERO,
            total_frames: 0,
        })
    }

    pub fn begin_frame(&mut self) {
        self.cycle_start = Some(Instant::now());
    }

    /// 睡完本帧预算的剩余时间。
    pub fn end_frame(&mut self) {
        let Some(start) = self.cycle_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.observe(elapsed);

        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }

    fn observe(&mut self, elapsed: Duration) {
        if elapsed > self.frame_budget {
            self.deadline_misses += 1;
        }
        if elapsed > self.worst_case {
            self.worst_case = elapsed;
        }
        self.total_frames += 1;
    }

    pub fn stats(&self) -> PacingStats {
        PacingStats {
            frame_budget: self.frame_budget,
            deadline_misses: self.deadline_misses,
            worst_case: self.worst_case,
            total_frames: self.total_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_disables_pacing() {
        assert!(FramePacer::new(0).is_none());
    }

    #[test]
    fn observe_counts_overruns() {
        let mut pacer = FramePacer::new(50).expect("pacer");
        pacer.observe(Duration::from_millis(5));
        pacer.observe(Duration::from_millis(35));

        let stats = pacer.stats();
        assert_eq!(stats.frame_budget, Duration::from_millis(20));
        assert_eq!(stats.total_frames, 2);
        assert_eq!(stats.deadline_misses, 1);
        assert_eq!(stats.worst_case, Duration::from_millis(35));
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut pacer = FramePacer::new(1000).expect("pacer");
        pacer.end_frame();
        assert_eq!(pacer.stats().total_frames, 0);
    }
}
