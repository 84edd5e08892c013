mod common;

use std::time::Duration;

use proptest::prelude::*;

use drowsiness_alert::actuator::{ChannelStatus, MemoryOpener};
use drowsiness_alert::clock::{ManualClock, Timestamp};
use drowsiness_alert::debounce::{AlertLevel, DebounceEngine};
use drowsiness_alert::signal::FrameSignal;

use common::fixtures::mock_session;

fn signal_strategy() -> impl Strategy<Value = FrameSignal> {
    prop_oneof![
        3 => Just(FrameSignal::EyesClosed),
        1 => Just(FrameSignal::EyesOpen),
        1 => Just(FrameSignal::NoFaceDetected),
    ]
}

fn frames_strategy() -> impl Strategy<Value = Vec<(FrameSignal, u64)>> {
    prop::collection::vec((signal_strategy(), 0_u64..600), 0..80)
}

proptest! {
    #[test]
    fn pt_alarm_only_after_unbroken_run(
        frames in frames_strategy(),
        threshold_ms in 1_u64..2000,
    ) {
        let threshold = Duration::from_millis(threshold_ms);
        let mut engine = DebounceEngine::new(threshold);
        let mut now = 0_u64;
        let mut run_start: Option<u64> = None;

        for (signal, gap) in frames {
            now += gap;
            let level = engine.evaluate(signal, Timestamp::from_millis(now));

            if signal.is_closed() {
                let first = run_start.is_none();
                let start = *run_start.get_or_insert(now);
                let run = Duration::from_millis(now - start);
                if !first && run >= threshold {
                    prop_assert_eq!(level, AlertLevel::Alarm);
                } else {
                    prop_assert_eq!(level, AlertLevel::Warning(run));
                }
            } else {
                run_start = None;
                prop_assert_eq!(level, AlertLevel::Normal);
            }
        }
    }

    #[test]
    fn pt_deescalation_is_immediate(
        closed_frames in 2_usize..20,
        gap_ms in 100_u64..500,
        interrupt in prop_oneof![Just(FrameSignal::EyesOpen), Just(FrameSignal::NoFaceDetected)],
    ) {
        let mut engine = DebounceEngine::new(Duration::from_millis(100));
        let mut now = 0_u64;
        let mut last = AlertLevel::Normal;
        for _ in 0..closed_frames {
            last = engine.evaluate(FrameSignal::EyesClosed, Timestamp::from_millis(now));
            now += gap_ms;
        }
        prop_assert_eq!(last, AlertLevel::Alarm);
        prop_assert_eq!(engine.evaluate(interrupt, Timestamp::from_millis(now)), AlertLevel::Normal);
    }

    #[test]
    fn pt_teardown_leaves_actuator_cleared(
        frames in frames_strategy(),
        fault_after in prop::option::of(0_usize..10),
    ) {
        let opener = MemoryOpener::new();
        let clock = ManualClock::new();
        let mut session = mock_session(&opener, &clock);
        session.start();
        if let Some(n) = fault_after {
            opener.fault_after_writes(n);
        }

        for (signal, gap) in frames {
            clock.advance(Duration::from_millis(gap));
            session.step(signal);
        }
        session.teardown();

        // 中途故障的链路可能刚写完 '1' 就断了
        if session.channel().status() != ChannelStatus::Faulted {
            if let Some(last) = opener.last_byte() {
                prop_assert_eq!(last, b'0');
            }
        }
        prop_assert!(!session.channel().is_connected());
    }
}
