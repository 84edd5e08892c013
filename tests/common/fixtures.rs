use std::time::Duration;

use drowsiness_alert::actuator::{ActuatorChannel, Endpoint, MemoryOpener};
use drowsiness_alert::clock::ManualClock;
use drowsiness_alert::debounce::DebounceEngine;
use drowsiness_alert::session::Session;
use drowsiness_alert::signal::{Classification, FrameSignal};
use drowsiness_alert::source::SourceError;

pub const THRESHOLD: Duration = Duration::from_secs(1);

pub fn mock_channel(opener: &MemoryOpener) -> ActuatorChannel {
    ActuatorChannel::new(
        Box::new(opener.clone()),
        Endpoint::new("mock", 9600),
        Duration::ZERO,
    )
}

pub fn mock_session(opener: &MemoryOpener, clock: &ManualClock) -> Session<ManualClock> {
    Session::new(
        DebounceEngine::new(THRESHOLD),
        mock_channel(opener),
        clock.clone(),
    )
}

/// 依次产出 `frames` 的来源，除第一帧外每帧前把 `clock` 推进 `tick`。
pub fn ticking_source(
    clock: &ManualClock,
    tick: Duration,
    frames: Vec<FrameSignal>,
) -> impl FnMut() -> Result<Option<Classification>, SourceError> {
    let clock = clock.clone();
    let mut frames = frames.into_iter();
    let mut first = true;
    move || {
        let Some(signal) = frames.next() else {
            return Ok(None);
        };
        if !first {
            clock.advance(tick);
        }
        first = false;
        Ok(Some(Classification::Observed(signal)))
    }
}
