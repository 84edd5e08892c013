//! 串口执行器的闭眼报警
//!
//! 每帧的眼部分类结果经防抖得到报警级别，只有持续闭眼才会拉高执行器；
//! 睁眼或丢失人脸会立即清零。

pub mod actuator;
pub mod clock;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod history;
pub mod logging;
pub mod pacing;
pub mod session;
pub mod shutdown;
pub mod signal;
pub mod source;

pub use actuator::{ActuatorChannel, ActuatorError, ChannelStatus, Endpoint};
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use debounce::{AlertLevel, DebounceEngine};
pub use session::{RunReport, Session, StopReason};
pub use signal::{Classification, FrameSignal};
pub use source::{BackgroundSource, ScriptedSource, SignalSource, SourceError};
