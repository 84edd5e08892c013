use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// 眼部状态分类器的逐帧输出。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSignal {
    EyesOpen,
    EyesClosed,
    NoFaceDetected,
}

impl FrameSignal {
    pub fn is_closed(self) -> bool {
        matches!(self, FrameSignal::EyesClosed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameSignal::EyesOpen => "open",
            FrameSignal::EyesClosed => "closed",
            FrameSignal::NoFaceDetected => "no_face",
        }
    }
}

impl fmt::Display for FrameSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分类器边界每帧交出的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Observed(FrameSignal),
    /// 分类器这一帧没有给出可用结果。
    ClassifierUnavailable,
}

impl From<FrameSignal> for Classification {
    fn from(signal: FrameSignal) -> Self {
        Classification::Observed(signal)
    }
}

impl From<Classification> for FrameSignal {
    fn from(c: Classification) -> Self {
        match c {
            Classification::Observed(signal) => signal,
            // 无法判断时不能认定为困倦
            Classification::ClassifierUnavailable => FrameSignal::NoFaceDetected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classification token: {0:?}")]
pub struct UnknownToken(pub String);

impl FromStr for Classification {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "eyes_open" => Ok(FrameSignal::EyesOpen.into()),
            "closed" | "eyes_closed" => Ok(FrameSignal::EyesClosed.into()),
            "none" | "noface" | "no_face" => Ok(FrameSignal::NoFaceDetected.into()),
            "unavailable" => Ok(Classification::ClassifierUnavailable),
            _ => Err(UnknownToken(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_classifier_means_no_face() {
        let signal: FrameSignal = Classification::ClassifierUnavailable.into();
        assert_eq!(signal, FrameSignal::NoFaceDetected);
    }

    #[test]
    fn parses_tokens_case_insensitively() {
        assert_eq!(
            "Closed".parse::<Classification>(),
            Ok(Classification::Observed(FrameSignal::EyesClosed))
        );
        assert_eq!(
            " noface ".parse::<Classification>(),
            Ok(Classification::Observed(FrameSignal::NoFaceDetected))
        );
        assert!("blink".parse::<Classification>().is_err());
    }
}
