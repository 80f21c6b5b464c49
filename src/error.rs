//! Engine error types.

use std::fmt;

/// Errors surfaced to control threads by the engine and the sample loader.
///
/// Registry and cache misses are not errors; those APIs return `Option`.
#[derive(Debug)]
pub enum EngineError {
    /// Device enumeration found nothing with output channels.
    NoUsableOutputDevice,
    /// `start` was called before an output device was selected.
    DeviceNotSelected,
    /// The backend rejected the stream configuration.
    StreamOpenFailed(String),
    /// The stream was opened but could not be started.
    StreamStartFailed(String),
    /// The running stream could not be stopped cleanly.
    StreamStopFailed(String),
    /// A sample file could not be read or decoded.
    DecodeFailed(String),
    /// Decoded audio the core cannot play (e.g. more than two channels).
    UnsupportedFormat(String),
    /// IO error
    IoError(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoUsableOutputDevice => {
                write!(f, "no usable audio output device found")
            }
            EngineError::DeviceNotSelected => {
                write!(f, "no output device selected")
            }
            EngineError::StreamOpenFailed(msg) => write!(f, "failed to open stream: {}", msg),
            EngineError::StreamStartFailed(msg) => write!(f, "failed to start stream: {}", msg),
            EngineError::StreamStopFailed(msg) => write!(f, "failed to stop stream: {}", msg),
            EngineError::DecodeFailed(msg) => write!(f, "failed to decode sample: {}", msg),
            EngineError::UnsupportedFormat(msg) => write!(f, "unsupported format: {}", msg),
            EngineError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::IoError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_backend_detail() {
        let err = EngineError::StreamOpenFailed("ALSA device busy".into());
        assert!(err.to_string().contains("ALSA device busy"));
    }
}
