use embedded_hal::digital::ErrorKind;
use thiserror::Error;

/// Errors reported by the cube, its hardware and the scan engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CubeError {
    /// A coordinate was outside `0..8`
    #[error("coordinate {value} is outside the cube")]
    OutOfRange { value: usize },
    /// The glyph table has no bitmap for this character
    #[error("unsupported character {0:?}")]
    UnsupportedCharacter(char),
    /// A GPIO line failed to switch
    #[error("pin error: {0:?}")]
    Pin(ErrorKind),
    /// The scan engine was started twice
    #[error("scan engine is already running")]
    AlreadyRunning,
    /// A stop was requested but no scan engine is running
    #[error("scan engine is not running")]
    NotRunning,
    /// The scan thread could not be spawned
    #[error("failed to spawn scan thread: {0}")]
    Spawn(String),
    /// The scan thread panicked
    #[error("scan thread panicked")]
    Panicked,
}

impl CubeError {
    pub(crate) fn pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Self::Pin(err.kind())
    }
}

/// Errors produced while reading an effect event script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    #[error("invalid interval {0:?}")]
    InvalidInterval(String),
    #[error("script ended before <END>")]
    UnexpectedEof,
}
