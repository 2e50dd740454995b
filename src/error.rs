//! Error type for the utterance queue's public, fallible entry points.
//!
//! The scheduling core itself (`UtteranceQueue`, `Announcer` impls) never
//! returns `Result` — per the design, misuse degrades gracefully or asserts
//! in debug builds. `AnnounceError` only covers config I/O and platform
//! adapter construction.

/// Top-level error type for `utterance-queue`.
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    /// Malformed or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error reading or writing a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `SpeechPlatform` implementation failed to initialise.
    #[error("speech platform unavailable: {0}")]
    PlatformUnavailable(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AnnounceError>;
