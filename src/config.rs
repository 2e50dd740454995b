//! Configuration types for the utterance queue and its output adapters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    /// Scheduling-core defaults.
    pub queue: QueueConfig,
    /// Speech-synthesis adapter tuning.
    pub speech_synth: SpeechSynthConfig,
    /// Aria-live adapter tuning.
    pub aria_live: AriaLiveConfig,
}

/// Default timing knobs for utterances that don't override them.
///
/// These mirror [`crate::utterance::Utterance`]'s own `alert_stable_delay`
/// and `alert_maximum_delay`, but live here so a host application can tune
/// the system-wide defaults without touching call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Default minimum time (ms) an entry must sit unchanged before it is
    /// eligible to be announced.
    pub default_stable_delay_ms: u32,
    /// Default hard ceiling (ms) on queue residence before stability is
    /// waived. `None` means unbounded.
    pub default_maximum_delay_ms: Option<u32>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_stable_delay_ms: 200,
            default_maximum_delay_ms: None,
        }
    }
}

/// Tuning for [`crate::announcer::speech_synth::SpeechSynthAdapter`]'s engine
/// workarounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSynthConfig {
    /// Keep-alive interval (ms): how long the engine may sit idle before an
    /// empty utterance is submitted to prevent it from idling out.
    pub engine_wake_interval_ms: u32,
    /// Pause/resume workaround interval (ms), applied while speaking on
    /// platforms known to cut speech off around 15s.
    pub pause_resume_interval_ms: u32,
    /// Pending-speech timeout (ms): how long `Pending` may last before the
    /// adapter declares announce failure and forces a platform cancel.
    pub pending_speech_timeout_ms: u32,
    /// Inter-utterance gap (ms): withhold `readyToAnnounce` for this long
    /// after an utterance ends. Clamped to a floor of 125ms — values below
    /// that have been observed to race flaky start/end events on at least
    /// one browser family.
    pub inter_utterance_gap_ms: u32,
}

impl Default for SpeechSynthConfig {
    fn default() -> Self {
        Self {
            engine_wake_interval_ms: 8_000,
            pause_resume_interval_ms: 10_000,
            pending_speech_timeout_ms: 5_000,
            inter_utterance_gap_ms: 250,
        }
    }
}

impl SpeechSynthConfig {
    /// Validate and clamp to the documented floor for the inter-utterance
    /// gap, logging if a caller-supplied value was too low.
    pub fn normalized(mut self) -> Self {
        const MIN_GAP_MS: u32 = 125;
        if self.inter_utterance_gap_ms < MIN_GAP_MS {
            tracing::warn!(
                configured = self.inter_utterance_gap_ms,
                floor = MIN_GAP_MS,
                "inter_utterance_gap_ms below documented floor, clamping"
            );
            self.inter_utterance_gap_ms = MIN_GAP_MS;
        }
        self
    }
}

/// Tuning for [`crate::announcer::aria_live::AriaLiveAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AriaLiveConfig {
    /// Number of rotating live-region nodes per priority (polite/assertive).
    pub regions_per_priority: usize,
    /// Delay (ms) after clearing a region before writing the new text.
    pub write_delay_ms: u32,
    /// Delay (ms) after writing the new text before re-clearing/hiding it.
    pub hide_delay_ms: u32,
}

impl Default for AriaLiveConfig {
    fn default() -> Self {
        Self {
            regions_per_priority: 4,
            write_delay_ms: 0,
            hide_delay_ms: 200,
        }
    }
}

impl AnnounceConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AnnounceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot
    /// be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AnnounceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/utterance-queue/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config)
                .join("utterance-queue")
                .join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("utterance-queue")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/utterance-queue-config/config.toml")
        }
    }
}
