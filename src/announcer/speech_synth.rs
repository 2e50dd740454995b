//! The speech-synthesis Announcer: drives an external speech engine
//! through a small Pending/Speaking state machine, layered with a handful of
//! workarounds for engine quirks observed in the field — keep-alive pings,
//! a pause/resume heartbeat, a pending-speech timeout, and a cooldown gap
//! between utterances.
//!
//! The actual speech engine is abstracted behind [`SpeechPlatform`] so this
//! adapter (state machine, workaround timers, cancelSelf/cancelOther policy)
//! can be exercised against a fake in tests without a real TTS backend.

use crate::announcer::{Announcer, QueueView};
use crate::config::SpeechSynthConfig;
use crate::observable::EventEmitter;
use crate::utterance::{AnnouncerOptions, Utterance};

/// A voice exposed by the platform's voice list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// An event the platform reports back to the adapter. Modelled as a
/// poll-drained queue (rather than a callback) to keep the adapter's own
/// state machine synchronous and tick-driven like the rest of the crate.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechPlatformEvent {
    /// The engine began speaking the most recently submitted utterance.
    Start,
    /// The engine finished speaking it.
    End,
    /// The engine reported an error instead of finishing normally.
    Error(String),
}

/// Abstraction over a platform speech-synthesis engine (e.g. Web Speech API,
/// a native TTS binding).
pub trait SpeechPlatform {
    /// Submit `text` for synthesis. Replaces anything currently speaking.
    fn speak(&mut self, text: &str);
    /// Cancel whatever is queued or speaking on the platform side.
    fn cancel(&mut self);
    /// Pause output without cancelling (part of the 15s-cutoff workaround).
    fn pause(&mut self);
    /// Resume output paused by [`SpeechPlatform::pause`].
    fn resume(&mut self);
    /// The platform's currently available voice list, unsorted/possibly
    /// containing duplicates across locales.
    fn voices(&self) -> Vec<Voice>;
    /// Drain events (start/end/error) the platform has produced since the
    /// last call.
    fn poll_events(&mut self) -> Vec<SpeechPlatformEvent>;
}

/// Sort voices with "Google" voices first and "Fred" last (`Fred` is a
/// known-low-quality legacy macOS voice; `Google` voices are generally
/// preferred when present), deduplicating by `(name, lang)`.
pub fn sort_voices(voices: &[Voice]) -> Vec<Voice> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<Voice> = Vec::new();
    for v in voices {
        let key = (v.name.clone(), v.lang.clone());
        if seen.insert(key) {
            deduped.push(v.clone());
        }
    }
    deduped.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name)));
    deduped
}

fn rank(v: &Voice) -> i32 {
    if v.name.contains("Google") {
        0
    } else if v.name.contains("Fred") {
        2
    } else {
        1
    }
}

/// Strip bidi embedding/isolate control characters and `<br>`/`<br/>` tags
/// that some producers leave in response text but which a speech engine
/// should never vocalize.
pub fn sanitize_for_speech(text: &str) -> String {
    const EMBEDDING_MARKS: [char; 9] = [
        '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}', '\u{2066}', '\u{2067}',
        '\u{2068}', '\u{2069}',
    ];
    without_br_tags(text)
        .chars()
        .filter(|c| !EMBEDDING_MARKS.contains(c))
        .collect()
}

fn without_br_tags(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut skip_until = None;
    for (i, ch) in text.char_indices() {
        if let Some(end) = skip_until {
            if i < end {
                continue;
            }
            skip_until = None;
        }
        if lower[i..].starts_with("<br") {
            if let Some(rel_end) = text[i..].find('>') {
                skip_until = Some(i + rel_end + 1);
                out.push(' ');
                continue;
            }
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Pending,
    Speaking,
    Gap,
}

struct Current {
    utterance: Utterance,
    text: String,
}

/// The speech-synthesis Announcer.
pub struct SpeechSynthAdapter<P: SpeechPlatform> {
    platform: P,
    config: SpeechSynthConfig,
    state: State,
    time_in_state_ms: f64,
    idle_time_ms: f64,
    current: Option<Current>,
    completion: EventEmitter<(Utterance, Option<String>)>,
    has_spoken: bool,
    speech_allowed: bool,
    enabled: bool,
    main_window_enabled: bool,
    gesture_received: bool,
}

impl<P: SpeechPlatform> SpeechSynthAdapter<P> {
    /// Build the adapter around a platform binding and configuration. All
    /// three enable flags (`speech_allowed`, `enabled`, `main_window_enabled`)
    /// default `true`.
    pub fn new(platform: P, config: SpeechSynthConfig) -> Self {
        Self {
            platform,
            config: config.normalized(),
            state: State::Idle,
            time_in_state_ms: 0.0,
            idle_time_ms: 0.0,
            current: None,
            completion: EventEmitter::new(),
            has_spoken: false,
            speech_allowed: true,
            enabled: true,
            main_window_enabled: true,
            gesture_received: false,
        }
    }

    /// Build the adapter from a fallible platform factory, surfacing
    /// construction failure as [`crate::error::AnnounceError::PlatformUnavailable`].
    ///
    /// Runtime unavailability *after* successful construction is not an
    /// error — the adapter degrades to the inert, always-completing
    /// behaviour instead.
    pub fn try_new<F>(build_platform: F, config: SpeechSynthConfig) -> crate::error::Result<Self>
    where
        F: FnOnce() -> Result<P, String>,
    {
        let platform = build_platform().map_err(crate::error::AnnounceError::PlatformUnavailable)?;
        Ok(Self::new(platform, config))
    }

    /// Signal that the platform-required user-gesture event has fired.
    /// Idempotent. Speech submitted to the
    /// platform is permitted only after this has been called at least once;
    /// `announce` calls before it synthesise an immediate completion instead
    /// of blocking the queue.
    pub fn signal_user_gesture(&mut self) {
        if !self.gesture_received {
            tracing::info!("speech engine initialisation gesture received");
        }
        self.gesture_received = true;
    }

    /// Whether the initialisation gesture has been received yet.
    pub fn is_initialized(&self) -> bool {
        self.gesture_received
    }

    /// Sorted, deduplicated voice list.
    pub fn voices(&self) -> Vec<Voice> {
        sort_voices(&self.platform.voices())
    }

    /// Borrow the underlying platform binding, for inspection by a test
    /// harness or a host that needs to reach through for platform-specific
    /// configuration.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutably borrow the underlying platform binding, e.g. for a test fake
    /// to push a synthesized start/end/error event ahead of the next `step`.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// The effective (normalized) configuration this adapter is running
    /// with.
    pub fn config(&self) -> &SpeechSynthConfig {
        &self.config
    }

    /// Set whether the hosting page currently allows speech (e.g. a user
    /// opt-out toggle). Cancels in-flight speech on a true→false transition.
    pub fn set_speech_allowed(&mut self, allowed: bool) {
        self.set_combined_flag(|s| &mut s.speech_allowed, allowed);
    }

    /// Set whether this adapter is enabled at all.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.set_combined_flag(|s| &mut s.enabled, enabled);
    }

    /// Set whether the main application window currently has focus/visibility
    /// required for speech (platforms that mute background tabs).
    pub fn set_main_window_enabled(&mut self, enabled: bool) {
        self.set_combined_flag(|s| &mut s.main_window_enabled, enabled);
    }

    fn set_combined_flag(&mut self, field: impl FnOnce(&mut Self) -> &mut bool, value: bool) {
        let was_enabled = self.combined_enabled();
        *field(self) = value;
        if was_enabled && !self.combined_enabled() {
            Announcer::cancel(self);
        }
    }

    fn combined_enabled(&self) -> bool {
        self.speech_allowed && self.enabled && self.main_window_enabled
    }

    fn transition(&mut self, state: State) {
        tracing::debug!(from = ?self.state, to = ?state, "speech-synth state transition");
        self.state = state;
        self.time_in_state_ms = 0.0;
    }

    fn finish_current(&mut self, text_emitted: Option<String>) {
        if let Some(current) = self.current.take() {
            self.has_spoken = self.has_spoken || text_emitted.is_some();
            self.completion.emit(&(current.utterance, text_emitted));
        }
        self.transition(State::Gap);
    }
}

impl<P: SpeechPlatform> Announcer for SpeechSynthAdapter<P> {
    fn announce(&mut self, utterance: &Utterance, text: &str, _options: &AnnouncerOptions) {
        if !self.gesture_received {
            tracing::debug!("announce before initialisation gesture, synthesising completion");
            self.completion.emit(&(utterance.clone(), None));
            return;
        }
        if !self.combined_enabled() {
            self.completion.emit(&(utterance.clone(), None));
            return;
        }
        let sanitized = sanitize_for_speech(text);
        self.current = Some(Current {
            utterance: utterance.clone(),
            text: sanitized.clone(),
        });
        self.platform.speak(&sanitized);
        self.transition(State::Pending);
    }

    fn cancel(&mut self) {
        if self.current.is_some() {
            self.platform.cancel();
            self.finish_current(None);
        }
    }

    fn cancel_utterance(&mut self, utterance: &Utterance) {
        let matches = self
            .current
            .as_ref()
            .map(|c| c.utterance.same_instance(utterance))
            .unwrap_or(false);
        if matches {
            Announcer::cancel(self);
        }
    }

    fn should_utterance_cancel_other(&self, candidate: &Utterance, victim: &Utterance) -> bool {
        if candidate.same_instance(victim) {
            return candidate.announcer_options().cancel_self;
        }
        let equal_priority_collision =
            (candidate.priority() - victim.priority()).abs() < f64::EPSILON;
        if equal_priority_collision {
            candidate.announcer_options().cancel_other
        } else {
            candidate.priority() > victim.priority()
        }
    }

    fn on_utterance_priority_change(&mut self, front: Option<&Utterance>) {
        let Some(front) = front else { return };
        let Some(current) = &self.current else { return };
        if current.utterance.same_instance(front) {
            return;
        }
        if self.should_utterance_cancel_other(front, &current.utterance) {
            Announcer::cancel(self);
        }
    }

    fn step(&mut self, dt_ms: f64, _queue: &QueueView) {
        self.time_in_state_ms += dt_ms;

        // The can-announce gate is polled rather than subscribed to: it's a
        // mid-speech interrupt signal, and a tick-driven check keeps the
        // adapter from needing a self-referential subscription back into its
        // own (possibly Rc<RefCell<..>>-wrapped) state.
        if matches!(self.state, State::Pending | State::Speaking) {
            let gate_open = self
                .current
                .as_ref()
                .map(|c| c.utterance.can_announce())
                .unwrap_or(true);
            if !gate_open {
                tracing::debug!("can-announce gate closed mid-speech, cancelling");
                Announcer::cancel(self);
            }
        }

        for event in self.platform.poll_events() {
            match event {
                SpeechPlatformEvent::Start if self.state == State::Pending => {
                    self.transition(State::Speaking);
                }
                SpeechPlatformEvent::End if matches!(self.state, State::Pending | State::Speaking) => {
                    let text = self.current.as_ref().map(|c| c.text.clone());
                    self.finish_current(text);
                }
                SpeechPlatformEvent::Error(reason) => {
                    tracing::warn!(reason, "speech platform reported an error");
                    self.finish_current(None);
                }
                _ => {}
            }
        }

        match self.state {
            State::Idle => {
                self.idle_time_ms += dt_ms;
                if self.idle_time_ms >= self.config.engine_wake_interval_ms as f64 {
                    self.idle_time_ms = 0.0;
                    tracing::trace!("submitting keep-alive ping to speech engine");
                    self.platform.speak("");
                    self.platform.cancel();
                }
            }
            State::Pending => {
                self.idle_time_ms = 0.0;
                if self.time_in_state_ms >= self.config.pending_speech_timeout_ms as f64 {
                    tracing::warn!(
                        waited_ms = self.time_in_state_ms,
                        "pending speech timed out, forcing cancel"
                    );
                    self.platform.cancel();
                    self.finish_current(None);
                }
            }
            State::Speaking => {
                self.idle_time_ms = 0.0;
                if self.time_in_state_ms >= self.config.pause_resume_interval_ms as f64 {
                    self.time_in_state_ms = 0.0;
                    tracing::trace!("applying pause/resume workaround to keep engine alive");
                    self.platform.pause();
                    self.platform.resume();
                }
            }
            State::Gap => {
                if self.time_in_state_ms >= self.config.inter_utterance_gap_ms as f64 {
                    self.transition(State::Idle);
                }
            }
        }
    }

    fn ready_to_announce(&self) -> bool {
        self.combined_enabled() && matches!(self.state, State::Idle)
    }

    fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    fn announce_immediately_until_speaking(&self) -> bool {
        !self.has_spoken
    }

    fn respect_response_collector_properties(&self) -> bool {
        true
    }

    fn completion(&self) -> &EventEmitter<(Utterance, Option<String>)> {
        &self.completion
    }
}
