//! Shared test fakes for the integration suite: a deterministic Announcer
//! fake (records every call, completes on command) and a deterministic
//! SpeechPlatform fake (records calls, lets a test fire start/end/error
//! synchronously). Grounded in the teacher's preference for hand-rolled
//! fakes over `mockall` for small seams (see DESIGN.md).

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use utterance_queue::{
    AnnouncerOptions, EventEmitter, QueueView, Utterance, UtteranceOptions,
};

/// A deterministic Announcer: records every call it receives and completes
/// utterances only when the test explicitly asks it to via `complete`.
pub struct FakeAnnouncer {
    pub announced: Vec<(Utterance, String)>,
    pub cancelled: Vec<Utterance>,
    pub cancel_all_count: u32,
    pub priority_change_notifications: Vec<Option<Utterance>>,
    pub ready: bool,
    pub respect_response_collector_properties: bool,
    pub announce_immediately_until_speaking: bool,
    completion: EventEmitter<(Utterance, Option<String>)>,
    current: Option<Utterance>,
}

impl Default for FakeAnnouncer {
    fn default() -> Self {
        Self {
            announced: Vec::new(),
            cancelled: Vec::new(),
            cancel_all_count: 0,
            priority_change_notifications: Vec::new(),
            ready: true,
            respect_response_collector_properties: false,
            announce_immediately_until_speaking: false,
            completion: EventEmitter::new(),
            current: None,
        }
    }
}

impl FakeAnnouncer {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Synchronously complete whatever is currently recorded as announcing.
    pub fn complete_current(&mut self) {
        if let Some(u) = self.current.take() {
            self.completion.emit(&(u, Some("done".to_string())));
        }
    }
}

impl utterance_queue::Announcer for FakeAnnouncer {
    fn announce(&mut self, utterance: &Utterance, text: &str, _options: &AnnouncerOptions) {
        self.announced.push((utterance.clone(), text.to_owned()));
        self.current = Some(utterance.clone());
    }

    fn cancel(&mut self) {
        self.cancel_all_count += 1;
        self.complete_current();
    }

    fn cancel_utterance(&mut self, utterance: &Utterance) {
        self.cancelled.push(utterance.clone());
        if self
            .current
            .as_ref()
            .map(|c| c.same_instance(utterance))
            .unwrap_or(false)
        {
            self.complete_current();
        }
    }

    fn should_utterance_cancel_other(&self, candidate: &Utterance, victim: &Utterance) -> bool {
        utterance_queue::announcer::default_should_cancel_other(candidate, victim)
    }

    fn on_utterance_priority_change(&mut self, front: Option<&Utterance>) {
        self.priority_change_notifications.push(front.cloned());
        // A generic Announcer that interrupts if policy demands checks its
        // own collision policy against whatever is currently announcing. An
        // interrupted utterance completes with no resolved text,
        // distinguishing it from a normal `complete_current`.
        let should_interrupt = match (&front, &self.current) {
            (Some(front), Some(current)) if !front.same_instance(current) => {
                self.should_utterance_cancel_other(front, current)
            }
            _ => false,
        };
        if should_interrupt {
            if let Some(u) = self.current.take() {
                self.completion.emit(&(u, None));
            }
        }
    }

    fn step(&mut self, _dt_ms: f64, _queue: &QueueView) {}

    fn ready_to_announce(&self) -> bool {
        // A single-channel announcer, like a real speech engine, can't
        // accept a new utterance while one is already announcing — real
        // adapters (e.g. `SpeechSynthAdapter`) report this via their own
        // state machine; this fake models the same constraint explicitly so
        // that the queue's own readiness pre-check behaves the way it would
        // against a real backend.
        self.ready && self.current.is_none()
    }

    fn has_spoken(&self) -> bool {
        !self.announced.is_empty()
    }

    fn announce_immediately_until_speaking(&self) -> bool {
        self.announce_immediately_until_speaking
    }

    fn respect_response_collector_properties(&self) -> bool {
        self.respect_response_collector_properties
    }

    fn completion(&self) -> &EventEmitter<(Utterance, Option<String>)> {
        &self.completion
    }
}

/// Convenience constructor for an Utterance with a given priority and
/// stable delay, matching the `stableDelay=0, priority=1` worked scenarios.
pub fn utterance_with(text: &str, priority: f64, stable_delay_ms: u32) -> Utterance {
    let u = Utterance::new(
        text,
        UtteranceOptions {
            alert_stable_delay_ms: stable_delay_ms,
            ..UtteranceOptions::default()
        },
    );
    u.set_priority(priority);
    u.set_announcer_options(AnnouncerOptions {
        cancel_self: false,
        cancel_other: false,
        ..AnnouncerOptions::default()
    });
    u
}

/// A deterministic SpeechPlatform fake: records every call, lets a test push
/// start/end/error events to be drained on the next `step`.
#[derive(Default)]
pub struct FakePlatform {
    pub spoken: Vec<String>,
    pub cancelled: u32,
    pub paused: u32,
    pub resumed: u32,
    pub pending_events: Vec<utterance_queue::SpeechPlatformEvent>,
    pub voices: Vec<utterance_queue::Voice>,
}

impl utterance_queue::SpeechPlatform for FakePlatform {
    fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_owned());
    }

    fn cancel(&mut self) {
        self.cancelled += 1;
    }

    fn pause(&mut self) {
        self.paused += 1;
    }

    fn resume(&mut self) {
        self.resumed += 1;
    }

    fn voices(&self) -> Vec<utterance_queue::Voice> {
        self.voices.clone()
    }

    fn poll_events(&mut self) -> Vec<utterance_queue::SpeechPlatformEvent> {
        std::mem::take(&mut self.pending_events)
    }
}
