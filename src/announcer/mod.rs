//! The Announcer interface.
//!
//! An Announcer is the output-adapter abstraction the queue drives: it
//! decides whether a new Utterance should cancel an older one, receives the
//! selected Utterance to actually speak/display, and reports completion
//! asynchronously through [`Announcer::completion`].

pub mod aria_live;
pub mod speech_synth;

use crate::observable::EventEmitter;
use crate::utterance::{AnnouncerOptions, Utterance};

/// A read-only snapshot of the queue's current entries, handed to
/// [`Announcer::step`] for per-tick maintenance decisions.
///
/// This is an owned snapshot (not a borrow into the queue's internal
/// storage): the queue must be free to mutate itself — including
/// synchronously, if `step` triggers a completion — while an Announcer is
/// mid-`step`, and holding a live borrow across that call would risk a
/// `RefCell` panic on reentry.
pub struct QueueView {
    entries: Vec<Utterance>,
}

impl QueueView {
    pub(crate) fn new(entries: Vec<Utterance>) -> Self {
        Self { entries }
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The Utterance at the front of the queue, if any.
    pub fn front(&self) -> Option<&Utterance> {
        self.entries.first()
    }

    /// Iterate over queued Utterances in order.
    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }
}

/// The output-adapter abstraction the queue drives.
pub trait Announcer {
    /// Hand an Utterance to the adapter for output, with its alert already
    /// resolved to final text by the queue's [`crate::alert::AlertResolver`]
    /// (the queue is the single place that owns a response collector; the
    /// adapter never re-resolves). The adapter is responsible for eventually
    /// emitting a [`Announcer::completion`] event carrying this same
    /// Utterance.
    fn announce(&mut self, utterance: &Utterance, text: &str, options: &AnnouncerOptions);

    /// Cancel whatever is currently being announced, if anything.
    fn cancel(&mut self);

    /// Cancel a specific Utterance if it is the one currently pending or
    /// being announced. No-op otherwise.
    fn cancel_utterance(&mut self, utterance: &Utterance);

    /// Should `candidate` cancel `victim`? Delegated to the Announcer so
    /// different backends can apply different collision policy.
    fn should_utterance_cancel_other(&self, candidate: &Utterance, victim: &Utterance) -> bool;

    /// Notify the Announcer that the front-of-queue Utterance may have
    /// changed, so it can interrupt the currently-announcing Utterance if
    /// policy demands.
    fn on_utterance_priority_change(&mut self, front: Option<&Utterance>);

    /// Per-tick maintenance hook (engine keep-alive, pending-timeout checks,
    /// and the like). `dt_ms` is the tick duration in milliseconds.
    fn step(&mut self, dt_ms: f64, queue: &QueueView);

    /// Whether the adapter is currently able to accept a new `announce`
    /// call.
    fn ready_to_announce(&self) -> bool;

    /// Latches `true` once speech has ever succeeded.
    fn has_spoken(&self) -> bool;

    /// Declares that this adapter needs synchronous first-gesture speech;
    /// the queue honours this in `addToBack` by routing through
    /// `announceImmediately` until [`Announcer::has_spoken`] flips.
    fn announce_immediately_until_speaking(&self) -> bool;

    /// Whether [`crate::alert::AlertResolver`] should gate response-packet
    /// fields on the collector's own enable state.
    fn respect_response_collector_properties(&self) -> bool;

    /// The completion event emitter: fires `(utterance, resolved_text)` when
    /// an utterance is done, successfully or not.
    fn completion(&self) -> &EventEmitter<(Utterance, Option<String>)>;
}

/// Default collision policy shared by announcers that don't need the
/// speech-synth adapter's `cancelSelf`/`cancelOther` split: strict `>` on
/// priority.
pub fn default_should_cancel_other(candidate: &Utterance, victim: &Utterance) -> bool {
    candidate.priority() > victim.priority()
}
