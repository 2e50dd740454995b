//! [`Utterance`]: the alert carrier.

use crate::alert::Alertable;
use crate::observable::{Observable, Subscription};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Default stability delay (ms).
pub const DEFAULT_STABLE_DELAY_MS: u32 = 200;

/// Announcer-specific option bag threaded through to the Announcer
/// alongside the Utterance it belongs to. `cancel_self`/`cancel_other`
/// drive the speech-synth collision protocol; `extra` is an opaque,
/// adapter-specific payload (e.g. aria-live priority, SSML hints).
#[derive(Debug, Clone)]
pub struct AnnouncerOptions {
    /// If the announcing Utterance is the same instance as the new one,
    /// cancel and restart. Default `true`.
    pub cancel_self: bool,
    /// If equal-priority Utterances collide, the new one cancels the old.
    /// Default `true`.
    pub cancel_other: bool,
    /// Opaque, adapter-specific extension payload.
    pub extra: serde_json::Value,
}

impl Default for AnnouncerOptions {
    fn default() -> Self {
        Self {
            cancel_self: true,
            cancel_other: true,
            extra: serde_json::Value::Null,
        }
    }
}

/// Construction-time options for an [`Utterance`].
pub struct UtteranceOptions {
    /// Gating function, re-evaluated at announce time.
    pub predicate: Box<dyn Fn() -> bool>,
    /// Minimum time (ms) the utterance must sit unchanged at its slot
    /// before it may be announced.
    pub alert_stable_delay_ms: u32,
    /// Hard ceiling (ms) after which stability is waived. `None` = unbounded.
    pub alert_maximum_delay_ms: Option<u32>,
    /// Initial priority.
    pub priority: f64,
    /// Announcer-specific option bag.
    pub announcer_options: AnnouncerOptions,
}

impl Default for UtteranceOptions {
    fn default() -> Self {
        Self {
            predicate: Box::new(|| true),
            alert_stable_delay_ms: DEFAULT_STABLE_DELAY_MS,
            alert_maximum_delay_ms: None,
            priority: 1.0,
            announcer_options: AnnouncerOptions::default(),
        }
    }
}

struct UtteranceInner {
    alert: RefCell<Alertable>,
    predicate: RefCell<Box<dyn Fn() -> bool>>,
    alert_stable_delay_ms: Cell<u32>,
    alert_maximum_delay_ms: Cell<Option<u32>>,
    priority: Observable<OrderedF64>,
    gates: RefCell<Vec<Observable<bool>>>,
    announcer_options: RefCell<AnnouncerOptions>,
}

/// `f64` newtype with a total-enough `PartialEq` for [`Observable`]'s
/// change detection (priority values in practice are never NaN).
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedF64(f64);

/// The alert carrier object: timing knobs, predicate, priority, and gate.
/// Identity is by instance reference — cloning an `Utterance` clones
/// the handle, not the data; two handles are the same Utterance iff
/// [`Utterance::same_instance`] is true.
#[derive(Clone)]
pub struct Utterance(Rc<UtteranceInner>);

impl Utterance {
    /// Create a new Utterance wrapping the given alertable.
    pub fn new(alert: impl Into<Alertable>, options: UtteranceOptions) -> Self {
        Self(Rc::new(UtteranceInner {
            alert: RefCell::new(alert.into()),
            predicate: RefCell::new(options.predicate),
            alert_stable_delay_ms: Cell::new(options.alert_stable_delay_ms),
            alert_maximum_delay_ms: Cell::new(options.alert_maximum_delay_ms),
            priority: Observable::new(OrderedF64(options.priority)),
            gates: RefCell::new(Vec::new()),
            announcer_options: RefCell::new(options.announcer_options),
        }))
    }

    /// Convenience constructor using default options.
    pub fn from_alertable(alert: impl Into<Alertable>) -> Self {
        Self::new(alert, UtteranceOptions::default())
    }

    /// Whether `self` and `other` are the same Utterance instance.
    pub fn same_instance(&self, other: &Utterance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The carried alertable.
    pub fn alert(&self) -> Alertable {
        self.0.alert.borrow().clone()
    }

    /// Replace the carried alertable.
    pub fn set_alert(&self, alert: impl Into<Alertable>) {
        *self.0.alert.borrow_mut() = alert.into();
    }

    /// Evaluate the gating predicate.
    pub fn predicate(&self) -> bool {
        (self.0.predicate.borrow())()
    }

    /// Replace the gating predicate.
    pub fn set_predicate(&self, predicate: impl Fn() -> bool + 'static) {
        *self.0.predicate.borrow_mut() = Box::new(predicate);
    }

    /// Minimum stable-delay (ms).
    pub fn stable_delay_ms(&self) -> u32 {
        self.0.alert_stable_delay_ms.get()
    }

    /// Set the minimum stable-delay (ms).
    pub fn set_stable_delay_ms(&self, ms: u32) {
        self.0.alert_stable_delay_ms.set(ms);
    }

    /// Hard ceiling (ms) after which stability is waived, if any.
    pub fn maximum_delay_ms(&self) -> Option<u32> {
        self.0.alert_maximum_delay_ms.get()
    }

    /// Set the hard ceiling (ms), or `None` for unbounded.
    pub fn set_maximum_delay_ms(&self, ms: Option<u32>) {
        self.0.alert_maximum_delay_ms.set(ms);
    }

    /// Current priority.
    pub fn priority(&self) -> f64 {
        self.0.priority.get().0
    }

    /// Set the priority. Triggers priority-change listeners synchronously
    /// if the value actually changed.
    pub fn set_priority(&self, value: f64) {
        self.0.priority.set(OrderedF64(value));
    }

    /// Subscribe to priority changes. Returns a [`Subscription`] guard.
    pub fn subscribe_priority(&self, mut listener: impl FnMut(f64) + 'static) -> Subscription {
        self.0.priority.subscribe(move |v| listener(v.0))
    }

    /// Register a can-announce gate observable. The conjunction of all
    /// registered gates (true if none registered) is a second announce-time
    /// condition independent of `predicate`; a transition to `false` while
    /// announcing is an interrupt signal.
    pub fn add_can_announce_gate(&self, gate: Observable<bool>) {
        self.0.gates.borrow_mut().push(gate);
    }

    /// The conjunction of all registered can-announce gates (`true` if none
    /// are registered).
    pub fn can_announce(&self) -> bool {
        self.0.gates.borrow().iter().all(|g| g.get())
    }

    /// Subscribe to every registered can-announce gate. Used by the
    /// speech-synth adapter to detect a mid-announcement interrupt signal.
    /// Returns one [`Subscription`] per gate.
    pub fn subscribe_can_announce(
        &self,
        mut listener: impl FnMut(bool) + 'static,
    ) -> Vec<Subscription> {
        let utterance = self.clone();
        self.0
            .gates
            .borrow()
            .iter()
            .map(|gate| {
                let utterance = utterance.clone();
                gate.subscribe(move |_| listener(utterance.can_announce()))
            })
            .collect()
    }

    /// The announcer-specific option bag.
    pub fn announcer_options(&self) -> AnnouncerOptions {
        self.0.announcer_options.borrow().clone()
    }

    /// Replace the announcer-specific option bag.
    pub fn set_announcer_options(&self, options: AnnouncerOptions) {
        *self.0.announcer_options.borrow_mut() = options;
    }
}

impl std::fmt::Debug for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utterance")
            .field("ptr", &Rc::as_ptr(&self.0))
            .field("priority", &self.priority())
            .field("stable_delay_ms", &self.stable_delay_ms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_utterance_has_documented_defaults() {
        let u = Utterance::from_alertable("hello");
        assert_eq!(u.stable_delay_ms(), 200);
        assert_eq!(u.maximum_delay_ms(), None);
        assert!(u.predicate());
        assert!(u.can_announce());
        assert!(u.announcer_options().cancel_self);
        assert!(u.announcer_options().cancel_other);
    }

    #[test]
    fn same_instance_is_reference_identity() {
        let u1 = Utterance::from_alertable("a");
        let u2 = u1.clone();
        let u3 = Utterance::from_alertable("a");
        assert!(u1.same_instance(&u2));
        assert!(!u1.same_instance(&u3));
    }

    #[test]
    fn priority_change_notifies_subscribers() {
        let u = Utterance::from_alertable("a");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let _sub = u.subscribe_priority(move |p| seen2.borrow_mut().push(p));
        u.set_priority(5.0);
        u.set_priority(5.0); // no-op, unchanged
        u.set_priority(2.0);
        assert_eq!(*seen.borrow(), vec![5.0, 2.0]);
    }

    #[test]
    fn can_announce_is_conjunction_of_gates() {
        let u = Utterance::from_alertable("a");
        assert!(u.can_announce());

        let gate_a = Observable::new(true);
        let gate_b = Observable::new(true);
        u.add_can_announce_gate(gate_a.clone());
        u.add_can_announce_gate(gate_b.clone());
        assert!(u.can_announce());

        gate_b.set(false);
        assert!(!u.can_announce());

        gate_b.set(true);
        assert!(u.can_announce());
    }

    #[test]
    fn gate_transition_to_false_notifies_listener() {
        let u = Utterance::from_alertable("a");
        let gate = Observable::new(true);
        u.add_can_announce_gate(gate.clone());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let _subs = u.subscribe_can_announce(move |can| seen2.borrow_mut().push(can));

        gate.set(false);
        assert_eq!(*seen.borrow(), vec![false]);
    }
}
