//! [`UtteranceQueue`]: the scheduling core.
//!
//! The queue owns a single `Announcer`, a FIFO-ordered set of pending
//! entries, and at most one "announcing" slot. It is driven by two inputs:
//! callers adding/removing Utterances, and an external tick source calling
//! [`UtteranceQueue::step`]. Everything else — stability timing, the
//! priority-collision sweep, and completion handling — happens synchronously
//! inside those two entry points.
//!
//! Reentrancy discipline: no method here ever calls into the `Announcer`
//! while holding a borrow of [`QueueState`]. An Announcer's `announce`,
//! `cancel`, or `step` may synchronously emit a completion event (some
//! backends, like the aria-live adapter, always do), which re-enters this
//! module's own completion handler — so every call out first extracts what
//! it needs, drops its borrow, and only then calls out.

use crate::alert::{Alertable, DefaultResponseCollector, ResponseCollector};
use crate::announcer::{Announcer, QueueView};
use crate::config::QueueConfig;
use crate::observable::Subscription;
use crate::utterance::{Utterance, UtteranceOptions};
use std::cell::RefCell;
use std::rc::Rc;

struct QueueEntry {
    utterance: Utterance,
    time_in_queue_ms: f64,
    stable_time_ms: f64,
    seq: u64,
    _in_queue_sub: Option<Subscription>,
}

struct AnnouncingSlot {
    utterance: Utterance,
    _priority_sub: Subscription,
}

struct QueueState {
    entries: Vec<QueueEntry>,
    announcing: Option<AnnouncingSlot>,
    next_seq: u64,
    muted: bool,
    enabled: bool,
    announcer: Rc<RefCell<dyn Announcer>>,
    response_collector: Rc<dyn ResponseCollector>,
    config: QueueConfig,
    _completion_sub: Option<Subscription>,
}

type Shared = Rc<RefCell<QueueState>>;

/// The scheduling core: a debounced, priority-ranked announcement queue.
/// Cloning an `UtteranceQueue` clones the handle; all clones share the
/// same underlying state.
#[derive(Clone)]
pub struct UtteranceQueue(Shared);

impl UtteranceQueue {
    /// Build a queue around an Announcer, using the default response
    /// collector (all `ResponsePacket` fields always combined).
    pub fn new(announcer: Rc<RefCell<dyn Announcer>>, config: QueueConfig) -> Self {
        Self::with_response_collector(announcer, config, Rc::new(DefaultResponseCollector))
    }

    /// Build a queue around an Announcer and a custom response collector.
    pub fn with_response_collector(
        announcer: Rc<RefCell<dyn Announcer>>,
        config: QueueConfig,
        response_collector: Rc<dyn ResponseCollector>,
    ) -> Self {
        let state = Rc::new(RefCell::new(QueueState {
            entries: Vec::new(),
            announcing: None,
            next_seq: 0,
            muted: false,
            enabled: true,
            announcer: Rc::clone(&announcer),
            response_collector,
            config,
            _completion_sub: None,
        }));

        let weak = Rc::downgrade(&state);
        let sub = announcer.borrow().completion().subscribe(move |(utterance, text)| {
            if let Some(state) = weak.upgrade() {
                handle_completion(&state, utterance, text.clone());
            }
        });
        state.borrow_mut()._completion_sub = Some(sub);

        Self(state)
    }

    /// Wrap a bare alertable in a fresh Utterance using this queue's
    /// configured defaults, or pass an existing Utterance through unchanged.
    fn wrap(&self, alertable: impl Into<Alertable>) -> Utterance {
        match alertable.into() {
            Alertable::Utterance(u) => u,
            other => {
                let config = self.0.borrow().config.clone();
                Utterance::new(
                    other,
                    UtteranceOptions {
                        alert_stable_delay_ms: config.default_stable_delay_ms,
                        alert_maximum_delay_ms: config.default_maximum_delay_ms,
                        ..UtteranceOptions::default()
                    },
                )
            }
        }
    }

    /// Append an alertable to the back of the queue, running the
    /// prioritisation sweep immediately. No-op if the queue is
    /// disabled. If the Announcer declares
    /// [`Announcer::announce_immediately_until_speaking`] and hasn't spoken
    /// yet, this routes through [`UtteranceQueue::announce_immediately`]
    /// instead.
    pub fn add_to_back(&self, alertable: impl Into<Alertable>) -> Option<Utterance> {
        if !self.enabled() {
            return None;
        }
        let utterance = self.wrap(alertable);

        let (announce_immediately_flag, has_spoken) = {
            let announcer = self.0.borrow().announcer.clone();
            let a = announcer.borrow();
            (a.announce_immediately_until_speaking(), a.has_spoken())
        };
        if announce_immediately_flag && !has_spoken {
            return self.announce_immediately(utterance);
        }

        upsert(&self.0, utterance.clone(), false, true, None);
        reprioritize(&self.0, &utterance);
        Some(utterance)
    }

    /// Deprecated: insert directly at the front of the queue without
    /// attaching a priority subscription, then run the prioritisation sweep.
    /// Prefer `add_to_back` with an explicit high priority.
    #[deprecated(note = "prefer add_to_back with an explicit priority")]
    pub fn add_to_front(&self, alertable: impl Into<Alertable>) -> Option<Utterance> {
        if !self.enabled() {
            return None;
        }
        let utterance = self.wrap(alertable);
        upsert(&self.0, utterance.clone(), true, false, None);
        reprioritize(&self.0, &utterance);
        Some(utterance)
    }

    /// Unshift to the front with unbounded stability (`timeInQueue` and
    /// `stableTime` both `+infinity`), run the prioritisation sweep, and
    /// attempt to announce synchronously if the entry survives it.
    pub fn announce_immediately(&self, alertable: impl Into<Alertable>) -> Option<Utterance> {
        if !self.enabled() {
            return None;
        }
        let utterance = self.wrap(alertable);
        upsert(&self.0, utterance.clone(), true, true, Some(f64::INFINITY));
        {
            let mut st = self.0.borrow_mut();
            if let Some(entry) = st
                .entries
                .iter_mut()
                .find(|e| e.utterance.same_instance(&utterance))
            {
                entry.stable_time_ms = f64::INFINITY;
            }
        }
        reprioritize(&self.0, &utterance);
        if self.has_utterance(&utterance) {
            attempt_announce(&self.0, &utterance);
        }
        Some(utterance)
    }

    /// Remove every queue entry for this Utterance, detaching its in-queue
    /// priority subscription. Leaves the announcing slot untouched.
    pub fn remove_utterance(&self, utterance: &Utterance) {
        remove_entry(&self.0, utterance);
    }

    /// Delegate cancellation of a specific Utterance to the Announcer.
    /// Queue state is untouched; the announcing slot clears only once the
    /// Announcer's own completion event arrives.
    pub fn cancel_utterance(&self, utterance: &Utterance) {
        let announcer = self.0.borrow().announcer.clone();
        announcer.borrow_mut().cancel_utterance(utterance);
    }

    /// Detach every in-queue subscription and empty the queue. Does not
    /// touch whatever is currently announcing.
    pub fn clear(&self) {
        self.0.borrow_mut().entries.clear();
    }

    /// [`UtteranceQueue::clear`], then delegate to [`Announcer::cancel`].
    pub fn cancel(&self) {
        self.clear();
        let announcer = self.0.borrow().announcer.clone();
        announcer.borrow_mut().cancel();
    }

    /// Whether this Utterance currently has an entry in the queue (not
    /// counting the announcing slot).
    pub fn has_utterance(&self, utterance: &Utterance) -> bool {
        self.0
            .borrow()
            .entries
            .iter()
            .any(|e| e.utterance.same_instance(utterance))
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    /// Whether the queue has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    /// The Utterance currently in the announcing slot, if any.
    pub fn current_utterance(&self) -> Option<Utterance> {
        self.0.borrow().announcing.as_ref().map(|s| s.utterance.clone())
    }

    /// Whether the queue is muted. A muted queue still times out and drops
    /// entries, it just never actually announces them.
    pub fn muted(&self) -> bool {
        self.0.borrow().muted
    }

    /// Set whether the queue is muted.
    pub fn set_muted(&self, muted: bool) {
        self.0.borrow_mut().muted = muted;
    }

    /// Whether the queue accepts new entries and advances on `step`.
    pub fn enabled(&self) -> bool {
        self.0.borrow().enabled
    }

    /// Set whether the queue is enabled. `add_to_back`/`add_to_front`/
    /// `announce_immediately` become no-ops while disabled; `step` also
    /// becomes a no-op.
    pub fn set_enabled(&self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }

    /// Advance the queue by `dt_secs` seconds: age every entry, then
    /// attempt to announce the *front* entry if it has become stable or hit
    /// its maximum delay. A non-stable front entry holds up the rest of the
    /// queue — later entries are not scanned past it this tick even if they
    /// would themselves be stable — and becomes a candidate again on a
    /// future tick once it stabilises. Finally, give the Announcer a chance
    /// to run its own per-tick maintenance.
    pub fn step(&self, dt_secs: f64) {
        let _span = tracing::info_span!("utterance_queue_step", dt_secs).entered();
        if !self.enabled() {
            return;
        }
        let dt_ms = dt_secs * 1000.0;

        let candidate = {
            let mut st = self.0.borrow_mut();
            for entry in st.entries.iter_mut() {
                entry.time_in_queue_ms += dt_ms;
                entry.stable_time_ms += dt_ms;
                tracing::trace!(
                    time_in_queue_ms = entry.time_in_queue_ms,
                    stable_time_ms = entry.stable_time_ms,
                    "entry aged"
                );
            }
            st.entries
                .first()
                .filter(|e| {
                    e.stable_time_ms >= e.utterance.stable_delay_ms() as f64
                        || e.utterance
                            .maximum_delay_ms()
                            .map(|max| e.time_in_queue_ms >= max as f64)
                            .unwrap_or(false)
                })
                .map(|e| e.utterance.clone())
        };

        if let Some(utterance) = candidate {
            attempt_announce(&self.0, &utterance);
        }

        let (entries_snapshot, announcer) = {
            let st = self.0.borrow();
            (
                st.entries.iter().map(|e| e.utterance.clone()).collect::<Vec<_>>(),
                st.announcer.clone(),
            )
        };
        let view = QueueView::new(entries_snapshot);
        {
            let _span = tracing::info_span!("announcer_step", dt_ms).entered();
            announcer.borrow_mut().step(dt_ms, &view);
        }
    }
}

/// Insert (or replace the existing entry for) `utterance`, carrying forward
/// its prior `timeInQueue` per invariant 1. Does not call into the
/// Announcer.
fn upsert(
    state: &Shared,
    utterance: Utterance,
    at_front: bool,
    attach_priority_sub: bool,
    force_time_in_queue_ms: Option<f64>,
) {
    let mut st = state.borrow_mut();
    let prior_time_ms = st
        .entries
        .iter()
        .find(|e| e.utterance.same_instance(&utterance))
        .map(|e| e.time_in_queue_ms);
    st.entries.retain(|e| !e.utterance.same_instance(&utterance));

    let time_in_queue_ms = force_time_in_queue_ms.unwrap_or(prior_time_ms.unwrap_or(0.0));
    let seq = st.next_seq;
    st.next_seq += 1;

    let sub = if attach_priority_sub {
        let weak = Rc::downgrade(state);
        let seed = utterance.clone();
        Some(utterance.subscribe_priority(move |_| {
            if let Some(state) = weak.upgrade() {
                reprioritize(&state, &seed);
            }
        }))
    } else {
        None
    };

    let entry = QueueEntry {
        utterance,
        time_in_queue_ms,
        stable_time_ms: 0.0,
        seq,
        _in_queue_sub: sub,
    };
    if at_front {
        st.entries.insert(0, entry);
    } else {
        st.entries.push(entry);
    }
}

/// Remove every entry matching `utterance`. Dropping its `QueueEntry` also
/// drops its in-queue priority [`Subscription`], if any.
fn remove_entry(state: &Shared, utterance: &Utterance) {
    state
        .borrow_mut()
        .entries
        .retain(|e| !e.utterance.same_instance(utterance));
}

/// The priority-collision sweep: run whenever a tracked Utterance's
/// priority changes, or right after it's inserted.
fn reprioritize(state: &Shared, seed: &Utterance) {
    sweep_towards_front(state, seed);
    check_successor_cancels_seed(state, seed);
    notify_front_changed(state);
    debug_assert_fifo_insertion_order(state);
}

/// Debug-only sanity check that queue order still agrees with insertion
/// sequence numbers wherever priorities tie — the sweep never reorders
/// entries directly, it only removes them, so insertion order (and the
/// `seq` each entry was stamped with on arrival) must remain monotonic.
fn debug_assert_fifo_insertion_order(state: &Shared) {
    #[cfg(debug_assertions)]
    {
        let st = state.borrow();
        debug_assert!(
            st.entries.windows(2).all(|w| w[0].seq < w[1].seq),
            "queue entries out of insertion order"
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = state;
    }
}

/// Step 2: walking from the entry immediately before `seed` towards the
/// front, remove every older entry the Announcer says `seed` should cancel.
fn sweep_towards_front(state: &Shared, seed: &Utterance) {
    let (older, announcer) = {
        let st = state.borrow();
        let older = match st.entries.iter().position(|e| e.utterance.same_instance(seed)) {
            Some(idx) => st.entries[..idx].iter().map(|e| e.utterance.clone()).collect::<Vec<_>>(),
            None => Vec::new(),
        };
        (older, st.announcer.clone())
    };
    for victim in older.iter().rev() {
        let should_cancel = announcer.borrow().should_utterance_cancel_other(seed, victim);
        if should_cancel {
            remove_entry(state, victim);
        }
    }
}

/// Step 3: if `seed` is still queued, ask its single immediate successor
/// whether it should cancel `seed`.
fn check_successor_cancels_seed(state: &Shared, seed: &Utterance) {
    let (successor, announcer) = {
        let st = state.borrow();
        let successor = st
            .entries
            .iter()
            .position(|e| e.utterance.same_instance(seed))
            .and_then(|idx| st.entries.get(idx + 1))
            .map(|e| e.utterance.clone());
        (successor, st.announcer.clone())
    };
    if let Some(successor) = successor {
        let should_cancel = announcer.borrow().should_utterance_cancel_other(&successor, seed);
        if should_cancel {
            remove_entry(state, seed);
        }
    }
}

/// Step 4: if the queue is non-empty, tell the Announcer the front entry may
/// have changed so it can interrupt whatever it's currently announcing.
fn notify_front_changed(state: &Shared) {
    let (front, announcer) = {
        let st = state.borrow();
        (st.entries.first().map(|e| e.utterance.clone()), st.announcer.clone())
    };
    if front.is_some() {
        announcer.borrow_mut().on_utterance_priority_change(front.as_ref());
    }
}

/// The attempt-to-announce procedure: if the Announcer is ready and
/// `utterance` is still queued, resolve its text, drop it silently if muted,
/// gated off, or empty, otherwise move it into the announcing slot and hand
/// it to the Announcer.
fn attempt_announce(state: &Shared, utterance: &Utterance) -> bool {
    let (queued, muted, collector, announcer) = {
        let st = state.borrow();
        let queued = st.entries.iter().any(|e| e.utterance.same_instance(utterance));
        (queued, st.muted, st.response_collector.clone(), st.announcer.clone())
    };
    if !queued {
        return false;
    }

    let ready = announcer.borrow().ready_to_announce();
    if !ready {
        return false;
    }

    // The can-announce gate is a temporary condition (a modal open, a focus
    // change) re-evaluated on every attempt; while it's closed the entry
    // just waits for a later tick instead of being discarded.
    if !utterance.can_announce() {
        tracing::debug!("utterance held: can-announce gate is closed");
        return false;
    }

    let respect = announcer.borrow().respect_response_collector_properties();
    let resolver = crate::alert::AlertResolver::new(collector.as_ref(), respect);
    let resolved = resolver.resolve(&utterance.alert());
    let predicate_ok = utterance.predicate();

    let text = match resolved {
        Some(text) if !muted && predicate_ok && !text.is_empty() => text,
        _ => {
            remove_entry(state, utterance);
            tracing::debug!(muted, predicate_ok, "utterance dropped without announcement");
            return false;
        }
    };

    remove_entry(state, utterance);

    let weak = Rc::downgrade(state);
    let seed = utterance.clone();
    let priority_sub = utterance.subscribe_priority(move |_| {
        if let Some(state) = weak.upgrade() {
            reprioritize(&state, &seed);
        }
    });
    {
        let mut st = state.borrow_mut();
        st.announcing = Some(AnnouncingSlot {
            utterance: utterance.clone(),
            _priority_sub: priority_sub,
        });
    }

    tracing::debug!(text, "announcing utterance");
    let options = utterance.announcer_options();
    announcer.borrow_mut().announce(utterance, &text, &options);

    // `announce` may have synchronously completed and re-triggered queue
    // mutations (e.g. a listener re-adding this same utterance); if it has
    // reappeared in the queue, remove it again.
    remove_entry(state, utterance);
    true
}

/// The Announcer's completion-event handler: clear the announcing
/// slot, but only if it's still this same Utterance (an Announcer may be
/// shared by more than one queue, or may fire stale events after a forced
/// cancel already cleared the slot).
fn handle_completion(state: &Shared, utterance: &Utterance, _text: Option<String>) {
    let matches = state
        .borrow()
        .announcing
        .as_ref()
        .map(|slot| slot.utterance.same_instance(utterance))
        .unwrap_or(false);
    if matches {
        state.borrow_mut().announcing = None;
    }
}
