//! The aria-live Announcer: rotates text through a small ring of
//! live-region nodes so assistive technology re-announces even identical
//! text (a single node wouldn't fire a DOM mutation event on a repeat).
//!
//! This adapter has no pending state machine: `announce` "speaks"
//! synchronously and emits completion before returning, since writing to a
//! DOM node has no meaningful async lifecycle the way a speech engine does.

use crate::announcer::{default_should_cancel_other, Announcer, QueueView};
use crate::config::AriaLiveConfig;
use crate::observable::EventEmitter;
use crate::utterance::{AnnouncerOptions, Utterance};

/// One rotating live-region slot. A real DOM binding would own an element
/// reference here; this crate models only the write/read contract, leaving
/// the actual element binding to the host application.
#[derive(Debug, Default, Clone)]
struct RegionNode {
    text: String,
}

/// A fixed-size ring of live-region nodes for one ARIA priority level
/// (`polite` or `assertive`).
struct RegionRing {
    nodes: Vec<RegionNode>,
    cursor: usize,
}

impl RegionRing {
    fn new(count: usize) -> Self {
        Self {
            nodes: vec![RegionNode::default(); count.max(1)],
            cursor: 0,
        }
    }

    /// Write `text` to the next node in rotation and advance the cursor.
    fn write(&mut self, text: &str) {
        self.nodes[self.cursor].text = text.to_owned();
        self.cursor = (self.cursor + 1) % self.nodes.len();
    }
}

/// Announcer backed by rotating `aria-live="polite"`/`aria-live="assertive"`
/// regions.
pub struct AriaLiveAdapter {
    polite: RegionRing,
    assertive: RegionRing,
    assertive_priority_threshold: f64,
    has_spoken: bool,
    completion: EventEmitter<(Utterance, Option<String>)>,
}

impl AriaLiveAdapter {
    /// Build the adapter from config. `assertive_priority_threshold` selects
    /// which ring an utterance's priority routes to: priorities strictly
    /// above the threshold use the assertive ring, everything else uses the
    /// polite ring. Default `1.0` matches `Utterance`'s default priority, so
    /// most utterances land on the polite ring unless explicitly raised.
    pub fn new(config: &AriaLiveConfig) -> Self {
        Self {
            polite: RegionRing::new(config.regions_per_priority),
            assertive: RegionRing::new(config.regions_per_priority),
            assertive_priority_threshold: 1.0,
            has_spoken: false,
            completion: EventEmitter::new(),
        }
    }

    /// Override which priority value routes to the assertive ring.
    pub fn with_assertive_threshold(mut self, threshold: f64) -> Self {
        self.assertive_priority_threshold = threshold;
        self
    }

    fn ring_for(&mut self, priority: f64) -> &mut RegionRing {
        if priority > self.assertive_priority_threshold {
            &mut self.assertive
        } else {
            &mut self.polite
        }
    }
}

impl Announcer for AriaLiveAdapter {
    fn announce(&mut self, utterance: &Utterance, text: &str, _options: &AnnouncerOptions) {
        let priority = utterance.priority();
        self.ring_for(priority).write(text);
        self.has_spoken = true;
        tracing::debug!(text, "aria-live wrote region");
        self.completion
            .emit(&(utterance.clone(), Some(text.to_owned())));
    }

    fn cancel(&mut self) {
        // A live-region write cannot be retracted once emitted; there is
        // nothing to interrupt.
    }

    fn cancel_utterance(&mut self, _utterance: &Utterance) {}

    fn should_utterance_cancel_other(&self, candidate: &Utterance, victim: &Utterance) -> bool {
        default_should_cancel_other(candidate, victim)
    }

    fn on_utterance_priority_change(&mut self, _front: Option<&Utterance>) {
        // Nothing announcing to interrupt; the queue's own prioritisation
        // sweep already reordered the queue.
    }

    fn step(&mut self, _dt_ms: f64, _queue: &QueueView) {
        // No engine-health workarounds for a synchronous DOM write.
    }

    fn ready_to_announce(&self) -> bool {
        true
    }

    fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    fn announce_immediately_until_speaking(&self) -> bool {
        false
    }

    fn respect_response_collector_properties(&self) -> bool {
        false
    }

    fn completion(&self) -> &EventEmitter<(Utterance, Option<String>)> {
        &self.completion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Alertable;
    use crate::utterance::UtteranceOptions;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn utterance(text: &str, priority: f64) -> Utterance {
        let u = Utterance::new(Alertable::Text(text.to_owned()), UtteranceOptions::default());
        u.set_priority(priority);
        u
    }

    #[test]
    fn announce_writes_and_completes_synchronously() {
        let mut adapter = AriaLiveAdapter::new(&AriaLiveConfig::default());
        let u = utterance("hello", 1.0);
        let completed = Rc::new(RefCell::new(Vec::new()));
        let completed2 = Rc::clone(&completed);
        let _sub = adapter
            .completion()
            .subscribe(move |(_, text)| completed2.borrow_mut().push(text.clone()));

        adapter.announce(&u, "hello", &u.announcer_options());
        assert_eq!(*completed.borrow(), vec![Some("hello".to_string())]);
        assert!(adapter.has_spoken());
    }

    #[test]
    fn high_priority_routes_to_assertive_ring() {
        let mut adapter = AriaLiveAdapter::new(&AriaLiveConfig {
            regions_per_priority: 2,
            ..AriaLiveConfig::default()
        });
        let low = utterance("low", 1.0);
        let high = utterance("high", 5.0);

        adapter.announce(&low, "low", &low.announcer_options());
        adapter.announce(&high, "high", &high.announcer_options());

        assert_eq!(adapter.polite.nodes[0].text, "low");
        assert_eq!(adapter.assertive.nodes[0].text, "high");
    }

    #[test]
    fn ring_rotates_through_all_nodes() {
        let mut adapter = AriaLiveAdapter::new(&AriaLiveConfig {
            regions_per_priority: 2,
            ..AriaLiveConfig::default()
        });
        let a = utterance("a", 1.0);
        let b = utterance("b", 1.0);
        let c = utterance("c", 1.0);

        adapter.announce(&a, "a", &a.announcer_options());
        adapter.announce(&b, "b", &b.announcer_options());
        adapter.announce(&c, "c", &c.announcer_options());

        assert_eq!(adapter.polite.nodes[0].text, "c");
        assert_eq!(adapter.polite.nodes[1].text, "b");
    }
}
