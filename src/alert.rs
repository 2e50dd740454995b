//! The `Alertable` union and the pure text-resolution function.

use crate::utterance::Utterance;
use std::rc::Rc;

/// A packet of structured response fields, resolved into text by a
/// [`ResponseCollector`] at announce time.
///
/// The response-collector and response-pattern machinery that actually
/// combines these fields is an external collaborator; this crate only
/// models the interface it needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePacket {
    /// Name field (e.g. the subject of the alert).
    pub name: Option<String>,
    /// Object field (e.g. the thing acted upon).
    pub object: Option<String>,
    /// Context field (e.g. surrounding state).
    pub context: Option<String>,
    /// Hint field (e.g. what to do next).
    pub hint: Option<String>,
    /// Override: when true, all four fields are combined regardless of the
    /// collector's own enable observables.
    pub ignore_properties: bool,
}

/// Any value the queue knows how to turn into text.
///
/// Modelled as a tagged variant rather than requiring subtype inheritance:
/// the resolver below is a single exhaustive match.
#[derive(Clone)]
pub enum Alertable {
    /// No alert; resolves to no text and is silently dropped.
    Null,
    /// Literal text.
    Text(String),
    /// Literal number, stringified at resolve time.
    Number(f64),
    /// A function producing another `Alertable`, called at announce time.
    Function(Rc<dyn Fn() -> Alertable>),
    /// A structured response packet, combined by a [`ResponseCollector`].
    ResponsePacket(ResponsePacket),
    /// Another Utterance; its own `alert` is resolved recursively.
    Utterance(Utterance),
}

impl std::fmt::Debug for Alertable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Alertable::Null"),
            Self::Text(s) => write!(f, "Alertable::Text({s:?})"),
            Self::Number(n) => write!(f, "Alertable::Number({n})"),
            Self::Function(_) => write!(f, "Alertable::Function(..)"),
            Self::ResponsePacket(p) => write!(f, "Alertable::ResponsePacket({p:?})"),
            Self::Utterance(_) => write!(f, "Alertable::Utterance(..)"),
        }
    }
}

impl From<&str> for Alertable {
    fn from(s: &str) -> Self {
        Alertable::Text(s.to_owned())
    }
}

impl From<String> for Alertable {
    fn from(s: String) -> Self {
        Alertable::Text(s)
    }
}

impl From<f64> for Alertable {
    fn from(n: f64) -> Self {
        Alertable::Number(n)
    }
}

impl From<Utterance> for Alertable {
    fn from(u: Utterance) -> Self {
        Alertable::Utterance(u)
    }
}

/// Gates which `ResponsePacket` fields are combined.
///
/// A real response collector additionally maintains four boolean
/// observables (name/object/context/hint enabled) and a pattern table for
/// phrasing; that machinery is external. This trait is the queue's only
/// contact point with it.
pub trait ResponseCollector {
    /// Combine a packet's fields into final text, honoring per-field enable
    /// state unless `packet.ignore_properties` or the caller's
    /// `ignore_properties` override is set.
    fn collect_responses(&self, packet: &ResponsePacket, ignore_properties: bool) -> String;
}

/// A collector with all four fields always enabled, joining them with a
/// single space. Sufficient to exercise [`AlertResolver`] without pulling in
/// a real pattern-table implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseCollector;

impl ResponseCollector for DefaultResponseCollector {
    fn collect_responses(&self, packet: &ResponsePacket, _ignore_properties: bool) -> String {
        [&packet.name, &packet.object, &packet.context, &packet.hint]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolves any [`Alertable`] into its final text at announce time.
///
/// `respect_response_collector_properties` threads through to the collector:
/// the aria-live adapter defaults this to `false` (combine everything), the
/// speech-synth adapter defaults it to `true` (gate on collector state).
pub struct AlertResolver<'a> {
    collector: &'a dyn ResponseCollector,
    respect_response_collector_properties: bool,
}

impl<'a> AlertResolver<'a> {
    /// Create a resolver bound to a response collector.
    pub fn new(collector: &'a dyn ResponseCollector, respect_response_collector_properties: bool) -> Self {
        Self {
            collector,
            respect_response_collector_properties,
        }
    }

    /// Resolve an [`Alertable`] to its final text, or `None` if it resolves
    /// to no text (null, or a function/utterance chain bottoming out in
    /// null).
    pub fn resolve(&self, alertable: &Alertable) -> Option<String> {
        match alertable {
            Alertable::Null => None,
            Alertable::Text(s) => Some(s.clone()),
            Alertable::Number(n) => Some(n.to_string()),
            Alertable::Function(f) => self.resolve(&f()),
            Alertable::ResponsePacket(packet) => {
                let ignore = !self.respect_response_collector_properties || packet.ignore_properties;
                let text = self.collector.collect_responses(packet, ignore);
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            Alertable::Utterance(u) => self.resolve(&u.alert()),
        }
    }
}
