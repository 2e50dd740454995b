//! Integration coverage for the `Alertable` union and `AlertResolver`
//! through the public API, including a custom `ResponseCollector` that
//! exercises the `respectResponseCollectorProperties` split between the
//! aria-live and speech-synth defaults.

use utterance_queue::{Alertable, AlertResolver, ResponseCollector, ResponsePacket, Utterance, UtteranceOptions};

/// A collector that only includes the `name` and `hint` fields, simulating
/// a host application where `object`/`context` announcements have been
/// toggled off by the user.
struct NameAndHintOnly;

impl ResponseCollector for NameAndHintOnly {
    fn collect_responses(&self, packet: &ResponsePacket, ignore_properties: bool) -> String {
        if ignore_properties {
            return [&packet.name, &packet.object, &packet.context, &packet.hint]
                .into_iter()
                .flatten()
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
        }
        [&packet.name, &packet.hint]
            .into_iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn full_packet() -> ResponsePacket {
    ResponsePacket {
        name: Some("door".into()),
        object: Some("north wall".into()),
        context: Some("living room".into()),
        hint: Some("press E to open".into()),
        ignore_properties: false,
    }
}

#[test]
fn respecting_collector_properties_narrows_the_combined_text() {
    let collector = NameAndHintOnly;
    let resolver = AlertResolver::new(&collector, true);
    let resolved = resolver.resolve(&Alertable::ResponsePacket(full_packet()));
    assert_eq!(resolved, Some("door press E to open".to_string()));
}

#[test]
fn not_respecting_collector_properties_combines_everything_regardless() {
    let collector = NameAndHintOnly;
    let resolver = AlertResolver::new(&collector, false);
    let resolved = resolver.resolve(&Alertable::ResponsePacket(full_packet()));
    assert_eq!(
        resolved,
        Some("door north wall living room press E to open".to_string())
    );
}

#[test]
fn packet_level_ignore_properties_override_wins_even_when_respecting() {
    let collector = NameAndHintOnly;
    let resolver = AlertResolver::new(&collector, true);
    let packet = ResponsePacket {
        ignore_properties: true,
        ..full_packet()
    };
    let resolved = resolver.resolve(&Alertable::ResponsePacket(packet));
    assert_eq!(
        resolved,
        Some("door north wall living room press E to open".to_string())
    );
}

#[test]
fn nested_utterance_alert_resolves_recursively() {
    let collector = NameAndHintOnly;
    let resolver = AlertResolver::new(&collector, false);
    let inner = Utterance::new(Alertable::Text("inner text".into()), UtteranceOptions::default());
    let resolved = resolver.resolve(&Alertable::Utterance(inner));
    assert_eq!(resolved, Some("inner text".to_string()));
}

#[test]
fn function_producing_a_nested_utterance_resolves_through_both_layers() {
    let collector = NameAndHintOnly;
    let resolver = AlertResolver::new(&collector, false);
    let inner = Utterance::new(Alertable::Text("deep".into()), UtteranceOptions::default());
    let f: std::rc::Rc<dyn Fn() -> Alertable> = std::rc::Rc::new(move || Alertable::Utterance(inner.clone()));
    let resolved = resolver.resolve(&Alertable::Function(f));
    assert_eq!(resolved, Some("deep".to_string()));
}
