//! A debounced, priority-ranked announcement queue for assistive-technology
//! speech output.
//!
//! Producers push alerts ([`Alertable`] values, usually plain text) onto an
//! [`UtteranceQueue`] without needing to know whether anything is currently
//! speaking. The queue waits for each alert to sit unchanged for a short
//! stability window (coalescing rapid-fire updates into the final state),
//! then resolves it to text and hands it to an [`Announcer`] — an adapter
//! for a real output surface such as aria-live regions or a speech-synthesis
//! engine.
//!
//! # Architecture
//!
//! - **[`Utterance`]**: the alert carrier — timing knobs, a gating
//!   predicate, priority, and an announce-time gate.
//! - **[`alert`]**: the `Alertable` union and its pure text-resolution
//!   function.
//! - **[`queue`]**: the scheduling core — stability timing, the
//!   priority-collision sweep, and completion handling.
//! - **[`announcer`]**: the output-adapter trait, with `aria_live` and
//!   `speech_synth` implementations.
//! - **[`observable`]**: the small reactive cells priority/gate tracking is
//!   built on.
//! - **[`dispatch`]**: an optional `tokio`-backed tick source.

pub mod alert;
pub mod announcer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observable;
pub mod queue;
pub mod utterance;

pub use alert::{Alertable, AlertResolver, ResponseCollector, ResponsePacket};
pub use announcer::aria_live::AriaLiveAdapter;
pub use announcer::speech_synth::{SpeechPlatform, SpeechPlatformEvent, SpeechSynthAdapter, Voice};
pub use announcer::{Announcer, QueueView};
pub use config::{AnnounceConfig, AriaLiveConfig, QueueConfig, SpeechSynthConfig};
pub use error::{AnnounceError, Result};
pub use observable::{EventEmitter, Observable, Subscription};
pub use queue::UtteranceQueue;
pub use utterance::{AnnouncerOptions, Utterance, UtteranceOptions};
