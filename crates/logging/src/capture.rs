//! Capture rendered tracing events.
//!
//! [`capture`] runs a closure under a thread-local subscriber whose only layer
//! renders each event with [`crate::fmt::render_event`] and sends it down a
//! channel. It is used by tests that assert a misconfiguration was logged.
//!
//! A process-wide sink is also available: install [`layer`] in the global
//! subscriber and call [`set_sink`] to start receiving events, [`clear_sink`]
//! to stop. The layer no-ops while no sink is set.

use std::sync::OnceLock;

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;
use tracing::{Event, Level, Subscriber, subscriber};
use tracing_subscriber::{
    layer::{Context, Layer},
    prelude::*,
    registry,
};

use crate::fmt::{RenderedLog, render_event};

/// The global sink, when one is set.
static LOG_SINK: OnceLock<Mutex<Option<Sender<RenderedLog>>>> = OnceLock::new();

/// Access the global sink.
fn sink() -> &'static Mutex<Option<Sender<RenderedLog>>> {
    LOG_SINK.get_or_init(|| Mutex::new(None))
}

/// Start forwarding events seen by [`layer`] to `tx`.
pub fn set_sink(tx: Sender<RenderedLog>) {
    *sink().lock() = Some(tx);
}

/// Stop forwarding.
pub fn clear_sink() {
    *sink().lock() = None;
}

/// Where a [`CaptureLayer`] sends events.
enum Target {
    /// A channel owned by this layer.
    Local(Sender<RenderedLog>),
    /// Whatever [`set_sink`] installed.
    Global,
}

/// Tracing layer that renders events and sends them to a channel.
pub struct CaptureLayer {
    /// Destination.
    target: Target,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let tx = match &self.target {
            Target::Local(tx) => tx.clone(),
            Target::Global => {
                let tx_opt = { sink().lock().clone() };
                let Some(tx) = tx_opt else { return };
                tx
            }
        };
        if tx.send(render_event(event)).is_err() && matches!(self.target, Target::Global) {
            // Receiver went away; clear to avoid repeated work.
            clear_sink();
        }
    }
}

/// Layer forwarding to the global sink.
pub fn layer() -> CaptureLayer {
    CaptureLayer {
        target: Target::Global,
    }
}

/// Everything logged while a closure ran.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    /// Events in emission order.
    pub events: Vec<RenderedLog>,
}

impl Captured {
    /// Events at `level`.
    pub fn at(&self, level: Level) -> Vec<&RenderedLog> {
        let level = level.to_string();
        self.events.iter().filter(|e| e.level == level).collect()
    }

    /// Warnings.
    pub fn warnings(&self) -> Vec<&RenderedLog> {
        self.at(Level::WARN)
    }

    /// True when some event's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.message.contains(needle))
    }
}

/// Run `f` with every event on this thread captured.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Captured) {
    let (tx, rx) = unbounded();
    let subscriber = registry().with(CaptureLayer {
        target: Target::Local(tx),
    });
    let out = subscriber::with_default(subscriber, f);
    let events = rx.try_iter().collect();
    (out, Captured { events })
}

#[cfg(test)]
mod tests {
    use tracing::{info, warn};

    use super::*;

    #[test]
    fn captures_message_level_and_fields() {
        let ((), got) = capture(|| {
            info!(target: "capture_test", "hello world");
            warn!(array = "contacts", index = 3, "index out of range");
        });
        assert_eq!(got.events.len(), 2);
        assert_eq!(got.events[0].target, "capture_test");
        let w = got.warnings();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].field("array"), Some("contacts"));
        assert_eq!(w[0].field("index"), Some("3"));
        assert!(got.contains("out of range"));
    }

    #[test]
    fn forwards_to_global_sink_until_cleared() {
        let (tx, rx) = unbounded();
        set_sink(tx);
        let subscriber = registry().with(layer());
        subscriber::with_default(subscriber, || {
            info!(target: "capture_global", "first");
            assert!(rx.try_recv().is_ok_and(|r| r.message == "first"));
            clear_sink();
            info!(target: "capture_global", "second");
            assert!(rx.try_recv().is_err());
        });
    }
}
