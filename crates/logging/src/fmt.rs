//! Render `tracing` events into concise logfmt strings.
//!
//! Extracts level, target and message from a `tracing::Event` and keeps the
//! remaining fields both rendered in `key=value` form and individually, so
//! callers can assert on a single field.

use std::fmt::Debug;

use tracing::{
    Event, Metadata,
    field::{Field, Visit},
};

/// Rendered fields extracted from a tracing Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity level (e.g., INFO, WARN) for the event.
    pub level: String,
    /// Event target (typically the module path).
    pub target: String,
    /// Human‑readable message, or rendered `key=value` pairs when there is none.
    pub message: String,
    /// Non-message fields in recording order.
    pub fields: Vec<(String, String)>,
}

impl RenderedLog {
    /// Value of the field `name`, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Field visitor splitting `message` from the rest.
struct MsgVisitor {
    /// Captured `message` field, if present.
    msg: Option<String>,
    /// Everything else, rendered.
    fields: Vec<(String, String)>,
}

impl Visit for MsgVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.msg = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.msg = Some(format!("{:?}", value));
        } else {
            self.fields.push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

/// Extract level, target, message and fields from a tracing Event.
///
/// Behavior:
/// - If the event contains a `message` field, use it.
/// - Otherwise, concatenate `key=value` pairs from remaining fields.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta: &Metadata<'_> = event.metadata();
    let mut vis = MsgVisitor {
        msg: None,
        fields: Vec::new(),
    };
    event.record(&mut vis);
    let message = vis.msg.clone().unwrap_or_else(|| {
        vis.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    });
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message,
        fields: vis.fields,
    }
}
