//! Typed events and the instance-scoped bus that carries them.
//!
//! UI actions (page navigation, submission, array mutation) are decoupled from the
//! components that handle them: triggers dispatch a [`FormEvent`] on an [`EventBus`],
//! and handlers either run synchronously as a [`Listener`] or read a queued
//! [`Subscription`], both filtered by event type.

mod bus;
mod event;

pub use bus::{EventBus, Listener, Subscription};
pub use event::{FormEvent, types};
