//! Instance-scoped publish/subscribe: queued channel subscribers and synchronous
//! handlers share one ordered subscriber list.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    fmt,
    rc::{Rc, Weak},
};

use crossbeam_channel::{Receiver, Sender, TryIter, unbounded};
use tracing::trace;

use crate::FormEvent;

/// Callback run during dispatch.
type Handler = Rc<dyn Fn(&FormEvent)>;

/// How one subscriber receives events.
#[derive(Clone)]
enum Sink {
    /// Queue for later reading through a [`Subscription`].
    Channel(Sender<FormEvent>),
    /// Run before `dispatch` returns.
    Handler(Handler),
}

/// One registered subscriber.
struct Subscriber {
    /// Identity used to unsubscribe.
    id: u64,
    /// Accepted event types; `None` accepts everything.
    filter: Option<BTreeSet<String>>,
    /// Delivery.
    sink: Sink,
}

impl Subscriber {
    /// True if this subscriber wants `event`.
    fn wants(&self, event: &FormEvent) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|f| f.contains(event.event_type()))
    }
}

/// Shared state behind every clone of one bus.
#[derive(Default)]
struct BusInner {
    /// Next subscription id.
    next_id: Cell<u64>,
    /// Subscribers in subscription order.
    subscribers: RefCell<Vec<Subscriber>>,
}

impl BusInner {
    /// Remove subscriber `id`.
    fn detach(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|s| s.id != id);
    }
}

/// A broadcast channel for [`FormEvent`]s.
///
/// Clones share one channel. Each [`EventBus::new`] creates a fully isolated channel,
/// which is how nested scopes get their own events. Dispatch is synchronous: when
/// `dispatch` returns, every matching handler has run and every matching
/// subscription has the event queued, in subscription order.
///
/// Handlers may dispatch further events; those are delivered before the outer
/// dispatch moves on to its next subscriber.
#[derive(Clone, Default)]
pub struct EventBus {
    /// Shared subscriber list.
    inner: Rc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    /// Create an isolated bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `other` is a clone of this bus.
    pub fn same_channel(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Broadcast `event`; returns how many subscribers received it.
    pub fn dispatch(&self, event: FormEvent) -> usize {
        let targets: Vec<(u64, Sink)> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.wants(&event))
            .map(|s| (s.id, s.sink.clone()))
            .collect();
        let mut delivered = 0;
        for (id, sink) in targets {
            match sink {
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        self.inner.detach(id);
                    }
                }
                Sink::Handler(f) => {
                    f(&event);
                    delivered += 1;
                }
            }
        }
        trace!(event = event.event_type(), delivered, "dispatch");
        delivered
    }

    /// Construct an event with `ctor` and broadcast it.
    ///
    /// A failing constructor returns its error unchanged and nothing is dispatched.
    pub fn dispatch_with<E>(&self, ctor: impl FnOnce() -> Result<FormEvent, E>) -> Result<usize, E> {
        let event = ctor()?;
        Ok(self.dispatch(event))
    }

    /// Subscribe to events whose type is one of `types`.
    pub fn subscribe(&self, types: &[&str]) -> Subscription {
        let (tx, rx) = unbounded();
        let id = self.register(filter_of(types), Sink::Channel(tx));
        Subscription {
            id,
            rx,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Subscribe to every event.
    pub fn subscribe_all(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let id = self.register(None, Sink::Channel(tx));
        Subscription {
            id,
            rx,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Run `f` synchronously for every event whose type is one of `types`.
    ///
    /// The handler stays registered while the returned [`Listener`] lives.
    pub fn on(&self, types: &[&str], f: impl Fn(&FormEvent) + 'static) -> Listener {
        let id = self.register(filter_of(types), Sink::Handler(Rc::new(f)));
        Listener {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions and listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Add a subscriber.
    fn register(&self, filter: Option<BTreeSet<String>>, sink: Sink) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push(Subscriber { id, filter, sink });
        id
    }
}

/// Filter accepting exactly `types`.
fn filter_of(types: &[&str]) -> Option<BTreeSet<String>> {
    Some(types.iter().map(|t| (*t).to_string()).collect())
}

/// A filtered stream of events. Dropping it unsubscribes.
pub struct Subscription {
    /// Identity in the bus.
    id: u64,
    /// Delivery channel.
    rx: Receiver<FormEvent>,
    /// Owning bus, if still alive.
    bus: Weak<BusInner>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}

impl Subscription {
    /// Next queued event, if any.
    pub fn try_next(&self) -> Option<FormEvent> {
        self.rx.try_recv().ok()
    }

    /// Iterate queued events without blocking.
    pub fn try_iter(&self) -> TryIter<'_, FormEvent> {
        self.rx.try_iter()
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<FormEvent> {
        self.rx.try_iter().collect()
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Stop receiving events. Already queued events are discarded.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.detach(self.id);
        }
    }
}

/// A registered handler. Dropping it unregisters the handler.
pub struct Listener {
    /// Identity in the bus.
    id: u64,
    /// Owning bus, if still alive.
    bus: Weak<BusInner>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

impl Listener {
    /// Stop handling events.
    pub fn unsubscribe(self) {}
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.detach(self.id);
        }
    }
}
