//! The reactive graph: dependency tracking, invalidation and effect scheduling.
//!
//! Writes push invalidation through the graph: direct subscribers of a changed signal
//! become dirty and everything further downstream becomes "check". Memos recompute
//! lazily when read, after first bringing their own sources up to date, and a memo
//! whose value did not change does not dirty its subscribers. Effects reached by an
//! invalidation are queued and flushed synchronously once the outermost write or
//! batch completes, so a single external change settles before control returns.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt, mem,
    rc::Rc,
};

use tracing::{trace, warn};

use crate::{
    Effect, Memo, Signal,
    arena::{Arena, Node, NodeId, NodeKind, NodeState, RunFn},
};

/// Default cap on effect runs within one flush.
pub const DEFAULT_MAX_EFFECT_RUNS: usize = 10_000;

/// Shared runtime state.
pub(crate) struct Inner {
    /// Graph nodes.
    arena: RefCell<Arena>,
    /// Node currently collecting dependencies.
    observer: Cell<Option<NodeId>>,
    /// Open `batch` scopes.
    batch_depth: Cell<usize>,
    /// True while effects are being flushed.
    flushing: Cell<bool>,
    /// Effects waiting to run, in invalidation order.
    queue: RefCell<VecDeque<NodeId>>,
    /// Cap on effect runs per flush.
    max_effect_runs: Cell<usize>,
}

/// Owner of a reactive graph.
///
/// Handles created from a runtime hold only a weak reference to it; dropping the last
/// `Runtime` clone frees every node. Handles outliving their runtime keep returning
/// their last value and stop reacting.
#[derive(Clone)]
pub struct Runtime {
    /// Shared state.
    inner: Rc<Inner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Runtime {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                arena: RefCell::new(Arena::default()),
                observer: Cell::new(None),
                batch_depth: Cell::new(0),
                flushing: Cell::new(false),
                queue: RefCell::new(VecDeque::new()),
                max_effect_runs: Cell::new(DEFAULT_MAX_EFFECT_RUNS),
            }),
        }
    }

    /// Create a writable signal.
    pub fn signal<T: Clone + PartialEq + 'static>(&self, value: T) -> Signal<T> {
        let id = self
            .inner
            .arena
            .borrow_mut()
            .insert(Node::new(NodeKind::Signal, None));
        Signal::from_parts(Rc::downgrade(&self.inner), id, value)
    }

    /// Create a memo computing `f`. The first computation runs immediately.
    pub fn memo<T: Clone + PartialEq + 'static>(&self, f: impl Fn() -> T + 'static) -> Memo<T> {
        let id = self
            .inner
            .arena
            .borrow_mut()
            .insert(Node::new(NodeKind::Memo, None));
        let f = Rc::new(f);
        let initial = self.inner.with_observer(id, || f());
        let value = Rc::new(RefCell::new(initial));
        let cell = Rc::downgrade(&value);
        let run: RunFn = Rc::new(move || {
            let next = f();
            let Some(cell) = cell.upgrade() else {
                return false;
            };
            if *cell.borrow() == next {
                return false;
            }
            *cell.borrow_mut() = next;
            true
        });
        if let Some(node) = self.inner.arena.borrow_mut().get_mut(id) {
            node.run = Some(run);
        }
        Memo::from_parts(Rc::downgrade(&self.inner), id, value)
    }

    /// Create an effect running `f` now and again whenever anything it read changes.
    pub fn effect(&self, f: impl Fn() + 'static) -> Effect {
        let run: RunFn = Rc::new(move || {
            f();
            false
        });
        let id = self
            .inner
            .arena
            .borrow_mut()
            .insert(Node::new(NodeKind::Effect, Some(run)));
        self.inner.run(id);
        self.inner.flush();
        Effect::from_parts(Rc::downgrade(&self.inner), id)
    }

    /// Run `f` with effect flushing deferred until it returns.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.batch(f)
    }

    /// Run `f` without recording dependencies for the current observer.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.untrack(f)
    }

    /// Cap effect runs per flush; exceeding it abandons the flush with a warning.
    pub fn set_max_effect_runs(&self, n: usize) {
        self.inner.max_effect_runs.set(n.max(1));
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.inner.arena.borrow().len()
    }

    /// True if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.arena.borrow().get(id).is_some()
    }

    /// Remove a node from the graph.
    pub fn dispose(&self, id: NodeId) {
        self.inner.dispose(id);
    }
}

impl Inner {
    /// Record that the current observer read `source`.
    pub(crate) fn track(&self, source: NodeId) {
        let Some(observer) = self.observer.get() else {
            return;
        };
        if observer == source {
            return;
        }
        let mut arena = self.arena.borrow_mut();
        if arena.get(source).is_none() {
            return;
        }
        let Some(obs) = arena.get_mut(observer) else {
            return;
        };
        if obs.sources.contains(&source) {
            return;
        }
        obs.sources.push(source);
        if let Some(src) = arena.get_mut(source) {
            src.subscribers.push(observer);
        }
    }

    /// A signal changed: dirty its subscribers and flush if not batching.
    pub(crate) fn notify(&self, source: NodeId) {
        let subscribers = match self.arena.borrow().get(source) {
            Some(n) => n.subscribers.clone(),
            None => return,
        };
        for s in subscribers {
            self.mark(s, NodeState::Dirty);
        }
        self.flush();
    }

    /// Raise `id` to at least `state`, propagating "check" downstream.
    fn mark(&self, id: NodeId, state: NodeState) {
        let downstream = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.get_mut(id) else {
                return;
            };
            if node.state >= state {
                return;
            }
            let was_clean = node.state == NodeState::Clean;
            node.state = state;
            if node.kind == NodeKind::Effect && !node.queued {
                node.queued = true;
                self.queue.borrow_mut().push_back(id);
            }
            if was_clean {
                node.subscribers.clone()
            } else {
                Vec::new()
            }
        };
        for s in downstream {
            self.mark(s, NodeState::Check);
        }
    }

    /// Bring a memo or effect up to date, recomputing only if a source really changed.
    pub(crate) fn update_if_necessary(&self, id: NodeId) {
        let (state, running, sources) = match self.arena.borrow().get(id) {
            Some(n) => (n.state, n.running, n.sources.clone()),
            None => return,
        };
        if running {
            if self.kind(id) == Some(NodeKind::Memo) {
                warn!(node = ?id, "reactive cycle: memo read while it is being computed");
            }
            return;
        }
        if state == NodeState::Check {
            for src in sources {
                let is_memo = self
                    .arena
                    .borrow()
                    .get(src)
                    .is_some_and(|n| n.kind == NodeKind::Memo);
                if is_memo {
                    self.update_if_necessary(src);
                }
                if self.state(id) == Some(NodeState::Dirty) {
                    break;
                }
            }
        }
        match self.state(id) {
            Some(NodeState::Dirty) => self.run(id),
            Some(NodeState::Check) => {
                if let Some(n) = self.arena.borrow_mut().get_mut(id) {
                    n.state = NodeState::Clean;
                }
            }
            _ => {}
        }
    }

    /// Current state of `id`.
    fn state(&self, id: NodeId) -> Option<NodeState> {
        self.arena.borrow().get(id).map(|n| n.state)
    }

    /// Kind of `id`.
    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.arena.borrow().get(id).map(|n| n.kind)
    }

    /// Execute the body of `id`, rebuilding its dependency list.
    pub(crate) fn run(&self, id: NodeId) {
        let (run, old_sources) = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.get_mut(id) else {
                return;
            };
            let Some(run) = node.run.clone() else {
                return;
            };
            node.state = NodeState::Clean;
            node.running = true;
            (run, mem::take(&mut node.sources))
        };
        {
            let mut arena = self.arena.borrow_mut();
            for src in old_sources {
                if let Some(n) = arena.get_mut(src) {
                    n.subscribers.retain(|s| *s != id);
                }
            }
        }

        let changed = self.with_observer(id, || run());

        let subscribers = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.get_mut(id) else {
                return;
            };
            node.running = false;
            // An effect invalidated by its own run goes back on the queue.
            if node.kind == NodeKind::Effect && node.state != NodeState::Clean && !node.queued {
                node.queued = true;
                self.queue.borrow_mut().push_back(id);
            }
            if changed && node.kind == NodeKind::Memo {
                node.subscribers.clone()
            } else {
                Vec::new()
            }
        };
        let mut arena = self.arena.borrow_mut();
        for s in subscribers {
            if let Some(n) = arena.get_mut(s) {
                n.state = NodeState::Dirty;
            }
        }
    }

    /// Run queued effects until the queue is empty or the run cap is hit.
    fn flush(&self) {
        if self.flushing.get() || self.batch_depth.get() > 0 {
            return;
        }
        self.flushing.set(true);
        let limit = self.max_effect_runs.get();
        let mut runs = 0usize;
        loop {
            let Some(id) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            if let Some(n) = self.arena.borrow_mut().get_mut(id) {
                n.queued = false;
            }
            runs += 1;
            if runs > limit {
                let dropped = self.abandon_queue();
                warn!(
                    runs = limit,
                    dropped, "effect flush exceeded its run limit; likely a reactive cycle"
                );
                break;
            }
            self.update_if_necessary(id);
        }
        trace!(runs, "flush complete");
        self.flushing.set(false);
    }

    /// Clear the effect queue, returning how many effects were dropped.
    fn abandon_queue(&self) -> usize {
        let pending: Vec<NodeId> = self.queue.borrow_mut().drain(..).collect();
        let mut arena = self.arena.borrow_mut();
        for id in &pending {
            if let Some(n) = arena.get_mut(*id) {
                n.queued = false;
                n.state = NodeState::Clean;
            }
        }
        pending.len() + 1
    }

    /// Defer flushing while `f` runs.
    pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let out = f();
        self.batch_depth.set(self.batch_depth.get() - 1);
        self.flush();
        out
    }

    /// Run `f` with no observer.
    pub(crate) fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = self.observer.replace(None);
        let out = f();
        self.observer.set(prev);
        out
    }

    /// Run `f` with `id` as the observer.
    fn with_observer<R>(&self, id: NodeId, f: impl FnOnce() -> R) -> R {
        let prev = self.observer.replace(Some(id));
        let out = f();
        self.observer.set(prev);
        out
    }

    /// Detach and free `id`.
    pub(crate) fn dispose(&self, id: NodeId) {
        let removed = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.remove(id) else {
                return;
            };
            for src in &node.sources {
                if let Some(n) = arena.get_mut(*src) {
                    n.subscribers.retain(|s| *s != id);
                }
            }
            for sub in &node.subscribers {
                if let Some(n) = arena.get_mut(*sub) {
                    n.sources.retain(|s| *s != id);
                }
            }
            node
        };
        self.queue.borrow_mut().retain(|q| *q != id);
        // Dropped outside the borrow: the body may own handles.
        drop(removed);
    }
}
