//! Generational storage for reactive graph nodes.

use std::{fmt, rc::Rc};

/// Generational handle to a node. Stale handles never alias a reused slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Slot position.
    pub(crate) index: u32,
    /// Slot generation at allocation time.
    pub(crate) generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Writable source.
    Signal,
    /// Cached derived value.
    Memo,
    /// Side effect.
    Effect,
}

/// Freshness of a memo or effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NodeState {
    /// Up to date.
    Clean,
    /// Some transitive source changed; sources must be checked first.
    Check,
    /// A direct source changed.
    Dirty,
}

/// Recompute body; returns true when the node's value changed.
pub(crate) type RunFn = Rc<dyn Fn() -> bool>;

/// A node in the dependency graph. Typed values live in the handles.
pub(crate) struct Node {
    /// Node kind.
    pub(crate) kind: NodeKind,
    /// Freshness.
    pub(crate) state: NodeState,
    /// True while the body runs.
    pub(crate) running: bool,
    /// True while waiting in the effect queue.
    pub(crate) queued: bool,
    /// Nodes read during the last run, in read order.
    pub(crate) sources: Vec<NodeId>,
    /// Nodes that read this one.
    pub(crate) subscribers: Vec<NodeId>,
    /// Body for memos and effects.
    pub(crate) run: Option<RunFn>,
}

impl Node {
    /// A fresh node of `kind`.
    pub(crate) fn new(kind: NodeKind, run: Option<RunFn>) -> Self {
        Self {
            kind,
            state: NodeState::Clean,
            running: false,
            queued: false,
            sources: Vec::new(),
            subscribers: Vec::new(),
            run,
        }
    }
}

/// One arena slot.
struct Slot {
    /// Bumped on every free.
    generation: u32,
    /// Occupant.
    node: Option<Node>,
}

/// Slot allocator with a free list.
#[derive(Default)]
pub(crate) struct Arena {
    /// Slots by index.
    slots: Vec<Slot>,
    /// Indexes of empty slots.
    free: Vec<u32>,
    /// Occupied slot count.
    live: usize,
}

impl Arena {
    /// Store `node`, reusing a free slot when possible.
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Remove and return the node at `id` if `id` is current.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Borrow the node at `id` if `id` is current.
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    /// Mutably borrow the node at `id` if `id` is current.
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut arena = Arena::default();
        let a = arena.insert(Node::new(NodeKind::Signal, None));
        assert!(arena.remove(a).is_some());
        let b = arena.insert(Node::new(NodeKind::Memo, None));
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).map(|n| n.kind), Some(NodeKind::Memo));
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 1);
    }
}
