//! Which pages of a paged form have live bindings.

use serde::Serialize;
use tracing::debug;

use crate::{FieldBindings, PageMounting};

/// Mount state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MountState {
    /// Bindings are live.
    Mounted,
    /// Waiting for an idle pass.
    Deferred,
    /// No bindings; the page's data is kept in the form value.
    Unmounted,
}

/// One page slot.
struct Slot {
    /// Current state.
    state: MountState,
    /// Live bindings while mounted.
    bindings: Option<FieldBindings>,
}

/// Mount bookkeeping for every page.
///
/// The current page and its neighbours are always mounted. Pages never mounted
/// start deferred until an idle pass; pages that leave the window are unmounted.
pub(crate) struct PageSlots {
    /// One slot per page.
    slots: Vec<Slot>,
    /// Mounting policy.
    policy: PageMounting,
    /// Page the window was last laid out for.
    laid_out_for: Option<usize>,
}

impl PageSlots {
    /// Slots for `count` pages, nothing mounted yet.
    pub fn new(count: usize, policy: PageMounting) -> Self {
        Self {
            slots: (0..count)
                .map(|_| Slot {
                    state: MountState::Unmounted,
                    bindings: None,
                })
                .collect(),
            policy,
            laid_out_for: None,
        }
    }

    /// Lay the window out around `current`, building bindings with `build`.
    pub fn reconcile(&mut self, current: usize, build: &dyn Fn(usize) -> FieldBindings) {
        if self.laid_out_for == Some(current) {
            return;
        }
        let first = self.laid_out_for.is_none();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let in_window = self.policy == PageMounting::All || current.abs_diff(i) <= 1;
            match (in_window, slot.state) {
                (true, MountState::Mounted) => {}
                (true, _) => mount(slot, i, build),
                (false, MountState::Mounted) => unmount(slot, i),
                (false, _) if first => slot.state = MountState::Deferred,
                (false, _) => {}
            }
        }
        self.laid_out_for = Some(current);
    }

    /// Mount every deferred page; returns how many were mounted.
    pub fn run_idle(&mut self, build: &dyn Fn(usize) -> FieldBindings) -> usize {
        let mut n = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.state == MountState::Deferred {
                mount(slot, i, build);
                n += 1;
            }
        }
        n
    }

    /// Drop pending deferred mounts; returns how many were dropped.
    pub fn cancel_idle(&mut self) -> usize {
        let mut n = 0;
        for slot in &mut self.slots {
            if slot.state == MountState::Deferred {
                slot.state = MountState::Unmounted;
                n += 1;
            }
        }
        n
    }

    /// State of every page.
    pub fn states(&self) -> Vec<MountState> {
        self.slots.iter().map(|s| s.state).collect()
    }

    /// Bindings of mounted pages, in page order.
    pub fn mounted(&self) -> Vec<FieldBindings> {
        self.slots
            .iter()
            .filter_map(|s| s.bindings.clone())
            .collect()
    }
}

/// Build and store the bindings of page `i`.
fn mount(slot: &mut Slot, i: usize, build: &dyn Fn(usize) -> FieldBindings) {
    slot.bindings = Some(build(i));
    slot.state = MountState::Mounted;
    debug!(page = i, "page mounted");
}

/// Dispose the bindings of page `i`.
fn unmount(slot: &mut Slot, i: usize) {
    if let Some(b) = slot.bindings.take() {
        b.dispose();
    }
    slot.state = MountState::Unmounted;
    debug!(page = i, "page unmounted");
}
