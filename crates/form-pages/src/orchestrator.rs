use std::rc::Rc;

use form_events::{EventBus, FormEvent, Listener, types};
use form_signals::{Effect, Memo, Runtime, Signal};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::NavigationError;

/// Snapshot of the orchestrator, derived entirely from index, page count and the
/// disabled flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOrchestratorState {
    /// Current page, always in `0..total_pages` (0 when there are no pages).
    pub current_page_index: usize,
    /// Number of pages.
    pub total_pages: usize,
    /// `current_page_index == 0`.
    pub is_first_page: bool,
    /// `current_page_index == total_pages - 1`; false when there are no pages.
    pub is_last_page: bool,
    /// Whether navigation requests are currently refused.
    pub navigation_disabled: bool,
}

impl PageOrchestratorState {
    /// Derive the flags from the three inputs.
    fn derive(current: usize, total: usize, disabled: bool) -> Self {
        Self {
            current_page_index: current,
            total_pages: total,
            is_first_page: current == 0,
            is_last_page: total > 0 && current == total - 1,
            navigation_disabled: disabled,
        }
    }
}

/// Clamp `index` into `0..total`, or 0 when `total` is 0.
fn clamp_index(index: usize, total: usize) -> usize {
    index.min(total.saturating_sub(1))
}

/// Signals and bus behind one orchestrator, shared with its bus listener.
struct Nav {
    /// Runtime owning the signals below.
    rt: Runtime,
    /// Current page index.
    current: Signal<usize>,
    /// Page count.
    total: Signal<usize>,
    /// Navigation switch.
    disabled: Signal<bool>,
    /// Derived state.
    state: Memo<PageOrchestratorState>,
    /// Bus receiving `page-change` notifications.
    bus: EventBus,
}

/// Page navigation state machine.
///
/// The current index is the only independently settable piece of state; the rest
/// of [`PageOrchestratorState`] is a memo over it. Each successful transition that
/// actually moves emits exactly one `page-change` on the bus. `next-page` and
/// `previous-page` requests dispatched on the bus are applied before the dispatch
/// returns.
pub struct PageOrchestrator {
    /// Shared navigation state.
    nav: Rc<Nav>,
    /// Handler for `next-page` / `previous-page` requests.
    _requests: Listener,
}

impl PageOrchestrator {
    /// Create an orchestrator over `total_pages` pages, starting at `initial_page_index`
    /// clamped into range.
    pub fn new(rt: &Runtime, total_pages: usize, initial_page_index: usize, bus: EventBus) -> Self {
        let start = clamp_index(initial_page_index, total_pages);
        if start != initial_page_index {
            debug!(
                initial = initial_page_index,
                clamped = start,
                total = total_pages,
                "initial page index out of range"
            );
        }
        let current = rt.signal(start);
        let total = rt.signal(total_pages);
        let disabled = rt.signal(false);
        let (c, t, d) = (current.clone(), total.clone(), disabled.clone());
        let state = rt.memo(move || PageOrchestratorState::derive(c.get(), t.get(), d.get()));
        let nav = Rc::new(Nav {
            rt: rt.clone(),
            current,
            total,
            disabled,
            state,
            bus: bus.clone(),
        });
        let weak = Rc::downgrade(&nav);
        let requests = bus.on(&[types::NEXT_PAGE, types::PREVIOUS_PAGE], move |ev| {
            if let Some(nav) = weak.upgrade() {
                nav.request(ev);
            }
        });
        Self {
            nav,
            _requests: requests,
        }
    }

    /// Current derived state.
    pub fn state(&self) -> PageOrchestratorState {
        self.nav.state()
    }

    /// Reactive handle on the derived state, for memos and effects that depend on
    /// the current page.
    pub fn state_memo(&self) -> &Memo<PageOrchestratorState> {
        &self.nav.state
    }

    /// Current page index, tracked when read inside a memo or effect.
    pub fn current_page_index(&self) -> usize {
        self.nav.current.get()
    }

    /// Move forward one page.
    pub fn navigate_to_next_page(&self) -> Result<(), NavigationError> {
        self.nav.next()
    }

    /// Move back one page.
    pub fn navigate_to_previous_page(&self) -> Result<(), NavigationError> {
        self.nav.previous()
    }

    /// Jump to `index`. Jumping to the current page succeeds without an event.
    pub fn navigate_to_page(&self, index: usize) -> Result<(), NavigationError> {
        let s = self.state();
        if s.total_pages == 0 {
            return Err(NavigationError::NoPages);
        }
        if index >= s.total_pages {
            return Err(NavigationError::InvalidPageIndex {
                index,
                last: s.total_pages - 1,
            });
        }
        if index == s.current_page_index {
            trace!(index, "navigate_to_page: already there");
            return Ok(());
        }
        if s.navigation_disabled {
            return Err(NavigationError::NavigationDisabled);
        }
        self.nav.transition(index);
        Ok(())
    }

    /// Change the page count, re-clamping the current index. A resize never emits
    /// `page-change`.
    pub fn set_total_pages(&self, total_pages: usize) {
        let nav = &self.nav;
        nav.rt.batch(|| {
            nav.total.set(total_pages);
            let cur = nav.current.get_untracked();
            let clamped = clamp_index(cur, total_pages);
            if clamped != cur {
                debug!(from = cur, to = clamped, total = total_pages, "page index re-clamped");
                nav.current.set(clamped);
            }
        });
    }

    /// Enable or disable navigation.
    pub fn set_navigation_disabled(&self, disabled: bool) {
        self.nav.disabled.set(disabled);
    }

    /// Call `f` with the current state now and after every change to it.
    ///
    /// The returned effect keeps running until disposed.
    pub fn subscribe_state(&self, f: impl Fn(&PageOrchestratorState) + 'static) -> Effect {
        let state = self.nav.state.clone();
        self.nav.rt.effect(move || state.with(|s| f(s)))
    }
}

impl Nav {
    /// Current derived state.
    fn state(&self) -> PageOrchestratorState {
        self.state.get_untracked()
    }

    /// Step forward, or say why not.
    fn next(&self) -> Result<(), NavigationError> {
        let s = self.state();
        if s.total_pages == 0 {
            return Err(NavigationError::NoPages);
        }
        if s.is_last_page {
            return Err(NavigationError::AlreadyOnLastPage);
        }
        if s.navigation_disabled {
            return Err(NavigationError::NavigationDisabled);
        }
        self.transition(s.current_page_index + 1);
        Ok(())
    }

    /// Step back, or say why not.
    fn previous(&self) -> Result<(), NavigationError> {
        let s = self.state();
        if s.total_pages == 0 {
            return Err(NavigationError::NoPages);
        }
        if s.is_first_page {
            return Err(NavigationError::AlreadyOnFirstPage);
        }
        if s.navigation_disabled {
            return Err(NavigationError::NavigationDisabled);
        }
        self.transition(s.current_page_index - 1);
        Ok(())
    }

    /// Apply a `next-page` / `previous-page` request from the bus.
    ///
    /// Refusals are expected interaction outcomes and only logged.
    fn request(&self, ev: &FormEvent) {
        let r = match ev {
            FormEvent::NextPage => self.next(),
            FormEvent::PreviousPage => self.previous(),
            _ => return,
        };
        if let Err(e) = r {
            debug!(event = ev.event_type(), error = %e, "navigation request refused");
        }
    }

    /// Move to `to` and announce it.
    fn transition(&self, to: usize) {
        let from = self.current.get_untracked();
        self.current.set(to);
        let total = self.total.get_untracked();
        debug!(from, to, total, "page change");
        self.bus.dispatch(FormEvent::PageChange {
            current_page_index: to,
            total_pages: total,
            previous_page_index: from,
        });
    }
}
