use std::{cell::RefCell, rc::Rc};

use form_events::{EventBus, FormEvent, Subscription, types};
use form_signals::Runtime;
use proptest::prelude::*;

use crate::{NavigationError, NavigationResult, PageOrchestrator};

/// Orchestrator plus a subscription watching its page-change output.
fn setup(total: usize, initial: usize) -> (Runtime, EventBus, PageOrchestrator, Subscription) {
    let rt = Runtime::new();
    let bus = EventBus::new();
    let changes = bus.subscribe(&[types::PAGE_CHANGE]);
    let pages = PageOrchestrator::new(&rt, total, initial, bus.clone());
    (rt, bus, pages, changes)
}

#[test]
fn forward_navigation_stops_at_the_last_page() {
    let (_rt, _bus, pages, changes) = setup(3, 0);
    for k in 1..=5 {
        let _moved = pages.navigate_to_next_page().is_ok();
        let s = pages.state();
        assert_eq!(s.current_page_index, k.min(2));
        assert_eq!(s.is_last_page, s.current_page_index == 2);
    }
    assert_eq!(changes.pending(), 2);
    assert_eq!(
        pages.navigate_to_next_page(),
        Err(NavigationError::AlreadyOnLastPage)
    );
    assert_eq!(pages.state().current_page_index, 2);
}

#[test]
fn page_change_carries_both_indices() {
    let (_rt, _bus, pages, changes) = setup(4, 1);
    pages.navigate_to_page(3).unwrap();
    assert_eq!(
        changes.try_next(),
        Some(FormEvent::PageChange {
            current_page_index: 3,
            total_pages: 4,
            previous_page_index: 1,
        })
    );
}

#[test]
fn navigating_to_the_current_page_is_a_silent_success() {
    let (_rt, _bus, pages, changes) = setup(3, 1);
    assert_eq!(pages.navigate_to_page(1), Ok(()));
    assert_eq!(changes.pending(), 0);
}

#[test]
fn out_of_range_targets_are_refused_with_the_valid_range() {
    let (_rt, _bus, pages, _changes) = setup(3, 0);
    let err = pages.navigate_to_page(3).unwrap_err();
    assert_eq!(err.to_string(), "Invalid page index 3. Valid range is 0 to 2");
    let result = NavigationResult::from(pages.navigate_to_previous_page());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Already on the first page"));
}

#[test]
fn disabled_navigation_refuses_moves() {
    let (_rt, _bus, pages, changes) = setup(3, 1);
    pages.set_navigation_disabled(true);
    assert_eq!(
        pages.navigate_to_next_page(),
        Err(NavigationError::NavigationDisabled)
    );
    assert_eq!(
        pages.navigate_to_previous_page(),
        Err(NavigationError::NavigationDisabled)
    );
    assert_eq!(
        pages.navigate_to_page(0),
        Err(NavigationError::NavigationDisabled)
    );
    assert!(pages.state().navigation_disabled);
    assert_eq!(changes.pending(), 0);
    pages.set_navigation_disabled(false);
    assert_eq!(pages.navigate_to_next_page(), Ok(()));
}

#[test]
fn shrinking_the_page_count_clamps_without_an_event() {
    let (_rt, _bus, pages, changes) = setup(3, 2);
    pages.set_total_pages(2);
    let s = pages.state();
    assert_eq!(s.current_page_index, 1);
    assert!(s.is_last_page);
    assert_eq!(changes.pending(), 0);
}

#[test]
fn initial_index_is_clamped_and_empty_forms_refuse_everything() {
    let (_rt, _bus, pages, _changes) = setup(2, 9);
    assert_eq!(pages.state().current_page_index, 1);

    let (_rt, _bus, empty, changes) = setup(0, 3);
    let s = empty.state();
    assert_eq!(s.current_page_index, 0);
    assert!(!s.is_last_page);
    assert_eq!(empty.navigate_to_next_page(), Err(NavigationError::NoPages));
    assert_eq!(empty.navigate_to_previous_page(), Err(NavigationError::NoPages));
    assert_eq!(empty.navigate_to_page(0), Err(NavigationError::NoPages));
    assert_eq!(changes.pending(), 0);
}

#[test]
fn bus_requests_navigate_before_dispatch_returns() {
    let (_rt, bus, pages, changes) = setup(3, 0);
    bus.dispatch(FormEvent::NextPage);
    assert_eq!(pages.state().current_page_index, 1);
    bus.dispatch(FormEvent::NextPage);
    bus.dispatch(FormEvent::NextPage);
    assert_eq!(pages.state().current_page_index, 2);
    bus.dispatch(FormEvent::PreviousPage);
    assert_eq!(pages.state().current_page_index, 1);
    assert_eq!(changes.pending(), 3);

    pages.set_navigation_disabled(true);
    bus.dispatch(FormEvent::NextPage);
    assert_eq!(pages.state().current_page_index, 1);
    assert_eq!(changes.pending(), 3);
}

#[test]
fn dropped_orchestrators_stop_listening() {
    let (_rt, bus, pages, changes) = setup(3, 0);
    drop(pages);
    assert_eq!(bus.subscriber_count(), 1);
    bus.dispatch(FormEvent::NextPage);
    assert_eq!(changes.pending(), 0);
}

#[test]
fn state_observers_see_every_change() {
    let (_rt, _bus, pages, _changes) = setup(3, 0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let sub = pages.subscribe_state(move |st| {
        s.borrow_mut()
            .push((st.current_page_index, st.total_pages, st.navigation_disabled));
    });
    pages.navigate_to_next_page().unwrap();
    pages.set_navigation_disabled(true);
    pages.set_total_pages(1);
    sub.dispose();
    pages.set_total_pages(5);
    assert_eq!(
        *seen.borrow(),
        vec![(0, 3, false), (1, 3, false), (1, 3, true), (0, 1, true)]
    );
}

#[test]
fn state_serialises_in_camel_case() {
    let (_rt, _bus, pages, _changes) = setup(2, 0);
    let json = serde_json::to_value(pages.state()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "currentPageIndex": 0,
            "totalPages": 2,
            "isFirstPage": true,
            "isLastPage": false,
            "navigationDisabled": false,
        })
    );
}

/// One step of a random navigation session.
#[derive(Debug, Clone, Copy)]
enum Op {
    /// Forward.
    Next,
    /// Back.
    Prev,
    /// Jump.
    Goto(usize),
    /// Resize.
    Resize(usize),
    /// Toggle the switch.
    Disable(bool),
}

/// Strategy over [`Op`].
fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Next),
        Just(Op::Prev),
        (0usize..8).prop_map(Op::Goto),
        (0usize..8).prop_map(Op::Resize),
        any::<bool>().prop_map(Op::Disable),
    ]
}

proptest! {
    #[test]
    fn index_stays_in_range_and_moves_are_announced_once(
        total in 0usize..6,
        initial in 0usize..8,
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let (_rt, _bus, pages, changes) = setup(total, initial);
        for op in ops {
            let before = pages.state().current_page_index;
            let result = match op {
                Op::Next => pages.navigate_to_next_page(),
                Op::Prev => pages.navigate_to_previous_page(),
                Op::Goto(n) => pages.navigate_to_page(n),
                Op::Resize(n) => { pages.set_total_pages(n); Ok(()) }
                Op::Disable(d) => { pages.set_navigation_disabled(d); Ok(()) }
            };
            let s = pages.state();
            if s.total_pages == 0 {
                prop_assert_eq!(s.current_page_index, 0);
            } else {
                prop_assert!(s.current_page_index < s.total_pages);
            }
            let moved = s.current_page_index != before;
            let announced = changes.drain().len();
            let is_navigation = !matches!(op, Op::Resize(_) | Op::Disable(_));
            prop_assert_eq!(announced, usize::from(is_navigation && moved));
            if result.is_err() {
                prop_assert!(!moved);
            }
        }
    }
}
