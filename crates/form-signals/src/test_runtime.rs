use std::{cell::RefCell, rc::Rc};

use proptest::prelude::*;

use crate::Runtime;

/// Shared log the closures under test append to.
fn log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn effects_run_once_on_creation_and_on_each_change() {
    let rt = Runtime::new();
    let count = rt.signal(1);
    let seen = log();
    let (c, s) = (count.clone(), seen.clone());
    let _fx = rt.effect(move || s.borrow_mut().push(format!("count={}", c.get())));

    assert!(count.set(2));
    assert!(!count.set(2), "equal writes are ignored");
    count.update(|v| *v += 1);
    assert_eq!(*seen.borrow(), vec!["count=1", "count=2", "count=3"]);
}

#[test]
fn memos_are_lazy_and_cached() {
    let rt = Runtime::new();
    let a = rt.signal(2);
    let computed = Rc::new(RefCell::new(0));
    let (src, n) = (a.clone(), computed.clone());
    let doubled = rt.memo(move || {
        *n.borrow_mut() += 1;
        src.get() * 2
    });
    assert_eq!(*computed.borrow(), 1);
    assert_eq!(doubled.get(), 4);
    assert_eq!(doubled.get(), 4);
    assert_eq!(*computed.borrow(), 1);

    a.set(5);
    assert_eq!(*computed.borrow(), 1, "no reader, no recompute");
    assert_eq!(doubled.get(), 10);
    assert_eq!(*computed.borrow(), 2);
}

#[test]
fn unchanged_memos_do_not_rerun_downstream_effects() {
    let rt = Runtime::new();
    let n = rt.signal(3);
    let src = n.clone();
    let parity = rt.memo(move || src.get() % 2 == 0);
    let runs = log();
    let (p, r) = (parity.clone(), runs.clone());
    let _fx = rt.effect(move || r.borrow_mut().push(format!("even={}", p.get())));

    n.set(5);
    n.set(7);
    n.set(8);
    assert_eq!(*runs.borrow(), vec!["even=false", "even=true"]);
}

#[test]
fn diamonds_settle_once_per_write() {
    let rt = Runtime::new();
    let first = rt.signal("Ada".to_string());
    let last = rt.signal("Lovelace".to_string());
    let (f1, l1) = (first.clone(), last.clone());
    let full = rt.memo(move || format!("{} {}", f1.get(), l1.get()));
    let f2 = first.clone();
    let initials = rt.memo(move || f2.get().chars().next().unwrap_or(' '));
    let seen = log();
    let (fu, ini, s) = (full.clone(), initials.clone(), seen.clone());
    let _fx = rt.effect(move || s.borrow_mut().push(format!("{}|{}", fu.get(), ini.get())));

    first.set("Grace".into());
    last.set("Hopper".into());
    assert_eq!(
        *seen.borrow(),
        vec!["Ada Lovelace|A", "Grace Lovelace|G", "Grace Hopper|G"]
    );
}

#[test]
fn batches_defer_effects_until_the_end() {
    let rt = Runtime::new();
    let a = rt.signal(0);
    let b = rt.signal(0);
    let seen = log();
    let (x, y, s) = (a.clone(), b.clone(), seen.clone());
    let _fx = rt.effect(move || s.borrow_mut().push(format!("{}", x.get() + y.get())));

    rt.batch(|| {
        a.set(1);
        b.set(2);
    });
    assert_eq!(*seen.borrow(), vec!["0", "3"]);
}

#[test]
fn effects_writing_signals_settle_within_the_same_write() {
    let rt = Runtime::new();
    let input = rt.signal(1);
    let derived = rt.signal(0);
    let (i, d) = (input.clone(), derived.clone());
    let _copy = rt.effect(move || {
        d.set(i.get() * 10);
    });
    let seen = log();
    let (d2, s) = (derived.clone(), seen.clone());
    let _watch = rt.effect(move || s.borrow_mut().push(d2.get().to_string()));

    input.set(2);
    assert_eq!(derived.get_untracked(), 20);
    assert_eq!(seen.borrow().last().map(String::as_str), Some("20"));
}

#[test]
fn dependencies_are_dynamic() {
    let rt = Runtime::new();
    let use_a = rt.signal(true);
    let a = rt.signal(1);
    let b = rt.signal(100);
    let runs = Rc::new(RefCell::new(0));
    let (flag, sa, sb, r) = (use_a.clone(), a.clone(), b.clone(), runs.clone());
    let _fx = rt.effect(move || {
        *r.borrow_mut() += 1;
        let _read = if flag.get() { sa.get() } else { sb.get() };
    });
    b.set(101);
    assert_eq!(*runs.borrow(), 1, "b is not a dependency yet");
    use_a.set(false);
    a.set(2);
    assert_eq!(*runs.borrow(), 2, "a is no longer a dependency");
    b.set(102);
    assert_eq!(*runs.borrow(), 3);
}

#[test]
fn disposed_effects_stop_and_free_their_node() {
    let rt = Runtime::new();
    let s = rt.signal(0);
    let runs = Rc::new(RefCell::new(0));
    let (src, r) = (s.clone(), runs.clone());
    let fx = rt.effect(move || {
        src.get();
        *r.borrow_mut() += 1;
    });
    assert_eq!(rt.node_count(), 2);
    fx.dispose();
    assert!(!rt.contains(fx.id()));
    s.set(1);
    assert_eq!(*runs.borrow(), 1);
    assert_eq!(rt.node_count(), 1);
}

#[test]
fn runaway_effect_cycles_are_cut_off() {
    let rt = Runtime::new();
    rt.set_max_effect_runs(50);
    let n = rt.signal(0u32);
    let src = n.clone();
    let bump = rt.effect(move || {
        let v = src.get();
        src.set(v + 1);
    });
    let reached = n.get_untracked();
    assert!(reached > 1 && reached <= 52, "stopped at {}", reached);

    bump.dispose();
    n.set(reached + 10);
    assert_eq!(n.get_untracked(), reached + 10);
}

#[test]
fn handles_outliving_the_runtime_keep_their_value() {
    let s = {
        let rt = Runtime::new();
        let s = rt.signal(7);
        s.set(8);
        s
    };
    assert_eq!(s.get(), 8);
    assert!(s.set(9));
    assert_eq!(s.get(), 9);
}

proptest! {
    #[test]
    fn memo_always_matches_its_function(writes in prop::collection::vec(-50i64..50, 0..40)) {
        let rt = Runtime::new();
        let a = rt.signal(0i64);
        let b = rt.signal(1i64);
        let (sa, sb) = (a.clone(), b.clone());
        let m = rt.memo(move || sa.get() * 3 - sb.get());
        for (i, w) in writes.iter().enumerate() {
            if i % 2 == 0 { a.set(*w); } else { b.set(*w); }
            prop_assert_eq!(m.get(), a.get_untracked() * 3 - b.get_untracked());
        }
    }
}
