use form_config::FormConfig;
use form_engine::{Error, FieldBindings, FormEngine, FormOptions, MountState, PageMounting};
use form_events::{FormEvent, types};
use form_pages::{NavigationError, NavigationResult};
use proptest::prelude::*;
use serde_json::{Value, json};

fn engine_with(config: Value, options: FormOptions) -> FormEngine {
    let config: FormConfig = serde_json::from_value(config).expect("config parses");
    FormEngine::new(config, options).expect("engine builds")
}

fn engine(config: Value) -> FormEngine {
    engine_with(config, FormOptions::new())
}

fn bound(engine: &FormEngine, path: &str) -> FieldBindings {
    engine
        .binding(path)
        .unwrap_or_else(|| panic!("no binding at {path}"))
}

fn set(engine: &FormEngine, path: &str, value: Value) {
    let b = bound(engine, path);
    assert!(b.value.expect("value cell").set(value), "write to {path} ignored");
}

fn contacts_form() -> Value {
    json!({ "fields": [
        { "type": "array", "key": "contacts", "fields": [
            { "type": "input", "key": "name" },
            { "type": "removeArrayItem", "key": "remove" },
            { "type": "addArrayItem", "key": "addAfter" }
        ]},
        { "type": "addArrayItem", "key": "add", "arrayKey": "contacts" },
        { "type": "prependArrayItem", "key": "addFirst", "arrayKey": "contacts" }
    ]})
}

fn names(engine: &FormEngine) -> Vec<Value> {
    engine
        .array("contacts")
        .expect("contacts controller")
        .values()
        .iter()
        .map(|v| v["name"].clone())
        .collect()
}

fn wizard(pages: usize) -> Value {
    let pages: Vec<Value> = (0..pages)
        .map(|i| {
            json!({ "type": "page", "key": format!("page{i}"), "fields": [
                { "type": "input", "key": format!("answer{i}") },
                { "type": "previous", "key": format!("back{i}") },
                { "type": "next", "key": format!("next{i}") }
            ]})
        })
        .collect();
    json!({ "fields": pages })
}

#[test]
fn derived_full_name_follows_its_inputs() {
    let form = engine_with(
        json!({ "fields": [
            { "type": "input", "key": "firstName" },
            { "type": "input", "key": "lastName" },
            { "type": "input", "key": "fullName", "logic": [
                { "type": "derivation", "targetField": "fullName",
                  "expression": "formValue.firstName + \" \" + formValue.lastName" }
            ]}
        ]}),
        FormOptions::new().with_initial_value(json!({ "firstName": "Ada", "lastName": "Lovelace" })),
    );
    assert_eq!(form.value()["fullName"], "Ada Lovelace");

    set(&form, "firstName", json!("Grace"));
    assert_eq!(form.value()["fullName"], "Grace Lovelace");
    set(&form, "lastName", json!("Hopper"));
    assert_eq!(form.value()["fullName"], "Grace Hopper");

    let full = bound(&form, "fullName").value.expect("value cell");
    assert!(full.is_derived());
    assert!(!full.set(json!("overwritten")));
    assert_eq!(full.get_untracked(), json!("Grace Lovelace"));
}

#[test]
fn hidden_fields_toggle_and_skip_validation() {
    let form = engine(json!({ "fields": [
        { "type": "select", "key": "accountType", "defaultValue": "personal" },
        { "type": "input", "key": "companyName", "required": true, "logic": [
            { "type": "hidden", "condition": {
                "type": "fieldValue", "fieldPath": "accountType",
                "operator": "notEquals", "value": "business" } }
        ]}
    ]}));
    let company = bound(&form, "companyName");
    assert!(company.hidden.is_reactive());
    assert!(company.hidden.get_untracked());
    assert!(form.is_valid());

    set(&form, "accountType", json!("business"));
    assert!(!company.hidden.get_untracked());
    assert!(!form.is_valid());
    assert_eq!(company.current_errors()[0].kind, "required");

    set(&form, "accountType", json!("personal"));
    assert!(company.hidden.get_untracked());
    assert!(form.is_valid());
    assert!(company.current_errors().is_empty());
}

#[test]
fn contacts_renumber_after_removal() {
    let form = engine(contacts_form());
    for _ in 0..3 {
        assert!(form.press("add").is_some());
    }
    let contacts = form.array("contacts").expect("contacts controller");
    assert_eq!(contacts.len(), 3);
    let ids = contacts.item_ids();

    set(&form, "contacts.0.name", json!("a"));
    set(&form, "contacts.1.name", json!("b"));
    set(&form, "contacts.2.name", json!("c"));

    let pressed = form.press("contacts.1.remove");
    assert_eq!(
        pressed,
        Some(FormEvent::RemoveArrayItem {
            array_key: "contacts".into(),
            index: Some(1)
        })
    );
    assert_eq!(names(&form), vec![json!("a"), json!("c")]);
    assert_eq!(contacts.item_ids(), vec![ids[0], ids[2]]);
    let positions: Vec<usize> = contacts
        .items()
        .iter()
        .map(|i| i.position.get_untracked())
        .collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(
        bound(&form, "contacts.1.name").current_value(),
        Some(json!("c"))
    );
}

#[test]
fn item_buttons_act_relative_to_their_item() {
    let form = engine(contacts_form());
    form.press("add");
    form.press("add");
    set(&form, "contacts.0.name", json!("first"));
    set(&form, "contacts.1.name", json!("last"));

    form.press("contacts.0.addAfter");
    assert_eq!(names(&form), vec![json!("first"), Value::Null, json!("last")]);

    form.press("addFirst");
    assert_eq!(names(&form)[0], Value::Null);
    assert_eq!(names(&form)[1], json!("first"));
}

#[test]
fn array_commands_from_the_bus_are_applied() {
    let form = engine(contacts_form());
    let delivered = form.dispatch(FormEvent::AddArrayItem {
        array_key: "contacts".into(),
        index: None,
    });
    assert!(delivered >= 1);
    form.dispatch(FormEvent::AddArrayItem {
        array_key: "contacts".into(),
        index: None,
    });
    set(&form, "contacts.1.name", json!("moved"));
    form.dispatch(FormEvent::MoveArrayItem {
        array_key: "contacts".into(),
        from: 1,
        to: 0,
    });
    assert_eq!(names(&form), vec![json!("moved"), Value::Null]);

    let ((), logs) = logging::capture::capture(|| {
        form.dispatch(FormEvent::RemoveArrayItem {
            array_key: "contacts".into(),
            index: Some(7),
        });
        form.dispatch(FormEvent::PopArrayItem {
            array_key: "nowhere".into(),
        });
    });
    assert_eq!(logs.warnings().len(), 2);
    assert!(logs.contains("array command refused"));
    assert_eq!(form.array("contacts").expect("contacts").len(), 2);
}

#[test]
fn presses_and_bus_dispatches_act_immediately() {
    let form = engine(wizard(3));
    let next = bound(&form, "next0").button.expect("next button");
    assert_eq!(next.press(), Some(FormEvent::NextPage));
    assert_eq!(form.page_state().map(|s| s.current_page_index), Some(1));

    form.bus().dispatch(FormEvent::NextPage);
    assert_eq!(form.page_state().map(|s| s.current_page_index), Some(2));
    assert_eq!(
        form.page_mount_states(),
        vec![MountState::Unmounted, MountState::Mounted, MountState::Mounted]
    );

    let list = engine(contacts_form());
    list.bus().dispatch(FormEvent::add_array_item("contacts"));
    assert_eq!(list.array("contacts").expect("contacts").len(), 1);
    let add = bound(&list, "add").button.expect("add button");
    add.press();
    assert_eq!(names(&list).len(), 2);
}

#[test]
fn items_follow_writes_made_around_the_controller() {
    let form = engine(json!({ "fields": [
        { "type": "checkbox", "key": "keep", "defaultValue": true },
        { "type": "array", "key": "tags",
          "fields": [{ "type": "input", "key": "label" }],
          "logic": [
            { "type": "derivation", "targetField": "tags",
              "expression": "if formValue.keep { formValue.tags } else { [] }" }
          ]}
    ]}));
    let tags = form.array("tags").expect("tags controller");
    tags.append(None).expect("first");
    tags.append(None).expect("second");
    assert_eq!(tags.len(), 2);

    set(&form, "keep", json!(false));
    assert_eq!(form.value()["tags"], json!([]));
    assert_eq!(tags.len(), 0);
    assert!(matches!(
        tags.remove(Some(1)),
        Err(Error::IndexOutOfRange { index: 1, len: 0, .. })
    ));

    set(&form, "keep", json!(true));
    form.context().root().update(|v| {
        v["tags"] = json!([{ "label": "a" }, { "label": "b" }, { "label": "c" }]);
    });
    assert_eq!(tags.len(), 3);
    tags.move_item(2, 0).expect("in range");
    assert_eq!(tags.values()[0]["label"], "c");

    form.runtime().batch(|| {
        form.context().root().update(|v| v["tags"] = json!([]));
        assert!(matches!(
            tags.insert(2),
            Err(Error::IndexOutOfRange { index: 2, len: 0, .. })
        ));
    });
    assert!(tags.is_empty());
}

#[test]
fn writing_the_form_value_resyncs_items() {
    let form = engine(contacts_form());
    form.set_form_value(json!({ "contacts": [ { "name": "x" }, { "name": "y" } ] }));
    assert_eq!(form.array("contacts").expect("contacts").len(), 2);
    assert_eq!(
        bound(&form, "contacts.1.name").current_value(),
        Some(json!("y"))
    );
    form.set_value("contacts", json!([])).expect("writable");
    assert!(form.array("contacts").expect("contacts").is_empty());
    assert!(matches!(
        form.set_value("contacts.5.name", json!("z")),
        Err(Error::InvalidPath(_))
    ));
}

#[test]
fn pages_mount_around_the_current_one() {
    use MountState::*;
    let form = engine(wizard(4));
    assert_eq!(form.page_mount_states(), vec![Mounted, Mounted, Deferred, Deferred]);

    form.navigate_next().expect("can move forward");
    assert_eq!(form.page_mount_states(), vec![Mounted, Mounted, Mounted, Deferred]);

    form.navigate_to(3).expect("last page exists");
    assert_eq!(form.page_mount_states(), vec![Unmounted, Unmounted, Mounted, Mounted]);
    assert_eq!(form.cancel_idle(), 0);

    let idle = engine(wizard(4));
    assert_eq!(idle.run_idle(), 2);
    assert_eq!(idle.page_mount_states(), vec![Mounted; 4]);

    let cancelled = engine(wizard(4));
    assert_eq!(cancelled.cancel_idle(), 2);
    assert_eq!(
        cancelled.page_mount_states(),
        vec![Mounted, Mounted, Unmounted, Unmounted]
    );

    let eager = engine_with(wizard(3), FormOptions::new().with_page_mounting(PageMounting::All));
    assert_eq!(eager.page_mount_states(), vec![Mounted; 3]);
}

#[test]
fn unmounted_pages_keep_their_data() {
    let form = engine(wizard(4));
    set(&form, "answer0", json!("kept"));
    form.navigate_to(3).expect("last page exists");
    assert!(form.binding("answer0").is_none());
    assert_eq!(form.value()["answer0"], "kept");
    form.navigate_to(0).expect("first page exists");
    assert_eq!(bound(&form, "answer0").current_value(), Some(json!("kept")));
}

#[test]
fn navigation_refusals_and_button_gating() {
    let form = engine(json!({ "initialPageIndex": 1, "fields": wizard(3)["fields"] }));
    let changes = form.bus().subscribe(&[types::PAGE_CHANGE]);
    assert_eq!(form.page_state().map(|s| s.current_page_index), Some(1));

    assert!(form.press("next1").is_some());
    assert_eq!(form.page_state().map(|s| s.current_page_index), Some(2));
    assert_eq!(
        changes.drain(),
        vec![FormEvent::PageChange {
            current_page_index: 2,
            total_pages: 3,
            previous_page_index: 1,
        }]
    );
    assert!(bound(&form, "next2").disabled.get_untracked());
    assert!(!bound(&form, "back2").disabled.get_untracked());

    assert!(matches!(
        form.navigate_next(),
        Err(Error::Navigation(NavigationError::AlreadyOnLastPage))
    ));
    assert!(matches!(
        form.navigate_to(9),
        Err(Error::Navigation(NavigationError::InvalidPageIndex { index: 9, last: 2 }))
    ));
    let result = NavigationResult::from(form.navigate_to(9));
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Invalid page index 9. Valid range is 0 to 2")
    );
    assert!(changes.drain().is_empty());

    let flat = engine(contacts_form());
    assert!(matches!(flat.navigate_next(), Err(Error::NotPaged)));
    assert!(flat.page_mount_states().is_empty());
}

#[test]
fn misconfigured_buttons_warn_but_do_not_fail() {
    let config = json!({ "fields": [
        { "type": "array", "key": "tags", "fields": { "type": "input", "key": "tag" } },
        { "type": "addArrayItem", "key": "orphan" },
        { "type": "removeArrayItem", "key": "typo", "arrayKey": "tagz" }
    ]});
    let (form, logs) = logging::capture::capture(|| engine(config.clone()));
    assert!(!form.config_warnings().is_empty());
    assert!(logs.contains("array button outside any array has no arrayKey"));
    assert!(logs.contains("button references unknown array"));

    let (pressed, logs) = logging::capture::capture(|| form.press("orphan"));
    assert_eq!(pressed, None);
    assert!(logs.contains("button has no array to act on"));

    let parsed: FormConfig = serde_json::from_value(config).expect("config parses");
    assert!(matches!(
        FormEngine::new(parsed, FormOptions::new().strict()),
        Err(Error::Config(_))
    ));
}

#[test]
fn submit_is_gated_on_validity() {
    let form = engine(json!({ "fields": [
        { "type": "input", "key": "email", "required": true, "email": true,
          "validationMessages": { "required": "We need your email" } },
        { "type": "input", "key": "age", "min": 18 },
        { "type": "submit", "key": "send" }
    ]}));
    let submits = form.bus().subscribe(&[types::SUBMIT]);
    assert!(bound(&form, "send").disabled.get_untracked());

    match form.submit() {
        Err(Error::Invalid(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path, "email");
            assert_eq!(errors[0].error.message, "We need your email");
        }
        other => panic!("expected invalid submit, got {other:?}"),
    }
    assert_eq!(submits.pending(), 0);

    set(&form, "email", json!("not-an-address"));
    set(&form, "age", json!(12));
    let kinds: Vec<String> = form
        .validation_errors()
        .into_iter()
        .map(|e| e.error.kind)
        .collect();
    assert_eq!(kinds, vec!["email", "min"]);

    set(&form, "email", json!("ada@example.com"));
    set(&form, "age", json!(36));
    assert!(!bound(&form, "send").disabled.get_untracked());
    let value = form.submit().expect("valid form submits");
    assert_eq!(value["email"], "ada@example.com");
    assert_eq!(submits.drain(), vec![FormEvent::Submit]);
}

#[test]
fn page_validity_is_scoped_to_the_page() {
    let form = engine(json!({ "fields": [
        { "type": "page", "key": "p0", "fields": [ { "type": "input", "key": "a", "required": true } ] },
        { "type": "page", "key": "p1", "fields": [ { "type": "input", "key": "b" } ] }
    ]}));
    assert!(!form.is_page_valid(0));
    assert!(form.is_page_valid(1));
    assert_eq!(form.page_errors(0)[0].key, "a");
    assert!(form.page_errors(5).is_empty());
}

#[derive(Debug, Clone, Copy)]
enum ArrayOp {
    Append(Option<usize>),
    Prepend,
    Insert(usize),
    Remove(Option<usize>),
    Pop,
    Shift,
    Move(usize, usize),
}

fn array_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        proptest::option::of(0usize..6).prop_map(ArrayOp::Append),
        Just(ArrayOp::Prepend),
        (0usize..6).prop_map(ArrayOp::Insert),
        proptest::option::of(0usize..6).prop_map(ArrayOp::Remove),
        Just(ArrayOp::Pop),
        Just(ArrayOp::Shift),
        (0usize..6, 0usize..6).prop_map(|(a, b)| ArrayOp::Move(a, b)),
    ]
}

proptest! {
    #[test]
    fn items_stay_contiguous_and_match_the_data(ops in proptest::collection::vec(array_op(), 1..25)) {
        let form = engine(contacts_form());
        let contacts = form.array("contacts").expect("contacts controller");
        for op in ops {
            let before = contacts.len();
            let outcome = match op {
                ArrayOp::Append(i) => contacts.append(i).map(drop),
                ArrayOp::Prepend => contacts.prepend().map(drop),
                ArrayOp::Insert(i) => contacts.insert(i).map(drop),
                ArrayOp::Remove(i) => contacts.remove(i).map(drop),
                ArrayOp::Pop => contacts.pop().map(drop),
                ArrayOp::Shift => contacts.shift().map(drop),
                ArrayOp::Move(a, b) => contacts.move_item(a, b),
            };
            if outcome.is_err() {
                prop_assert_eq!(contacts.len(), before);
            }
            prop_assert_eq!(contacts.values().len(), contacts.len());
            let items = contacts.items();
            for (i, item) in items.iter().enumerate() {
                prop_assert_eq!(item.position.get_untracked(), i);
            }
            let mut ids = contacts.item_ids();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), items.len());
        }
    }
}
