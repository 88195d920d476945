use std::path::Path;

use serde_json::json;

use crate::{
    ArrayTemplate, ConditionExpression, Error, FieldDefinition, FieldKind, Format, FormConfig,
    LogicRule, Operator, ValidatorSpec, load_from_path, load_from_str, parse_from_str,
};

#[test]
fn parses_full_document() {
    let src = r#"{
        "fields": [
            { "type": "page", "key": "account", "fields": [
                { "type": "select", "key": "accountType", "defaultValue": "personal",
                  "options": [ { "label": "Personal", "value": "personal" },
                               { "label": "Business", "value": "business" } ] },
                { "type": "input", "key": "companyName", "logic": [
                    { "type": "hidden", "condition": {
                        "type": "fieldValue", "fieldPath": "accountType",
                        "operator": "notEquals", "value": "business" } }
                ]}
            ]},
            { "type": "page", "key": "contact", "fields": [
                { "type": "input", "key": "email", "required": true, "email": true,
                  "validationMessages": { "required": "We need your email" } }
            ]}
        ],
        "defaultValidationMessages": { "email": "Bad email" },
        "initialPageIndex": 1
    }"#;
    let cfg = load_from_str(src, Format::Json).unwrap();
    assert!(cfg.is_paged());
    assert_eq!(cfg.pages().count(), 2);
    assert_eq!(cfg.initial_page_index, Some(1));

    let account = &cfg.fields[0];
    let company = &account.children()[1];
    assert_eq!(company.kind(), FieldKind::Input);
    let LogicRule::Hidden { condition } = &company.base().logic[0] else {
        panic!("expected hidden rule");
    };
    assert_eq!(
        condition,
        &ConditionExpression::field_value("accountType", Operator::NotEquals, "business")
    );

    let email = &cfg.fields[1].children()[0];
    assert_eq!(
        email.base().effective_validators(),
        vec![ValidatorSpec::Required, ValidatorSpec::Email]
    );

    let messages = cfg.merged_default_messages();
    assert_eq!(messages["email"], "Bad email");
    assert_eq!(messages["required"], "This field is required");
}

#[test]
fn accepts_bare_field_list() {
    let cfg: FormConfig = serde_json::from_value(json!([
        { "type": "input", "key": "name" },
        { "type": "submit", "key": "go" }
    ]))
    .unwrap();
    assert_eq!(cfg.fields.len(), 2);
    assert!(!cfg.is_paged());
    assert!(cfg.default_validation_messages.is_empty());
}

#[test]
fn array_templates_accept_one_field_or_many() {
    let cfg: FormConfig = serde_json::from_value(json!([
        { "type": "array", "key": "tags", "fields": { "type": "input", "key": "tag" } },
        { "type": "array", "key": "contacts", "fields": [
            { "type": "input", "key": "name" },
            { "type": "input", "key": "phone" }
        ]}
    ]))
    .unwrap();
    let tags = cfg.fields[0].as_array().unwrap();
    assert!(matches!(tags.template, ArrayTemplate::Single(_)));
    assert!(tags.template.is_scalar());
    let contacts = cfg.fields[1].as_array().unwrap();
    assert_eq!(contacts.template.fields().len(), 2);
    assert!(!contacts.template.is_scalar());
}

#[test]
fn json_parse_errors_carry_location() {
    let src = "{\n  \"fields\": [\n    oops\n  ]\n}";
    let err = parse_from_str(src, Format::Json).unwrap_err();
    match &err {
        Error::Parse { line, excerpt, .. } => {
            assert_eq!(*line, 3);
            assert!(excerpt.contains("oops"));
            assert!(excerpt.contains('^'));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
    assert!(err.pretty().starts_with("Form config parse error at line 3"));
}

#[test]
fn invalid_documents_fail_fast() {
    let src = r#"[
        { "type": "page", "key": "p1", "fields": [] },
        { "type": "input", "key": "loose" }
    ]"#;
    let err = load_from_str(src, Format::Json).unwrap_err();
    let Error::Validation { messages, .. } = &err else {
        panic!("expected validation error, got {:?}", err);
    };
    assert_eq!(messages.len(), 1);
    assert!(err.to_string().contains("Mixed page and non-page fields"));

    // Parsing alone does not validate.
    assert!(parse_from_str(src, Format::Json).is_ok());
}

#[test]
fn ron_documents_use_the_same_model() {
    let src = r#"{
        "fields": [
            { "type": "input", "key": "first" },
            { "type": "toggle", "key": "subscribe", "defaultValue": true },
        ],
    }"#;
    let cfg = load_from_str(src, Format::Ron).unwrap();
    assert_eq!(cfg.fields.len(), 2);
    assert_eq!(cfg.fields[1].kind(), FieldKind::Toggle);
    assert!(matches!(&cfg.fields[1], FieldDefinition::Toggle(l) if l.default_value == Some(json!(true))));
}

#[test]
fn unknown_extension_is_a_read_error() {
    let err = load_from_path(Path::new("form.yaml")).unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert!(err.pretty().contains("form.yaml"));
}

#[test]
fn field_errors_point_at_the_offending_line() {
    let src = "{\n  \"fields\": [\n    { \"type\": \"inptu\", \"key\": \"name\" }\n  ]\n}";
    let Err(Error::Parse {
        line,
        col,
        message,
        excerpt,
        ..
    }) = parse_from_str(src, Format::Json)
    else {
        panic!("typo should fail to parse");
    };
    assert_eq!(line, 3);
    assert!((15..=22).contains(&col), "column {col}");
    assert!(message.contains("unknown variant `inptu`"), "{message}");
    assert!(excerpt.contains("inptu"));

    let bare = "[\n  { \"type\": \"input\" }\n]";
    let Err(Error::Parse { line, message, .. }) = parse_from_str(bare, Format::Json) else {
        panic!("missing key should fail to parse");
    };
    assert_eq!(line, 2);
    assert!(message.contains("key"), "{message}");
}
