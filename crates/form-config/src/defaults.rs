// Defaults for form values and validation messages

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{ArrayField, ArrayTemplate, FieldDefinition, FieldKind, LeafField};

// Validation message fallbacks, used when neither the field nor the form supplies one.
pub(crate) const MSG_REQUIRED: &str = "This field is required";
pub(crate) const MSG_EMAIL: &str = "Enter a valid email address";
pub(crate) const MSG_MIN: &str = "Value must be at least {min}";
pub(crate) const MSG_MAX: &str = "Value must be at most {max}";
pub(crate) const MSG_MIN_LENGTH: &str = "Must be at least {minLength} characters";
pub(crate) const MSG_MAX_LENGTH: &str = "Must be at most {maxLength} characters";
pub(crate) const MSG_PATTERN: &str = "Value does not match the required format";
pub(crate) const MSG_INVALID: &str = "Value is invalid";

/// Built-in validation messages keyed by validator kind.
pub fn builtin_validation_messages() -> BTreeMap<String, String> {
    [
        ("required", MSG_REQUIRED),
        ("email", MSG_EMAIL),
        ("min", MSG_MIN),
        ("max", MSG_MAX),
        ("minLength", MSG_MIN_LENGTH),
        ("maxLength", MSG_MAX_LENGTH),
        ("pattern", MSG_PATTERN),
        ("invalid", MSG_INVALID),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Initial value of a leaf field: its `defaultValue`, else an empty value for its kind.
pub fn leaf_default(kind: FieldKind, leaf: &LeafField) -> Value {
    if let Some(v) = &leaf.default_value {
        return v.clone();
    }
    match kind {
        FieldKind::Checkbox | FieldKind::Toggle => Value::Bool(false),
        FieldKind::MultiCheckbox => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}

/// Initial value of one item of `array`, built from its template.
pub fn array_item_default(array: &ArrayField) -> Value {
    match &array.template {
        ArrayTemplate::Single(field) => match field.as_leaf() {
            Some(leaf) => leaf_default(field.kind(), leaf),
            None => {
                let mut obj = Map::new();
                collect_item_fields(field, &mut obj);
                Value::Object(obj)
            }
        },
        ArrayTemplate::Multiple(fields) => Value::Object(default_value_map(fields)),
    }
}

/// Single-field templates contribute their children directly to the item object.
fn collect_item_fields(field: &FieldDefinition, out: &mut Map<String, Value>) {
    if field.kind().is_container() {
        for child in field.children() {
            collect_defaults(child, out);
        }
    } else {
        collect_defaults(field, out);
    }
}

/// Build the initial form value for a list of root fields.
///
/// Rows and pages are transparent; groups nest an object under their key; arrays
/// contribute their default items (or an empty list); buttons and text contribute nothing.
pub fn default_value_tree(fields: &[FieldDefinition]) -> Value {
    Value::Object(default_value_map(fields))
}

/// Object form of [`default_value_tree`].
fn default_value_map(fields: &[FieldDefinition]) -> Map<String, Value> {
    let mut out = Map::new();
    for f in fields {
        collect_defaults(f, &mut out);
    }
    out
}

/// Insert the default contribution of `field` into `out`.
fn collect_defaults(field: &FieldDefinition, out: &mut Map<String, Value>) {
    let kind = field.kind();
    match field {
        FieldDefinition::Row(c) | FieldDefinition::Page(c) => {
            for child in &c.fields {
                collect_defaults(child, out);
            }
        }
        FieldDefinition::Group(c) => {
            out.insert(c.base.key.clone(), Value::Object(default_value_map(&c.fields)));
        }
        FieldDefinition::Array(a) => {
            let items = a.default_value.clone().unwrap_or_default();
            out.insert(a.base.key.clone(), Value::Array(items));
        }
        _ => {
            if let Some(leaf) = field.as_leaf() {
                out.insert(leaf.base.key.clone(), leaf_default(kind, leaf));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tree_nests_groups_and_flattens_rows() {
        let fields: Vec<FieldDefinition> = serde_json::from_value(json!([
            { "type": "row", "key": "r", "fields": [
                { "type": "input", "key": "first", "defaultValue": "Ada" },
                { "type": "checkbox", "key": "agree" }
            ]},
            { "type": "group", "key": "address", "fields": [
                { "type": "input", "key": "city" }
            ]},
            { "type": "array", "key": "tags", "fields": { "type": "input", "key": "tag" } },
            { "type": "submit", "key": "go", "label": "Go" }
        ]))
        .unwrap();
        assert_eq!(
            default_value_tree(&fields),
            json!({
                "first": "Ada",
                "agree": false,
                "address": { "city": null },
                "tags": []
            })
        );
    }

    #[test]
    fn item_defaults_follow_template_shape() {
        let scalar: ArrayField = serde_json::from_value(json!({
            "key": "tags", "fields": { "type": "input", "key": "tag", "defaultValue": "new" }
        }))
        .unwrap();
        assert_eq!(array_item_default(&scalar), json!("new"));

        let grouped: ArrayField = serde_json::from_value(json!({
            "key": "contacts", "fields": { "type": "group", "key": "contact", "fields": [
                { "type": "input", "key": "name" },
                { "type": "toggle", "key": "primary" }
            ]}
        }))
        .unwrap();
        assert_eq!(
            array_item_default(&grouped),
            json!({ "name": null, "primary": false })
        );
    }
}
