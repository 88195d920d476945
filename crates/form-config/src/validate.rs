//! Static validation of a configuration tree.
//!
//! Everything here detects authoring mistakes that can be found before a form is
//! mounted. Each problem becomes one human-readable message; callers decide whether
//! to fail fast or to warn and continue.

use std::collections::{BTreeMap, BTreeSet};

use crate::{FieldDefinition, FieldKind, LogicRule};

/// Where a field sits while walking the tree.
#[derive(Debug, Clone)]
struct Scope<'a> {
    /// Kind and key of the enclosing container, `None` at the root.
    parent: Option<(FieldKind, &'a str)>,
    /// Dotted value path of the enclosing object.
    path: String,
    /// Path of the enclosing array when walking an item template.
    array: Option<String>,
}

impl Scope<'_> {
    /// Describe the container for duplicate-key messages.
    fn describe(&self) -> String {
        match self.parent {
            Some((kind, key)) => format!("{} '{}'", kind, key),
            None => "the form root".to_string(),
        }
    }

    /// Path of a child key under this scope.
    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }
}

/// Validate `fields` as the root of a form and return every problem found.
pub fn validate_fields(fields: &[FieldDefinition]) -> Vec<String> {
    let mut out = Vec::new();
    check_root_pages(fields, &mut out);

    let mut arrays = BTreeMap::new();
    collect_arrays(fields, "", &mut arrays);

    let root = Scope {
        parent: None,
        path: String::new(),
        array: None,
    };
    walk(fields, &root, &arrays, &mut out);
    out
}

/// A form's root fields are either all pages or none.
fn check_root_pages(fields: &[FieldDefinition], out: &mut Vec<String>) {
    let (pages, others): (Vec<_>, Vec<_>) = fields.iter().partition(|f| f.is_page());
    if !pages.is_empty() && !others.is_empty() {
        let names = |v: &[&FieldDefinition]| {
            v.iter()
                .map(|f| f.key().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push(format!(
            "Mixed page and non-page fields at root: pages [{}], non-page fields [{}]. \
             Either every root field must be a page or none may be.",
            names(&pages),
            names(&others)
        ));
    }
}

/// Record every array's full path, keyed by that path and also by its bare key.
fn collect_arrays(fields: &[FieldDefinition], prefix: &str, out: &mut BTreeMap<String, Vec<String>>) {
    for f in fields {
        let path = if prefix.is_empty() {
            f.key().to_string()
        } else {
            format!("{}.{}", prefix, f.key())
        };
        match f {
            FieldDefinition::Array(a) => {
                out.entry(path.clone()).or_default().push(path.clone());
                if path != a.base.key {
                    out.entry(a.base.key.clone()).or_default().push(path);
                }
            }
            FieldDefinition::Group(c) => collect_arrays(&c.fields, &path, out),
            FieldDefinition::Row(c) | FieldDefinition::Page(c) => {
                collect_arrays(&c.fields, prefix, out)
            }
            _ => {}
        }
    }
}

/// Recursive structural checks.
fn walk(
    fields: &[FieldDefinition],
    scope: &Scope<'_>,
    arrays: &BTreeMap<String, Vec<String>>,
    out: &mut Vec<String>,
) {
    let mut seen = BTreeSet::new();
    for field in fields {
        let kind = field.kind();
        let key = field.key();
        if key.is_empty() {
            out.push(format!(
                "Field of type '{}' in {} has an empty key",
                kind,
                scope.describe()
            ));
        } else if !seen.insert(key) {
            out.push(format!("Duplicate key '{}' in {}", key, scope.describe()));
        }

        if let Some((parent_kind, parent_key)) = scope.parent
            && field.is_page()
        {
            out.push(format!(
                "Page field '{}' cannot be nested inside {} '{}'; pages are only allowed at the form root",
                key, parent_kind, parent_key
            ));
        }

        check_derivations(field, out);

        if let Some(button) = field.as_button()
            && kind.array_action().is_some()
        {
            match (&button.array_key, &scope.array) {
                (Some(target), _) if !arrays.contains_key(target) => out.push(format!(
                    "Button '{}' ({}) references unknown array '{}'",
                    key, kind, target
                )),
                (Some(target), _) if arrays.get(target).is_some_and(|p| p.len() > 1) => {
                    out.push(format!(
                        "Button '{}' ({}) references ambiguous array key '{}'; use the full path",
                        key, kind, target
                    ))
                }
                (None, None) => out.push(format!(
                    "Button '{}' ({}) is outside any array and has no arrayKey",
                    key, kind
                )),
                _ => {}
            }
        }

        match field {
            FieldDefinition::Row(c) | FieldDefinition::Page(c) => {
                let inner = Scope {
                    parent: Some((kind, key)),
                    path: scope.path.clone(),
                    array: scope.array.clone(),
                };
                walk(&c.fields, &inner, arrays, out);
            }
            FieldDefinition::Group(c) => {
                let inner = Scope {
                    parent: Some((kind, key)),
                    path: scope.child_path(key),
                    array: scope.array.clone(),
                };
                walk(&c.fields, &inner, arrays, out);
            }
            FieldDefinition::Array(a) => {
                let array_path = scope.child_path(key);
                let inner = Scope {
                    parent: Some((kind, key)),
                    path: array_path.clone(),
                    array: Some(array_path),
                };
                walk(a.template.fields(), &inner, arrays, out);
            }
            _ => {}
        }
    }
}

/// Derivation rules may only target the field that owns them.
fn check_derivations(field: &FieldDefinition, out: &mut Vec<String>) {
    for rule in &field.base().logic {
        if let LogicRule::Derivation {
            target_field: Some(target),
            ..
        } = rule
            && target != field.key()
        {
            out.push(format!(
                "Derivation on field '{}' targets '{}'; a derivation must target its own field",
                field.key(),
                target
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(v: serde_json::Value) -> Vec<FieldDefinition> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn valid_paged_form_has_no_messages() {
        let f = fields(json!([
            { "type": "page", "key": "p1", "fields": [ { "type": "input", "key": "a" } ] },
            { "type": "page", "key": "p2", "fields": [ { "type": "input", "key": "b" } ] }
        ]));
        assert!(validate_fields(&f).is_empty());
    }

    #[test]
    fn mixed_roots_are_reported() {
        let f = fields(json!([
            { "type": "page", "key": "p1", "fields": [] },
            { "type": "input", "key": "name" }
        ]));
        let msgs = validate_fields(&f);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("Mixed page and non-page fields"));
        assert!(msgs[0].contains("[p1]"));
        assert!(msgs[0].contains("[name]"));
    }

    #[test]
    fn nested_pages_are_reported_at_any_depth() {
        let f = fields(json!([
            { "type": "page", "key": "outer", "fields": [
                { "type": "row", "key": "r", "fields": [
                    { "type": "page", "key": "inner", "fields": [] }
                ]},
                { "type": "group", "key": "g", "fields": [
                    { "type": "page", "key": "deep", "fields": [] }
                ]}
            ]}
        ]));
        let msgs = validate_fields(&f);
        assert_eq!(msgs.len(), 2, "{:?}", msgs);
        assert!(msgs[0].contains("'inner' cannot be nested inside row 'r'"));
        assert!(msgs[1].contains("'deep' cannot be nested inside group 'g'"));
    }

    #[test]
    fn array_buttons_need_context_or_key() {
        let f = fields(json!([
            { "type": "array", "key": "contacts", "fields": [
                { "type": "input", "key": "name" },
                { "type": "removeArrayItem", "key": "remove" }
            ]},
            { "type": "addArrayItem", "key": "add", "arrayKey": "contacts" },
            { "type": "addArrayItem", "key": "orphan" },
            { "type": "popArrayItem", "key": "typo", "arrayKey": "contact" }
        ]));
        let msgs = validate_fields(&f);
        assert_eq!(msgs.len(), 2, "{:?}", msgs);
        assert!(msgs[0].contains("'orphan'"));
        assert!(msgs[0].contains("no arrayKey"));
        assert!(msgs[1].contains("unknown array 'contact'"));
    }

    #[test]
    fn duplicate_keys_and_foreign_derivations() {
        let f = fields(json!([
            { "type": "input", "key": "a" },
            { "type": "input", "key": "a" },
            { "type": "input", "key": "b", "logic": [
                { "type": "derivation", "targetField": "a", "expression": "1" }
            ]}
        ]));
        let msgs = validate_fields(&f);
        assert_eq!(msgs.len(), 2, "{:?}", msgs);
        assert!(msgs[0].contains("Duplicate key 'a' in the form root"));
        assert!(msgs[1].contains("must target its own field"));
    }

    #[test]
    fn arrays_inside_groups_resolve_by_path_or_key() {
        let f = fields(json!([
            { "type": "group", "key": "profile", "fields": [
                { "type": "array", "key": "phones", "fields": { "type": "input", "key": "n" } }
            ]},
            { "type": "addArrayItem", "key": "a1", "arrayKey": "profile.phones" },
            { "type": "addArrayItem", "key": "a2", "arrayKey": "phones" }
        ]));
        assert!(validate_fields(&f).is_empty());
    }
}
