//! Declarative form configuration: the field tree, conditional logic, loading, and
//! static validation.
//!
//! A configuration is an immutable tree of [`FieldDefinition`] nodes created once at
//! form-build time. Everything reactive lives downstream in the engine.

use std::{collections::BTreeMap, fmt};

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{
        MapAccess, SeqAccess, Visitor,
        value::{MapAccessDeserializer, SeqAccessDeserializer},
    },
};

mod defaults;
mod error;
mod field;
mod loader;
mod logic;
mod validate;

#[cfg(test)]
mod test_parse;

pub use defaults::{array_item_default, builtin_validation_messages, default_value_tree, leaf_default};
pub use error::{Error, excerpt_at};
pub use field::{
    ArrayAction, ArrayField, ArrayTemplate, ButtonField, ContainerField, FieldBase,
    FieldDefinition, FieldKind, FieldOption, LeafField, TextField, ValidatorSpec, ValueType,
};
pub use loader::{Format, load_from_path, load_from_str, parse_from_str};
pub use logic::{ConditionExpression, LogicKind, LogicRule, Operator, expression_fields};
pub use validate::validate_fields;

/// Root of a form configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FormConfigRepr")]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    /// Root fields; either all pages or none.
    pub fields: Vec<FieldDefinition>,
    /// Form-level validation messages, overridden per field by `validationMessages`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_validation_messages: BTreeMap<String, String>,
    /// Page shown first in a paged form; clamped into range at mount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_page_index: Option<usize>,
}

impl FormConfig {
    /// Build a configuration from root fields with no form-level options.
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Run static validation and return one message per authoring mistake.
    pub fn validate(&self) -> Vec<String> {
        validate_fields(&self.fields)
    }

    /// Consume the configuration, failing with [`Error::Validation`] on any mistake.
    pub fn validated(self) -> Result<Self, Error> {
        let messages = self.validate();
        if messages.is_empty() {
            Ok(self)
        } else {
            Err(Error::Validation {
                path: None,
                messages,
            })
        }
    }

    /// True when the root fields are pages.
    pub fn is_paged(&self) -> bool {
        self.fields.first().is_some_and(FieldDefinition::is_page)
    }

    /// Root page fields, in order; empty for single-page forms.
    pub fn pages(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_page())
    }

    /// Validation messages with built-ins overlaid by the form-level defaults.
    pub fn merged_default_messages(&self) -> BTreeMap<String, String> {
        let mut out = builtin_validation_messages();
        out.extend(
            self.default_validation_messages
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        out
    }
}

/// Accepted document shapes: the full object or a bare list of fields.
///
/// The shape is chosen from the first token, so errors inside the document keep
/// their position.
enum FormConfigRepr {
    /// `{ "fields": [...], ... }`
    Document(FormConfigDoc),
    /// `[ ... ]`
    Bare(Vec<FieldDefinition>),
}

/// Object form of the root document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormConfigDoc {
    /// Root fields.
    fields: Vec<FieldDefinition>,
    /// Form-level messages.
    #[serde(default)]
    default_validation_messages: BTreeMap<String, String>,
    /// First page.
    #[serde(default)]
    initial_page_index: Option<usize>,
}

impl<'de> Deserialize<'de> for FormConfigRepr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ReprVisitor)
    }
}

/// Dispatches on object vs list.
struct ReprVisitor;

impl<'de> Visitor<'de> for ReprVisitor {
    type Value = FormConfigRepr;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a form document object or a list of fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        FormConfigDoc::deserialize(MapAccessDeserializer::new(map)).map(FormConfigRepr::Document)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        Vec::deserialize(SeqAccessDeserializer::new(seq)).map(FormConfigRepr::Bare)
    }
}

impl From<FormConfigRepr> for FormConfig {
    fn from(repr: FormConfigRepr) -> Self {
        match repr {
            FormConfigRepr::Document(d) => Self {
                fields: d.fields,
                default_validation_messages: d.default_validation_messages,
                initial_page_index: d.initial_page_index,
            },
            FormConfigRepr::Bare(fields) => Self::new(fields),
        }
    }
}
