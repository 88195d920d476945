//! Field definitions: the nodes of a form configuration tree.

use std::{collections::BTreeMap, fmt, slice};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::LogicRule;

/// Attributes every field variant carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBase {
    /// Key, unique within the owning container.
    pub key: String,
    /// Optional display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional CSS-style class names passed to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Optional tab order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_index: Option<i32>,
    /// Renderer-specific configuration bag.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    /// Ordered conditional rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logic: Vec<LogicRule>,
    /// Static hidden flag (rules may still hide the field).
    #[serde(default)]
    pub hidden: bool,
    /// Static disabled flag.
    #[serde(default)]
    pub disabled: bool,
    /// Static read-only flag.
    #[serde(default)]
    pub readonly: bool,
    /// Static required flag.
    #[serde(default)]
    pub required: bool,
    /// Shorthand: value must look like an email address.
    #[serde(default)]
    pub email: bool,
    /// Shorthand: numeric minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Shorthand: numeric maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Shorthand: minimum string/array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Shorthand: maximum string/array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Shorthand: regular expression the string value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Explicit validator list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorSpec>,
    /// Messages keyed by validator kind; these win over form-level defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_messages: BTreeMap<String, String>,
}

impl FieldBase {
    /// Construct a base with only `key` set.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// All validators that apply, shorthand flags first, in a stable order.
    pub fn effective_validators(&self) -> Vec<ValidatorSpec> {
        let mut out = Vec::new();
        if self.required {
            out.push(ValidatorSpec::Required);
        }
        if self.email {
            out.push(ValidatorSpec::Email);
        }
        if let Some(v) = self.min {
            out.push(ValidatorSpec::Min { value: v });
        }
        if let Some(v) = self.max {
            out.push(ValidatorSpec::Max { value: v });
        }
        if let Some(v) = self.min_length {
            out.push(ValidatorSpec::MinLength { value: v });
        }
        if let Some(v) = self.max_length {
            out.push(ValidatorSpec::MaxLength { value: v });
        }
        if let Some(p) = &self.pattern {
            out.push(ValidatorSpec::Pattern { value: p.clone() });
        }
        for v in &self.validators {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
        out
    }
}

/// A declared validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidatorSpec {
    /// Value must be non-empty.
    Required,
    /// Value must look like an email address.
    Email,
    /// Numeric minimum.
    Min {
        /// Bound.
        value: f64,
    },
    /// Numeric maximum.
    Max {
        /// Bound.
        value: f64,
    },
    /// Minimum length.
    MinLength {
        /// Bound.
        value: usize,
    },
    /// Maximum length.
    MaxLength {
        /// Bound.
        value: usize,
    },
    /// Regular expression.
    Pattern {
        /// Pattern source.
        value: String,
    },
    /// Host-provided predicate looked up by name.
    Custom {
        /// Registered function name.
        name: String,
        /// Message key used when the predicate fails.
        #[serde(default, rename = "errorKey", skip_serializing_if = "Option::is_none")]
        error_key: Option<String>,
    },
}

impl ValidatorSpec {
    /// Key used to look up the validation message for this validator.
    pub fn message_key(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Email => "email",
            Self::Min { .. } => "min",
            Self::Max { .. } => "max",
            Self::MinLength { .. } => "minLength",
            Self::MaxLength { .. } => "maxLength",
            Self::Pattern { .. } => "pattern",
            Self::Custom { name, error_key } => error_key.as_deref().unwrap_or(name),
        }
    }
}

/// Declared type of a leaf field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    /// Free text.
    String,
    /// Number.
    Number,
    /// True/false.
    Boolean,
    /// ISO-8601 date string.
    Date,
    /// List of values.
    Array,
    /// Arbitrary JSON.
    Any,
}

/// One selectable option of a select/radio/multi-checkbox field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    /// Display text.
    pub label: String,
    /// Submitted value.
    pub value: Value,
    /// Whether the option is greyed out.
    #[serde(default)]
    pub disabled: bool,
}

/// A value-bearing field (input, select, checkbox, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafField {
    /// Shared attributes.
    #[serde(flatten)]
    pub base: FieldBase,
    /// Declared value type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    /// Initial value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Choices for select-like fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

/// A layout container (row, group, page).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerField {
    /// Shared attributes.
    #[serde(flatten)]
    pub base: FieldBase,
    /// Ordered children.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// Item template of an array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayTemplate {
    /// A single field: a plain leaf yields scalar items, a group yields object items.
    Single(Box<FieldDefinition>),
    /// Several fields: items are objects keyed by each field's key.
    Multiple(Vec<FieldDefinition>),
}

impl Default for ArrayTemplate {
    fn default() -> Self {
        Self::Multiple(Vec::new())
    }
}

impl ArrayTemplate {
    /// The template's top-level fields.
    pub fn fields(&self) -> &[FieldDefinition] {
        match self {
            Self::Single(f) => slice::from_ref(f.as_ref()),
            Self::Multiple(v) => v,
        }
    }

    /// True when each item is a bare scalar (single non-container template field).
    pub fn is_scalar(&self) -> bool {
        match self {
            Self::Single(f) => f.kind().is_value(),
            Self::Multiple(_) => false,
        }
    }
}

/// A repeating group of items built from a shared template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayField {
    /// Shared attributes.
    #[serde(flatten)]
    pub base: FieldBase,
    /// Shape of one item.
    #[serde(default, rename = "fields")]
    pub template: ArrayTemplate,
    /// Initial items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Vec<Value>>,
}

/// A button that dispatches an event when pressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonField {
    /// Shared attributes.
    #[serde(flatten)]
    pub base: FieldBase,
    /// Target array for array buttons placed outside the array's template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_key: Option<String>,
    /// Explicit index for insert/remove buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Event type name for generic `button` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Event arguments; strings starting with `$` are resolved from context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_args: Vec<Value>,
}

/// Display-only text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    /// Shared attributes.
    #[serde(flatten)]
    pub base: FieldBase,
}

/// One declarative node in the form configuration tree, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[allow(missing_docs)]
pub enum FieldDefinition {
    #[serde(rename = "input")]
    Input(LeafField),
    #[serde(rename = "select")]
    Select(LeafField),
    #[serde(rename = "checkbox")]
    Checkbox(LeafField),
    #[serde(rename = "radio")]
    Radio(LeafField),
    #[serde(rename = "slider")]
    Slider(LeafField),
    #[serde(rename = "textarea")]
    Textarea(LeafField),
    #[serde(rename = "datepicker")]
    Datepicker(LeafField),
    #[serde(rename = "toggle")]
    Toggle(LeafField),
    #[serde(rename = "hidden")]
    Hidden(LeafField),
    #[serde(rename = "multi-checkbox")]
    MultiCheckbox(LeafField),
    #[serde(rename = "row")]
    Row(ContainerField),
    #[serde(rename = "group")]
    Group(ContainerField),
    #[serde(rename = "page")]
    Page(ContainerField),
    #[serde(rename = "array")]
    Array(ArrayField),
    #[serde(rename = "submit")]
    Submit(ButtonField),
    #[serde(rename = "next")]
    Next(ButtonField),
    #[serde(rename = "previous")]
    Previous(ButtonField),
    #[serde(rename = "addArrayItem")]
    AddArrayItem(ButtonField),
    #[serde(rename = "prependArrayItem")]
    PrependArrayItem(ButtonField),
    #[serde(rename = "insertArrayItem")]
    InsertArrayItem(ButtonField),
    #[serde(rename = "removeArrayItem")]
    RemoveArrayItem(ButtonField),
    #[serde(rename = "popArrayItem")]
    PopArrayItem(ButtonField),
    #[serde(rename = "shiftArrayItem")]
    ShiftArrayItem(ButtonField),
    #[serde(rename = "button")]
    Button(ButtonField),
    #[serde(rename = "text")]
    Text(TextField),
}

/// Discriminant of [`FieldDefinition`], usable as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum FieldKind {
    Input,
    Select,
    Checkbox,
    Radio,
    Slider,
    Textarea,
    Datepicker,
    Toggle,
    Hidden,
    MultiCheckbox,
    Row,
    Group,
    Page,
    Array,
    Submit,
    Next,
    Previous,
    AddArrayItem,
    PrependArrayItem,
    InsertArrayItem,
    RemoveArrayItem,
    PopArrayItem,
    ShiftArrayItem,
    Button,
    Text,
}

impl FieldKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 25] = [
        Self::Input,
        Self::Select,
        Self::Checkbox,
        Self::Radio,
        Self::Slider,
        Self::Textarea,
        Self::Datepicker,
        Self::Toggle,
        Self::Hidden,
        Self::MultiCheckbox,
        Self::Row,
        Self::Group,
        Self::Page,
        Self::Array,
        Self::Submit,
        Self::Next,
        Self::Previous,
        Self::AddArrayItem,
        Self::PrependArrayItem,
        Self::InsertArrayItem,
        Self::RemoveArrayItem,
        Self::PopArrayItem,
        Self::ShiftArrayItem,
        Self::Button,
        Self::Text,
    ];

    /// Wire name used in the `type` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Slider => "slider",
            Self::Textarea => "textarea",
            Self::Datepicker => "datepicker",
            Self::Toggle => "toggle",
            Self::Hidden => "hidden",
            Self::MultiCheckbox => "multi-checkbox",
            Self::Row => "row",
            Self::Group => "group",
            Self::Page => "page",
            Self::Array => "array",
            Self::Submit => "submit",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::AddArrayItem => "addArrayItem",
            Self::PrependArrayItem => "prependArrayItem",
            Self::InsertArrayItem => "insertArrayItem",
            Self::RemoveArrayItem => "removeArrayItem",
            Self::PopArrayItem => "popArrayItem",
            Self::ShiftArrayItem => "shiftArrayItem",
            Self::Button => "button",
            Self::Text => "text",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// True for leaf kinds that own a value.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Self::Input
                | Self::Select
                | Self::Checkbox
                | Self::Radio
                | Self::Slider
                | Self::Textarea
                | Self::Datepicker
                | Self::Toggle
                | Self::Hidden
                | Self::MultiCheckbox
        )
    }

    /// True for row/group/page.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Row | Self::Group | Self::Page)
    }

    /// True for every button kind.
    pub fn is_button(self) -> bool {
        self.array_action().is_some()
            || matches!(self, Self::Submit | Self::Next | Self::Previous | Self::Button)
    }

    /// Array mutation performed by an array button kind.
    pub fn array_action(self) -> Option<ArrayAction> {
        match self {
            Self::AddArrayItem => Some(ArrayAction::Append),
            Self::PrependArrayItem => Some(ArrayAction::Prepend),
            Self::InsertArrayItem => Some(ArrayAction::Insert),
            Self::RemoveArrayItem => Some(ArrayAction::Remove),
            Self::PopArrayItem => Some(ArrayAction::Pop),
            Self::ShiftArrayItem => Some(ArrayAction::Shift),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Array mutation triggered by an array button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayAction {
    /// Add at the end (or at an explicit index).
    Append,
    /// Add at index 0.
    Prepend,
    /// Add at a given index.
    Insert,
    /// Remove at an index (default: last).
    Remove,
    /// Remove the last item.
    Pop,
    /// Remove the first item.
    Shift,
}

impl FieldDefinition {
    /// Variant discriminant.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Input(_) => FieldKind::Input,
            Self::Select(_) => FieldKind::Select,
            Self::Checkbox(_) => FieldKind::Checkbox,
            Self::Radio(_) => FieldKind::Radio,
            Self::Slider(_) => FieldKind::Slider,
            Self::Textarea(_) => FieldKind::Textarea,
            Self::Datepicker(_) => FieldKind::Datepicker,
            Self::Toggle(_) => FieldKind::Toggle,
            Self::Hidden(_) => FieldKind::Hidden,
            Self::MultiCheckbox(_) => FieldKind::MultiCheckbox,
            Self::Row(_) => FieldKind::Row,
            Self::Group(_) => FieldKind::Group,
            Self::Page(_) => FieldKind::Page,
            Self::Array(_) => FieldKind::Array,
            Self::Submit(_) => FieldKind::Submit,
            Self::Next(_) => FieldKind::Next,
            Self::Previous(_) => FieldKind::Previous,
            Self::AddArrayItem(_) => FieldKind::AddArrayItem,
            Self::PrependArrayItem(_) => FieldKind::PrependArrayItem,
            Self::InsertArrayItem(_) => FieldKind::InsertArrayItem,
            Self::RemoveArrayItem(_) => FieldKind::RemoveArrayItem,
            Self::PopArrayItem(_) => FieldKind::PopArrayItem,
            Self::ShiftArrayItem(_) => FieldKind::ShiftArrayItem,
            Self::Button(_) => FieldKind::Button,
            Self::Text(_) => FieldKind::Text,
        }
    }

    /// Shared attributes.
    pub fn base(&self) -> &FieldBase {
        match self {
            Self::Input(f)
            | Self::Select(f)
            | Self::Checkbox(f)
            | Self::Radio(f)
            | Self::Slider(f)
            | Self::Textarea(f)
            | Self::Datepicker(f)
            | Self::Toggle(f)
            | Self::Hidden(f)
            | Self::MultiCheckbox(f) => &f.base,
            Self::Row(c) | Self::Group(c) | Self::Page(c) => &c.base,
            Self::Array(a) => &a.base,
            Self::Submit(b)
            | Self::Next(b)
            | Self::Previous(b)
            | Self::AddArrayItem(b)
            | Self::PrependArrayItem(b)
            | Self::InsertArrayItem(b)
            | Self::RemoveArrayItem(b)
            | Self::PopArrayItem(b)
            | Self::ShiftArrayItem(b)
            | Self::Button(b) => &b.base,
            Self::Text(t) => &t.base,
        }
    }

    /// The field's key.
    pub fn key(&self) -> &str {
        &self.base().key
    }

    /// Leaf payload for value-bearing variants.
    pub fn as_leaf(&self) -> Option<&LeafField> {
        match self {
            Self::Input(f)
            | Self::Select(f)
            | Self::Checkbox(f)
            | Self::Radio(f)
            | Self::Slider(f)
            | Self::Textarea(f)
            | Self::Datepicker(f)
            | Self::Toggle(f)
            | Self::Hidden(f)
            | Self::MultiCheckbox(f) => Some(f),
            _ => None,
        }
    }

    /// Button payload for button variants.
    pub fn as_button(&self) -> Option<&ButtonField> {
        match self {
            Self::Submit(b)
            | Self::Next(b)
            | Self::Previous(b)
            | Self::AddArrayItem(b)
            | Self::PrependArrayItem(b)
            | Self::InsertArrayItem(b)
            | Self::RemoveArrayItem(b)
            | Self::PopArrayItem(b)
            | Self::ShiftArrayItem(b)
            | Self::Button(b) => Some(b),
            _ => None,
        }
    }

    /// Array payload.
    pub fn as_array(&self) -> Option<&ArrayField> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Children of row/group/page containers; empty otherwise.
    pub fn children(&self) -> &[FieldDefinition] {
        match self {
            Self::Row(c) | Self::Group(c) | Self::Page(c) => &c.fields,
            _ => &[],
        }
    }

    /// True for `page` fields.
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}
