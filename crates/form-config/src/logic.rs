//! Conditional logic attached to fields: rules and the condition language they use.

use std::{collections::BTreeSet, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rule gating one reactive property of the field that owns it.
///
/// Multiple rules of the same kind on one field combine with OR: the property is
/// active when any of them holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogicRule {
    /// Hide the field while `condition` holds.
    Hidden {
        /// Gate for this rule.
        #[serde(default)]
        condition: ConditionExpression,
    },
    /// Mark the field required while `condition` holds.
    Required {
        /// Gate for this rule.
        #[serde(default)]
        condition: ConditionExpression,
    },
    /// Mark the field read-only while `condition` holds.
    Readonly {
        /// Gate for this rule.
        #[serde(default)]
        condition: ConditionExpression,
    },
    /// Disable the field while `condition` holds.
    Disabled {
        /// Gate for this rule.
        #[serde(default)]
        condition: ConditionExpression,
    },
    /// Continuously compute the owning field's value from the whole form.
    Derivation {
        /// Field receiving the value; must equal the owning field's key.
        #[serde(default, rename = "targetField", skip_serializing_if = "Option::is_none")]
        target_field: Option<String>,
        /// Expression producing the value.
        expression: String,
        /// Optional gate; the derivation only writes while it holds.
        #[serde(default)]
        condition: ConditionExpression,
    },
}

/// Reactive field property a non-derivation rule drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicKind {
    /// `hidden` binding.
    Hidden,
    /// `required` binding.
    Required,
    /// `readonly` binding.
    Readonly,
    /// `disabled` binding.
    Disabled,
    /// Value derivation.
    Derivation,
}

impl LogicRule {
    /// Which property this rule drives.
    pub fn kind(&self) -> LogicKind {
        match self {
            Self::Hidden { .. } => LogicKind::Hidden,
            Self::Required { .. } => LogicKind::Required,
            Self::Readonly { .. } => LogicKind::Readonly,
            Self::Disabled { .. } => LogicKind::Disabled,
            Self::Derivation { .. } => LogicKind::Derivation,
        }
    }

    /// The gating condition of this rule.
    pub fn condition(&self) -> &ConditionExpression {
        match self {
            Self::Hidden { condition }
            | Self::Required { condition }
            | Self::Readonly { condition }
            | Self::Disabled { condition }
            | Self::Derivation { condition, .. } => condition,
        }
    }
}

/// Comparison applied by a `fieldValue` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Strict equality (numbers compare numerically).
    Equals,
    /// Negation of `equals`.
    NotEquals,
    /// Numeric (or lexicographic for two strings) `>`.
    Greater,
    /// Numeric (or lexicographic for two strings) `<`.
    Less,
    /// Numeric (or lexicographic for two strings) `>=`.
    GreaterOrEqual,
    /// Numeric (or lexicographic for two strings) `<=`.
    LessOrEqual,
    /// Substring for strings, element membership for arrays.
    Contains,
    /// String prefix.
    StartsWith,
    /// String suffix.
    EndsWith,
    /// Regular expression match.
    Matches,
}

impl Operator {
    /// Operators that succeed when the compared value is absent.
    pub fn passes_when_absent(self) -> bool {
        matches!(self, Self::NotEquals)
    }
}

/// A pure, side-effect-free condition over the current form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub enum ConditionExpression {
    /// A constant.
    Literal(bool),
    /// Compare the value at `field_path` against `value`.
    FieldValue {
        /// Dotted path into the form value.
        field_path: String,
        /// Comparison to apply.
        operator: Operator,
        /// Right-hand side of the comparison.
        value: Value,
    },
    /// Free-form expression evaluated with `fieldValue` and `formValue` in scope.
    Expression(String),
    /// Host function looked up by name in the custom function registry.
    Custom(String),
    /// All conditions hold (short-circuits left to right).
    And(Vec<ConditionExpression>),
    /// Any condition holds (short-circuits left to right).
    Or(Vec<ConditionExpression>),
}

impl Default for ConditionExpression {
    fn default() -> Self {
        Self::Literal(true)
    }
}

impl From<bool> for ConditionExpression {
    fn from(b: bool) -> Self {
        Self::Literal(b)
    }
}

impl ConditionExpression {
    /// Build a `fieldValue` condition.
    pub fn field_value(path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::FieldValue {
            field_path: path.into(),
            operator,
            value: value.into(),
        }
    }

    /// Field paths this condition reads, when they can be determined statically.
    ///
    /// Returns `None` when the condition calls a host function, whose inputs are unknown.
    pub fn referenced_fields(&self) -> Option<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out).then_some(out)
    }

    /// Accumulate referenced paths into `out`; false when they cannot be known.
    fn collect_fields(&self, out: &mut BTreeSet<String>) -> bool {
        match self {
            Self::Literal(_) => true,
            Self::FieldValue { field_path, .. } => {
                out.insert(field_path.clone());
                true
            }
            Self::Expression(src) => {
                out.extend(expression_fields(src));
                true
            }
            Self::Custom(_) => false,
            Self::And(items) | Self::Or(items) => {
                items.iter().all(|c| c.collect_fields(out))
            }
        }
    }
}

/// Extract `formValue.<path>` references from a free-form expression.
pub fn expression_fields(src: &str) -> BTreeSet<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = RE
        .get_or_init(|| Regex::new(r"formValue((?:\.[A-Za-z_][A-Za-z0-9_]*)+)").ok())
        .as_ref()
    else {
        return BTreeSet::new();
    };
    re.captures_iter(src)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_start_matches('.').to_string())
        .collect()
}

/// Wire shape: either a bare boolean or an object tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ConditionRepr {
    /// `true` / `false`.
    Literal(bool),
    /// `{ "type": ..., ... }`.
    Tagged(TaggedCondition),
}

/// Tagged object form of a condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TaggedCondition {
    /// `{ "type": "fieldValue", "fieldPath", "operator", "value" }`
    FieldValue {
        /// Dotted path.
        #[serde(rename = "fieldPath")]
        field_path: String,
        /// Comparison.
        operator: Operator,
        /// Right-hand side.
        #[serde(default)]
        value: Value,
    },
    /// `{ "type": "javascript", "expression" }`; `formValue` is accepted as an alias.
    #[serde(alias = "formValue", alias = "expression")]
    Javascript {
        /// Expression source.
        expression: String,
    },
    /// `{ "type": "custom", "expression": "<function name>" }`
    Custom {
        /// Registered function name.
        #[serde(alias = "function")]
        expression: String,
    },
    /// `{ "type": "and", "conditions": [...] }`
    And {
        /// Operands.
        conditions: Vec<ConditionExpression>,
    },
    /// `{ "type": "or", "conditions": [...] }`
    Or {
        /// Operands.
        conditions: Vec<ConditionExpression>,
    },
}

impl From<ConditionRepr> for ConditionExpression {
    fn from(repr: ConditionRepr) -> Self {
        match repr {
            ConditionRepr::Literal(b) => Self::Literal(b),
            ConditionRepr::Tagged(t) => match t {
                TaggedCondition::FieldValue {
                    field_path,
                    operator,
                    value,
                } => Self::FieldValue {
                    field_path,
                    operator,
                    value,
                },
                TaggedCondition::Javascript { expression } => Self::Expression(expression),
                TaggedCondition::Custom { expression } => Self::Custom(expression),
                TaggedCondition::And { conditions } => Self::And(conditions),
                TaggedCondition::Or { conditions } => Self::Or(conditions),
            },
        }
    }
}

impl From<ConditionExpression> for ConditionRepr {
    fn from(cond: ConditionExpression) -> Self {
        match cond {
            ConditionExpression::Literal(b) => Self::Literal(b),
            ConditionExpression::FieldValue {
                field_path,
                operator,
                value,
            } => Self::Tagged(TaggedCondition::FieldValue {
                field_path,
                operator,
                value,
            }),
            ConditionExpression::Expression(expression) => {
                Self::Tagged(TaggedCondition::Javascript { expression })
            }
            ConditionExpression::Custom(expression) => {
                Self::Tagged(TaggedCondition::Custom { expression })
            }
            ConditionExpression::And(conditions) => {
                Self::Tagged(TaggedCondition::And { conditions })
            }
            ConditionExpression::Or(conditions) => Self::Tagged(TaggedCondition::Or { conditions }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_nested_conditions() {
        let cond: ConditionExpression = serde_json::from_value(json!({
            "type": "and",
            "conditions": [
                true,
                { "type": "fieldValue", "fieldPath": "age", "operator": "greaterOrEqual", "value": 18 },
                { "type": "javascript", "expression": "formValue.country == \"NZ\"" }
            ]
        }))
        .unwrap();
        let ConditionExpression::And(items) = &cond else {
            panic!("expected and: {:?}", cond);
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ConditionExpression::Literal(true));
        assert_eq!(
            items[1],
            ConditionExpression::field_value("age", Operator::GreaterOrEqual, 18)
        );
        let fields = cond.referenced_fields().unwrap();
        assert_eq!(
            fields.into_iter().collect::<Vec<_>>(),
            vec!["age".to_string(), "country".to_string()]
        );
    }

    #[test]
    fn custom_conditions_have_unknown_inputs() {
        let cond: ConditionExpression =
            serde_json::from_value(json!({ "type": "custom", "expression": "isAdult" })).unwrap();
        assert_eq!(cond, ConditionExpression::Custom("isAdult".into()));
        assert!(cond.referenced_fields().is_none());
    }

    #[test]
    fn derivation_rule_round_trips_target_field() {
        let rule: LogicRule = serde_json::from_value(json!({
            "type": "derivation",
            "targetField": "fullName",
            "expression": "formValue.firstName + \" \" + formValue.lastName"
        }))
        .unwrap();
        assert_eq!(rule.kind(), LogicKind::Derivation);
        assert_eq!(rule.condition(), &ConditionExpression::Literal(true));
        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["targetField"], "fullName");
    }

    #[test]
    fn expression_fields_follow_nested_paths() {
        let got = expression_fields("formValue.address.city == \"x\" && formValue.zip > 3");
        assert!(got.contains("address.city"));
        assert!(got.contains("zip"));
    }
}
