//! Pure evaluation of conditions and derivation expressions over form data.
//!
//! Nothing in this crate mutates form state: an [`EvaluationContext`] hands the
//! evaluator read-only views of the field value and the whole form value, plus the
//! host's registry of named custom functions.

use std::{collections::BTreeMap, fmt, rc::Rc};

use serde_json::Value;

mod compare;
mod error;
mod evaluator;
pub mod path;
mod regex_cache;

pub use compare::loose_eq;
pub use error::{EvalError, Result};
pub use evaluator::{ConditionEvaluator, truthy};
pub use path::{value_at, set_at};
pub use regex_cache::RegexCache;

/// Shared `null` used when a context has no field value.
static NULL: Value = Value::Null;

/// A host predicate callable from `custom` conditions and validators.
pub type CustomFn = Rc<dyn Fn(&EvaluationContext<'_>) -> bool>;

/// Named host functions, looked up by `custom` conditions and validators.
#[derive(Clone, Default)]
pub struct CustomFunctions {
    /// Registered functions by name.
    fns: BTreeMap<String, CustomFn>,
}

impl fmt::Debug for CustomFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fns.keys()).finish()
    }
}

impl CustomFunctions {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&EvaluationContext<'_>) -> bool + 'static,
    ) -> &mut Self {
        self.fns.insert(name.into(), Rc::new(f));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&EvaluationContext<'_>) -> bool + 'static,
    ) -> Self {
        self.register(name, f);
        self
    }

    /// Look up a function.
    pub fn get(&self, name: &str) -> Option<&CustomFn> {
        self.fns.get(name)
    }

    /// Call `name` with `ctx`.
    pub fn call(&self, name: &str, ctx: &EvaluationContext<'_>) -> Result<bool> {
        let f = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        Ok(f(ctx))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(String::as_str)
    }
}

/// The only data an evaluator may read.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Value of the field that owns the rule, or `null`.
    pub field_value: &'a Value,
    /// Current value of the whole form.
    pub form_value: &'a Value,
    /// Path of the field that owns the rule; empty at form level.
    pub field_path: &'a str,
    /// Host function registry.
    pub custom_functions: &'a CustomFunctions,
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("field_path", &self.field_path)
            .field("field_value", self.field_value)
            .finish_non_exhaustive()
    }
}

impl<'a> EvaluationContext<'a> {
    /// Form-level context with no owning field.
    pub fn new(form_value: &'a Value, custom_functions: &'a CustomFunctions) -> Self {
        Self {
            field_value: &NULL,
            form_value,
            field_path: "",
            custom_functions,
        }
    }

    /// The same context focused on the field at `path`.
    pub fn for_field(self, path: &'a str) -> Self {
        Self {
            field_value: value_at(self.form_value, path).unwrap_or(&NULL),
            field_path: path,
            ..self
        }
    }

    /// The same context with an explicit field value.
    pub fn with_field_value(self, value: &'a Value) -> Self {
        Self {
            field_value: value,
            ..self
        }
    }
}
