//! Condition and derivation evaluation.

use std::{cell::RefCell, num::NonZeroUsize, rc::Rc};

use form_config::ConditionExpression;
use lru::LruCache;
use rhai::{
    AST, Dynamic, Engine, Scope,
    serde::{from_dynamic, to_dynamic},
};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{EvalError, EvaluationContext, Result, compare, path::value_at, regex_cache::RegexCache};

/// Compiled expressions kept per evaluator.
const AST_CACHE_CAPACITY: usize = 256;

/// Evaluates conditions and free-form expressions against an [`EvaluationContext`].
///
/// Free-form expressions are Rhai expressions with `formValue`, `fieldValue` and
/// `fieldPath` in scope. They are compiled in expression mode, so assignments and
/// statements are rejected and evaluation cannot write back into the form.
pub struct ConditionEvaluator {
    /// Sandboxed expression engine.
    engine: Engine,
    /// Compiled expressions keyed by source.
    asts: RefCell<LruCache<String, Rc<AST>>>,
    /// Compiled `matches` patterns.
    regexes: RegexCache,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionEvaluator {
    /// Create an evaluator with a sandboxed engine.
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.on_print(|s| debug!(target: "form_condition::rhai", "{}", s));
        engine.on_debug(|s, src, pos| {
            debug!(target: "form_condition::rhai", "{} @ {:?}:{:?}", s, src, pos);
        });
        engine.set_max_operations(200_000);
        engine.set_max_call_levels(64);
        engine.set_max_expr_depths(128, 64);

        let cap = NonZeroUsize::new(AST_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            engine,
            asts: RefCell::new(LruCache::new(cap)),
            regexes: RegexCache::default(),
        }
    }

    /// Evaluate `cond`, treating any failing operand as false.
    ///
    /// Failures are logged at `warn` with the field path, so one broken rule degrades
    /// to `false` without disturbing its siblings in an `or`.
    pub fn evaluate(&self, cond: &ConditionExpression, ctx: &EvaluationContext<'_>) -> bool {
        self.eval(cond, ctx, true).unwrap_or(false)
    }

    /// Evaluate `cond`, propagating the first failure.
    pub fn try_evaluate(
        &self,
        cond: &ConditionExpression,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        self.eval(cond, ctx, false)
    }

    /// Evaluate a derivation expression to an arbitrary value.
    pub fn evaluate_value(&self, expression: &str, ctx: &EvaluationContext<'_>) -> Result<Value> {
        let ast = self.compile(expression)?;
        let mut scope = Scope::new();
        scope.push_constant("formValue", to_engine(ctx.form_value)?);
        scope.push_constant("fieldValue", to_engine(ctx.field_value)?);
        scope.push_constant("fieldPath", ctx.field_path.to_string());
        let out: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &ast)
            .map_err(|e| EvalError::Script {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;
        from_dynamic::<Value>(&out).map_err(|e| EvalError::Conversion(e.to_string()))
    }

    /// Test `text` against `pattern` using the evaluator's regex cache.
    pub fn is_match(&self, pattern: &str, text: &str) -> Result<bool> {
        let re = self
            .regexes
            .get_or_compile(pattern)
            .map_err(|e| EvalError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(re.is_match(text))
    }

    /// Walk `cond`; with `lenient`, leaf failures become `false`.
    fn eval(
        &self,
        cond: &ConditionExpression,
        ctx: &EvaluationContext<'_>,
        lenient: bool,
    ) -> Result<bool> {
        match cond {
            ConditionExpression::Literal(b) => Ok(*b),
            ConditionExpression::And(items) => {
                for item in items {
                    if !self.eval(item, ctx, lenient)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionExpression::Or(items) => {
                for item in items {
                    if self.eval(item, ctx, lenient)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            leaf => match self.eval_leaf(leaf, ctx) {
                Err(e) if lenient => {
                    warn!(field = ctx.field_path, error = %e, "condition evaluation failed");
                    Ok(false)
                }
                other => other,
            },
        }
    }

    /// Evaluate a single non-composite condition.
    fn eval_leaf(&self, cond: &ConditionExpression, ctx: &EvaluationContext<'_>) -> Result<bool> {
        match cond {
            ConditionExpression::FieldValue {
                field_path,
                operator,
                value,
            } => {
                let actual = value_at(ctx.form_value, field_path);
                let out = compare::apply(*operator, actual, value, &self.regexes)?;
                trace!(path = %field_path, ?operator, ?actual, result = out, "fieldValue");
                Ok(out)
            }
            ConditionExpression::Expression(src) => self.evaluate_value(src, ctx).map(|v| truthy(&v)),
            ConditionExpression::Custom(name) => ctx.custom_functions.call(name, ctx),
            ConditionExpression::Literal(b) => Ok(*b),
            ConditionExpression::And(_) | ConditionExpression::Or(_) => {
                self.eval(cond, ctx, false)
            }
        }
    }

    /// Compile `src` in expression mode, caching the result.
    fn compile(&self, src: &str) -> Result<Rc<AST>> {
        if let Some(ast) = self.asts.borrow_mut().get(src).cloned() {
            return Ok(ast);
        }
        let ast = Rc::new(
            self.engine
                .compile_expression(src)
                .map_err(|e| EvalError::Script {
                    expression: src.to_string(),
                    message: e.to_string(),
                })?,
        );
        self.asts.borrow_mut().put(src.to_string(), ast.clone());
        Ok(ast)
    }
}

/// Move a JSON value into the expression engine.
fn to_engine(v: &Value) -> Result<Dynamic> {
    to_dynamic(v).map_err(|e| EvalError::Conversion(e.to_string()))
}

/// Truthiness of an expression result: null, false, zero, NaN and "" are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
