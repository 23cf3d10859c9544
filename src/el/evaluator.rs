use super::expression::{Expression, Segment, is_expression, parse_template, strip_delimiters};
use super::Value;
use crate::error::ElError;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

/// The seam between navigation and an expression language engine.
///
/// Implementations evaluate value expressions (conditions, outcomes, parameter
/// values), invoke method expressions and assign values for flow parameter passing.
/// Input that is not an expression must evaluate to itself as text.
pub trait ExpressionEvaluator: Send + Sync {
    fn value(&self, expression: &str) -> Result<Value, ElError>;

    fn invoke(&self, expression: &str, params: &[Value]) -> Result<Value, ElError>;

    fn set_value(&self, expression: &str, value: Value) -> Result<(), ElError>;
}

/// A bound method callable from a method expression.
pub type MethodBinding = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A self-contained evaluator over a flat map of dotted variable names.
///
/// `#{booking.confirmed}` reads the variable `"booking.confirmed"`; unknown
/// variables read as `Null`. Method expressions resolve against bindings
/// registered with [`ScopedEvaluator::with_method`].
#[derive(Default)]
pub struct ScopedEvaluator {
    variables: RwLock<AHashMap<String, Value>>,
    methods: AHashMap<String, MethodBinding>,
}

impl ScopedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(method));
        self
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        if let Ok(mut variables) = self.variables.write() {
            variables.insert(name.to_string(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Value {
        self.variables
            .read()
            .ok()
            .and_then(|variables| variables.get(name).cloned())
            .unwrap_or(Value::Null)
    }

    fn eval(&self, expr: &Expression) -> Result<Value, ElError> {
        match expr {
            Expression::Literal(v) => Ok(v.clone()),
            Expression::Variable(name) => Ok(self.get(name)),
            Expression::Not(v) => {
                let inner = self.eval(v)?;
                Ok(Value::Bool(!self.truthy(&inner, "!")?))
            }
            Expression::And(l, r) => {
                let left = self.eval(l)?;
                if !self.truthy(&left, "&&")? {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(r)?;
                Ok(Value::Bool(self.truthy(&right, "&&")?))
            }
            Expression::Or(l, r) => {
                let left = self.eval(l)?;
                if self.truthy(&left, "||")? {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(r)?;
                Ok(Value::Bool(self.truthy(&right, "||")?))
            }
            Expression::Equal(l, r) => Ok(Value::Bool(loosely_equal(&self.eval(l)?, &self.eval(r)?))),
            Expression::NotEqual(l, r) => {
                Ok(Value::Bool(!loosely_equal(&self.eval(l)?, &self.eval(r)?)))
            }
        }
    }

    fn truthy(&self, value: &Value, operation: &str) -> Result<bool, ElError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Text(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") => {
                Ok(s.eq_ignore_ascii_case("true"))
            }
            other => Err(ElError::TypeMismatch {
                operation: operation.to_string(),
                expected: "Bool".to_string(),
                found: other.clone(),
            }),
        }
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Text(b)) | (Value::Text(b), Value::Number(a)) => {
            b.parse::<f64>().map(|b| b == *a).unwrap_or(false)
        }
        (Value::Bool(a), Value::Text(b)) | (Value::Text(b), Value::Bool(a)) => {
            b.eq_ignore_ascii_case(if *a { "true" } else { "false" })
        }
        (l, r) => l == r,
    }
}

impl ExpressionEvaluator for ScopedEvaluator {
    fn value(&self, expression: &str) -> Result<Value, ElError> {
        if !is_expression(expression) {
            return Ok(Value::Text(expression.to_string()));
        }
        if strip_delimiters(expression.trim()).is_some() {
            return self.eval(&Expression::parse(expression)?);
        }
        let mut rendered = String::new();
        for segment in parse_template(expression)? {
            match segment {
                Segment::Text(text) => rendered.push_str(&text),
                Segment::Expr(expr) => {
                    if let Some(text) = self.eval(&expr)?.as_string() {
                        rendered.push_str(&text);
                    }
                }
            }
        }
        Ok(Value::Text(rendered))
    }

    fn invoke(&self, expression: &str, params: &[Value]) -> Result<Value, ElError> {
        let name = strip_delimiters(expression.trim())
            .ok_or_else(|| ElError::Syntax {
                expression: expression.to_string(),
                message: "a method expression must be delimited by '#{' and '}'".to_string(),
            })?
            .trim_end_matches("()");
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| ElError::MethodNotFound(expression.to_string()))?;
        method(params).map_err(|message| ElError::MethodFailed {
            expression: expression.to_string(),
            message,
        })
    }

    fn set_value(&self, expression: &str, value: Value) -> Result<(), ElError> {
        match Expression::parse(expression)? {
            Expression::Variable(name) => {
                self.set(&name, value);
                Ok(())
            }
            _ => Err(ElError::NotAssignable(expression.to_string())),
        }
    }
}
