//! Scripted expressions evaluated against request-derived bindings.
//!
//! Every evaluation builds its own sandboxed [`rhai::Engine`] and [`rhai::Scope`];
//! nothing survives from one evaluation to the next. The bindings are pushed as
//! constants:
//!
//! - `query` - query-string parameters (first value of each name)
//! - `param` - path parameters
//! - `body`  - decoded JSON body, or `()` when there is none
//!
//! Helper available to scripts: `lookup(value, "a.b.0")` walks a dotted path
//! through maps and arrays and returns `()` when the path is absent.

use rhai::{Dynamic, Engine, Scope};
use serde_json::{Number, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

/// Read-only bindings built once per request.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub query: HashMap<String, String>,
    pub param: HashMap<String, String>,
    pub body: Option<Value>,
}

impl Environment {
    /// Build from raw query pairs; later duplicates of a name are discarded.
    pub fn new<Q>(query_pairs: Q, param: HashMap<String, String>, body: Option<Value>) -> Self
    where
        Q: IntoIterator<Item = (String, String)>,
    {
        let mut query = HashMap::new();
        for (k, v) in query_pairs {
            query.entry(k).or_insert(v);
        }
        Environment { query, param, body }
    }
}

pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expression: &str, env: &Environment) -> Result<Value, EvalError>;
}

/// Sandbox limits applied to every engine instance.
#[derive(Clone, Debug)]
pub struct EvaluatorLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for EvaluatorLimits {
    fn default() -> Self {
        EvaluatorLimits {
            max_operations: 100_000,
            max_call_levels: 16,
            max_expr_depth: 64,
            max_string_size: 10_000,
            max_array_size: 1_000,
            max_map_size: 1_000,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RhaiEvaluator {
    limits: EvaluatorLimits,
}

impl RhaiEvaluator {
    pub fn new(limits: EvaluatorLimits) -> Self {
        RhaiEvaluator { limits }
    }

    fn engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.limits.max_operations);
        engine.set_max_call_levels(self.limits.max_call_levels);
        engine.set_max_expr_depths(self.limits.max_expr_depth, self.limits.max_expr_depth);
        engine.set_max_string_size(self.limits.max_string_size);
        engine.set_max_array_size(self.limits.max_array_size);
        engine.set_max_map_size(self.limits.max_map_size);
        engine.disable_symbol("eval");
        engine.register_fn("lookup", |value: Dynamic, path: &str| -> Dynamic {
            let json = dynamic_to_json(value);
            lookup_path(&json, path).map(json_to_dynamic).unwrap_or(Dynamic::UNIT)
        });
        engine
    }
}

impl Evaluator for RhaiEvaluator {
    fn evaluate(&self, expression: &str, env: &Environment) -> Result<Value, EvalError> {
        let engine = self.engine();
        let mut scope = Scope::new();
        scope.push_constant("query", string_map(&env.query));
        scope.push_constant("param", string_map(&env.param));
        let body = env.body.as_ref().map(json_to_dynamic).unwrap_or(Dynamic::UNIT);
        scope.push_constant_dynamic("body", body);

        let result = engine
            .eval_with_scope::<Dynamic>(&mut scope, expression)
            .map_err(|e| EvalError { message: e.to_string() })?;
        Ok(dynamic_to_json(result))
    }
}

/// Walk `a.b.0` through objects and arrays. Numeric segments index arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        cursor = match cursor {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cursor)
}

fn string_map(source: &HashMap<String, String>) -> rhai::Map {
    source
        .iter()
        .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
        .collect()
}

fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let array: rhai::Array = items.iter().map(json_to_dynamic).collect();
            Dynamic::from(array)
        }
        Value::Object(obj) => {
            let mut map = rhai::Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

fn dynamic_to_json(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::from(i);
    }
    if let Ok(f) = value.as_float() {
        return Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if value.is_string() {
        return value.into_string().map(Value::String).unwrap_or(Value::Null);
    }
    if value.is_array() {
        return value
            .into_array()
            .map(|items| Value::Array(items.into_iter().map(dynamic_to_json).collect()))
            .unwrap_or(Value::Null);
    }
    if value.is_blob() {
        return value
            .into_blob()
            .map(|bytes| Value::Array(bytes.into_iter().map(Value::from).collect()))
            .unwrap_or(Value::Null);
    }
    if value.is_map() {
        return value
            .try_cast::<rhai::Map>()
            .map(|map| {
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
                        .collect(),
                )
            })
            .unwrap_or(Value::Null);
    }
    Value::String(value.to_string())
}
