//! Condition builder: declared condition tree + request bindings -> resolved tree.

use crate::codec;
use crate::config::{ConditionSpec, ValueSpec};
use crate::error::ExpressionError;
use crate::expression::{Environment, Evaluator};
use crate::querykit::proto::WireValue;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operator {
    #[default]
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Unknown or missing operators fall back to `Eq`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Operator::Eq;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            ">" | "gt" => Operator::Gt,
            ">=" | "gte" => Operator::Gte,
            "<" | "lt" => Operator::Lt,
            "<=" | "lte" => Operator::Lte,
            _ => Operator::Eq,
        }
    }
}

/// A condition node with every expression evaluated and its value encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCondition {
    pub name: String,
    pub operator: Operator,
    pub value: Option<WireValue>,
    pub conditions: Vec<ResolvedCondition>,
}

pub struct ConditionBuilder<'a> {
    evaluator: &'a dyn Evaluator,
    env: &'a Environment,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(evaluator: &'a dyn Evaluator, env: &'a Environment) -> Self {
        ConditionBuilder { evaluator, env }
    }

    /// Resolve the declared tree pre-order. `Ok(None)` when nothing was declared.
    pub fn resolve(
        &self,
        declared: Option<&ConditionSpec>,
    ) -> Result<Option<ResolvedCondition>, ExpressionError> {
        declared.map(|node| self.resolve_node(node, "condition")).transpose()
    }

    fn resolve_node(
        &self,
        node: &ConditionSpec,
        path: &str,
    ) -> Result<ResolvedCondition, ExpressionError> {
        let name = match &node.name {
            Some(spec) => self.resolve_name(spec, &format!("{path}.name"))?,
            None => String::new(),
        };
        let value = match &node.value {
            Some(spec) => Some(self.resolve_value(spec, &format!("{path}.value"))?),
            None => None,
        };
        let mut conditions = Vec::with_capacity(node.conditions.len());
        for (i, child) in node.conditions.iter().enumerate() {
            conditions.push(self.resolve_node(child, &format!("{path}.conditions[{i}]"))?);
        }
        Ok(ResolvedCondition {
            name,
            operator: Operator::parse(node.operator.as_deref()),
            value,
            conditions,
        })
    }

    fn resolve_name(&self, spec: &ValueSpec, path: &str) -> Result<String, ExpressionError> {
        match spec.evaluate(self.evaluator, self.env, path)? {
            Value::String(s) => Ok(s),
            Value::Null => Err(ExpressionError::new(
                path,
                spec.expression(),
                "field name resolved to no value",
            )),
            other => Ok(other.to_string()),
        }
    }

    fn resolve_value(&self, spec: &ValueSpec, path: &str) -> Result<WireValue, ExpressionError> {
        let value = spec.evaluate(self.evaluator, self.env, path)?;
        codec::encode(&value)
            .map_err(|e| ExpressionError::new(path, spec.expression(), e.to_string()))
    }
}
