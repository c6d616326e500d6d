//! Raw endpoint definition types matching the JSON files under the settings path.

use crate::error::ExpressionError;
use crate::expression::{Environment, Evaluator};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub query: QuerySpec,
    #[serde(default)]
    pub response: ResponseSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub condition: Option<ConditionSpec>,
    #[serde(default)]
    pub pagination: Option<PaginationSpec>,
    /// Static limit; wins over the resolved pagination limit when > 0.
    #[serde(default)]
    pub limit: i64,
    /// Static offset; wins over the resolved pagination offset when > 0.
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub order_by: String,
    #[serde(default)]
    pub descending: bool,
}

/// A literal JSON value, or `{ "expression": "..." }` evaluated per request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Expression { expression: String },
    Literal(serde_json::Value),
}

impl ValueSpec {
    /// Literal as-is, or the expression evaluated against `env`. Failures are
    /// reported against `path`, e.g. `condition.conditions[0].value`.
    pub fn evaluate(
        &self,
        evaluator: &dyn Evaluator,
        env: &Environment,
        path: &str,
    ) -> Result<serde_json::Value, ExpressionError> {
        match self {
            ValueSpec::Literal(v) => Ok(v.clone()),
            ValueSpec::Expression { expression } => evaluator
                .evaluate(expression, env)
                .map_err(|e| ExpressionError::new(path, Some(expression), e.message)),
        }
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            ValueSpec::Expression { expression } => Some(expression),
            ValueSpec::Literal(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for ValueSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Object(mut obj)
                if obj.len() == 1 && obj.contains_key("expression") =>
            {
                match obj.remove("expression") {
                    Some(serde_json::Value::String(s)) => {
                        Ok(ValueSpec::Expression { expression: s })
                    }
                    _ => Err(serde::de::Error::custom("\"expression\" must be a string")),
                }
            }
            other => Ok(ValueSpec::Literal(other)),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(default)]
    pub name: Option<ValueSpec>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: Option<ValueSpec>,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaginationSpec {
    #[serde(default)]
    pub limit: Option<ValueSpec>,
    #[serde(default)]
    pub page: Option<ValueSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    /// Default content type for states that do not declare one.
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub state: BTreeMap<String, StateSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSpec {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub template: Option<String>,
}
