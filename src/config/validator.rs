//! Definition validation: everything that can be rejected before the first request.

use crate::config::{ConditionSpec, EndpointDefinition, ValueSpec};
use crate::error::ConfigError;
use axum::http::{HeaderValue, Method, StatusCode};
use regex::Regex;

const URI_PATTERN: &str = concat!(
    r"^/([A-Za-z0-9_\-.~]+|:[A-Za-z_][A-Za-z0-9_]*|\*[A-Za-z_][A-Za-z0-9_]*)?",
    r"(/([A-Za-z0-9_\-.~]+|:[A-Za-z_][A-Za-z0-9_]*|\*[A-Za-z_][A-Za-z0-9_]*))*/?$",
);

/// Supported definition methods, case-insensitive.
pub fn parse_method(raw: &str) -> Option<Method> {
    match raw.to_ascii_lowercase().as_str() {
        "get" => Some(Method::GET),
        "post" => Some(Method::POST),
        "put" => Some(Method::PUT),
        "delete" => Some(Method::DELETE),
        "patch" => Some(Method::PATCH),
        _ => None,
    }
}

pub fn validate(endpoint: &str, def: &EndpointDefinition) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::Validation {
        endpoint: endpoint.to_string(),
        message,
    };

    if parse_method(&def.method).is_none() {
        return Err(invalid(format!("unsupported method '{}'", def.method)));
    }
    let uri_pattern = Regex::new(URI_PATTERN).map_err(|e| invalid(format!("uri pattern: {e}")))?;
    if !uri_pattern.is_match(&def.uri) {
        return Err(invalid(format!("invalid uri pattern '{}'", def.uri)));
    }
    if def.query.table.trim().is_empty() {
        return Err(invalid("query.table is required".into()));
    }
    if let Some(condition) = &def.query.condition {
        validate_condition(condition, "condition").map_err(invalid)?;
    }

    let content_types = def
        .response
        .content_type
        .iter()
        .map(|ct| ("response.contentType".to_string(), ct))
        .chain(
            def.response
                .state
                .iter()
                .filter_map(|(name, s)| {
                    let at = format!("response.state.{name}.contentType");
                    s.content_type.as_ref().map(|ct| (at, ct))
                }),
        );
    for (at, ct) in content_types {
        if HeaderValue::from_str(ct).is_err() {
            return Err(invalid(format!("{at}: invalid content type '{ct}'")));
        }
    }
    for (name, state) in &def.response.state {
        if name.trim().is_empty() {
            return Err(invalid("response state names must not be empty".into()));
        }
        if let Some(code) = state.code {
            if StatusCode::from_u16(code).is_err() {
                return Err(invalid(format!("response.state.{name}.code: invalid status {code}")));
            }
        }
    }
    Ok(())
}

fn validate_condition(node: &ConditionSpec, path: &str) -> Result<(), String> {
    if let Some(ValueSpec::Literal(name)) = &node.name {
        if !name.is_string() {
            return Err(format!("{path}.name: literal field names must be strings"));
        }
    }
    for (i, child) in node.conditions.iter().enumerate() {
        validate_condition(child, &format!("{path}.conditions[{i}]"))?;
    }
    Ok(())
}
