//! Per-endpoint response state table.
//!
//! `success` and `no_results` always exist after load. A reserved state that is
//! not declared falls back to the declared `success` state (template and content
//! type; the status code stays the reserved default), then to the hard defaults.

use crate::config::{ResponseSpec, StateSpec};
use crate::error::ConfigError;
use axum::http::{HeaderValue, StatusCode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SUCCESS: &str = "success";
pub const NO_RESULTS: &str = "no_results";
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// Hard defaults, built once and passed by reference to every table load.
#[derive(Clone, Debug)]
pub struct StateDefaults {
    pub content_type: HeaderValue,
    pub success_code: StatusCode,
    pub no_results_code: StatusCode,
}

impl Default for StateDefaults {
    fn default() -> Self {
        StateDefaults {
            content_type: HeaderValue::from_static("application/json"),
            success_code: StatusCode::OK,
            no_results_code: StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResponseState {
    pub name: String,
    pub code: StatusCode,
    pub content_type: HeaderValue,
    /// Resolved template file.
    pub template: PathBuf,
}

impl ResponseState {
    /// Name the template is registered under in the template store.
    pub fn template_key(&self) -> String {
        self.template.display().to_string()
    }
}

#[derive(Clone, Debug)]
pub struct StateTable {
    success: ResponseState,
    no_results: ResponseState,
    custom: BTreeMap<String, ResponseState>,
}

struct LoadContext<'a> {
    endpoint: &'a str,
    dir: &'a Path,
    content_type: HeaderValue,
}

impl StateTable {
    /// Build the table for `endpoint`, resolving relative templates against `dir`.
    pub fn load(
        endpoint: &str,
        dir: &Path,
        spec: &ResponseSpec,
        defaults: &StateDefaults,
    ) -> Result<Self, ConfigError> {
        let content_type = match &spec.content_type {
            Some(ct) => header_value(endpoint, ct)?,
            None => defaults.content_type.clone(),
        };
        let ctx = LoadContext {
            endpoint,
            dir,
            content_type,
        };

        let declared_success = spec.state.get(SUCCESS);
        let success = match declared_success {
            Some(declared) => build_state(&ctx, SUCCESS, declared, defaults.success_code)?,
            None => default_state(&ctx, SUCCESS, defaults.success_code),
        };
        let no_results = match spec.state.get(NO_RESULTS) {
            Some(declared) => build_state(&ctx, NO_RESULTS, declared, defaults.no_results_code)?,
            None if declared_success.is_some() => ResponseState {
                name: NO_RESULTS.to_string(),
                code: defaults.no_results_code,
                content_type: success.content_type.clone(),
                template: success.template.clone(),
            },
            None => default_state(&ctx, NO_RESULTS, defaults.no_results_code),
        };

        let mut custom = BTreeMap::new();
        for (name, declared) in &spec.state {
            if name == SUCCESS || name == NO_RESULTS {
                continue;
            }
            custom.insert(name.clone(), build_state(&ctx, name, declared, defaults.success_code)?);
        }

        Ok(StateTable {
            success,
            no_results,
            custom,
        })
    }

    /// `no_results` for an empty result set, `success` otherwise.
    pub fn select(&self, result_count: usize) -> &ResponseState {
        if result_count == 0 {
            &self.no_results
        } else {
            &self.success
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResponseState> {
        match name {
            SUCCESS => Some(&self.success),
            NO_RESULTS => Some(&self.no_results),
            _ => self.custom.get(name),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseState> {
        [&self.success, &self.no_results].into_iter().chain(self.custom.values())
    }
}

fn build_state(
    ctx: &LoadContext<'_>,
    name: &str,
    declared: &StateSpec,
    default_code: StatusCode,
) -> Result<ResponseState, ConfigError> {
    let code = match declared.code {
        Some(code) => StatusCode::from_u16(code).map_err(|_| ConfigError::Validation {
            endpoint: ctx.endpoint.to_string(),
            message: format!("state '{name}': invalid status {code}"),
        })?,
        None => default_code,
    };
    let content_type = match &declared.content_type {
        Some(ct) => header_value(ctx.endpoint, ct)?,
        None => ctx.content_type.clone(),
    };
    Ok(ResponseState {
        name: name.to_string(),
        code,
        content_type,
        template: resolve_template(ctx.dir, ctx.endpoint, declared.template.as_deref()),
    })
}

fn default_state(ctx: &LoadContext<'_>, name: &str, code: StatusCode) -> ResponseState {
    ResponseState {
        name: name.to_string(),
        code,
        content_type: ctx.content_type.clone(),
        template: resolve_template(ctx.dir, ctx.endpoint, None),
    }
}

/// Absolute paths are kept; relative ones join `dir`. Defaults to `<endpoint>.tmpl`.
pub fn resolve_template(dir: &Path, endpoint: &str, template: Option<&str>) -> PathBuf {
    let file = match template {
        Some(t) if !t.trim().is_empty() => PathBuf::from(t),
        _ => PathBuf::from(format!("{endpoint}.{TEMPLATE_EXTENSION}")),
    };
    if file.is_absolute() {
        file
    } else {
        dir.join(file)
    }
}

fn header_value(endpoint: &str, raw: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(raw).map_err(|_| ConfigError::Validation {
        endpoint: endpoint.to_string(),
        message: format!("invalid content type '{raw}'"),
    })
}
