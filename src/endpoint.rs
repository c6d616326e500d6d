//! One registered route: compiles a request into a backend query and renders the result.
//!
//! Per request the endpoint walks `Bound -> ConditionResolved -> PaginationResolved
//! -> Queried -> Rendered`. Any stage may abort; an aborted request writes nothing
//! from the selected response state.

use crate::codec;
use crate::config::{validator, DefinitionFile, EndpointDefinition, QuerySpec};
use crate::error::{AppError, ConfigError, QueryError};
use crate::expression::Environment;
use crate::querykit::{QueryOptions, QueryRequest};
use crate::response::{StateDefaults, StateTable, TemplateStore};
use crate::service::{ConditionBuilder, PaginationResolver};
use crate::state::AppState;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Bound,
    ConditionResolved,
    PaginationResolved,
    Queried,
    Rendered,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Bound => "bound",
            Stage::ConditionResolved => "condition_resolved",
            Stage::PaginationResolved => "pagination_resolved",
            Stage::Queried => "queried",
            Stage::Rendered => "rendered",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Endpoint {
    pub name: String,
    pub method: Method,
    pub uri: String,
    query: QuerySpec,
    states: StateTable,
}

/// Status, content type and rendered body of a completed request.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedResponse {
    pub state: String,
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: String,
}

impl IntoResponse for RenderedResponse {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

impl Endpoint {
    /// Validate `def`, build its state table and compile every template it references.
    pub fn build(
        file: &DefinitionFile,
        def: EndpointDefinition,
        templates: &mut TemplateStore,
        defaults: &StateDefaults,
    ) -> Result<Self, ConfigError> {
        validator::validate(&file.name, &def)?;
        let method = validator::parse_method(&def.method).ok_or_else(|| ConfigError::Validation {
            endpoint: file.name.clone(),
            message: format!("unsupported method '{}'", def.method),
        })?;
        let states = StateTable::load(&file.name, file.dir(), &def.response, defaults)?;
        for state in states.iter() {
            templates.load(&state.template)?;
        }
        Ok(Endpoint {
            name: file.name.clone(),
            method,
            uri: def.uri,
            query: def.query,
            states,
        })
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    /// Run one request against `env`.
    pub async fn execute(
        &self,
        env: &Environment,
        state: &AppState,
    ) -> Result<RenderedResponse, AppError> {
        self.trace(Stage::Bound);

        let evaluator = state.evaluator.as_ref();
        let condition =
            ConditionBuilder::new(evaluator, env).resolve(self.query.condition.as_ref())?;
        self.trace(Stage::ConditionResolved);

        let page = PaginationResolver::new(evaluator, env).resolve_for(&self.query)?;
        self.trace(Stage::PaginationResolved);

        let request = QueryRequest {
            table: self.query.table.clone(),
            condition,
            options: QueryOptions {
                limit: page.limit,
                offset: page.offset,
                order_by: self.query.order_by.clone(),
                descending: self.query.descending,
            },
        };
        let records = tokio::time::timeout(state.query_timeout, state.client.query(request))
            .await
            .map_err(|_| QueryError::Timeout)??;
        tracing::debug!(
            endpoint = %self.name,
            stage = Stage::Queried.as_str(),
            records = records.len(),
            "query returned"
        );

        let selected = self.states.select(records.len());
        let rows: Vec<Value> = records
            .iter()
            .map(|record| Value::Object(codec::decode_fields(&record.fields)))
            .collect();
        let body = state.renderer.render(&selected.template_key(), &json!({ "Records": rows }))?;
        self.trace(Stage::Rendered);

        Ok(RenderedResponse {
            state: selected.name.clone(),
            status: selected.code,
            content_type: selected.content_type.clone(),
            body,
        })
    }

    fn trace(&self, stage: Stage) {
        tracing::debug!(endpoint = %self.name, stage = stage.as_str(), "stage reached");
    }
}
