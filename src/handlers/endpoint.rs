//! The one handler every registered endpoint is served by.

use crate::endpoint::{Endpoint, RenderedResponse};
use crate::error::AppError;
use crate::expression::Environment;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Bind the request to `endpoint` and run it. Routes without path parameters
/// yield no `Path`; duplicate query keys keep their first value.
pub async fn handle(
    endpoint: Arc<Endpoint>,
    State(state): State<AppState>,
    params: Option<Path<HashMap<String, String>>>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<RenderedResponse, AppError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("request", endpoint = %endpoint.name, request_id = %request_id);
    async move {
        let params = params.map(|Path(p)| p).unwrap_or_default();
        let env = Environment::new(query, params, decode_body(&body));
        let result = endpoint.execute(&env, &state).await;
        match &result {
            Ok(rendered) => tracing::info!(
                state = %rendered.state,
                status = rendered.status.as_u16(),
                "request served"
            ),
            Err(e) if e.status().is_client_error() => {
                tracing::warn!(error = %e, "request rejected")
            }
            Err(e) => tracing::error!(error = %e, "request failed"),
        }
        result
    }
    .instrument(span)
    .await
}

/// Best-effort structured decode; anything that is not JSON is ignored.
fn decode_body(body: &Bytes) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "request body is not JSON; ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_decoding_is_best_effort() {
        assert_eq!(decode_body(&Bytes::from_static(b"")), None);
        assert_eq!(decode_body(&Bytes::from_static(b"  \n")), None);
        assert_eq!(decode_body(&Bytes::from_static(b"<xml/>")), None);
        assert_eq!(decode_body(&Bytes::from_static(br#"{"a":[1,2]}"#)), Some(json!({"a": [1, 2]})));
    }
}
