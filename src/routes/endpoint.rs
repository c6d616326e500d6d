//! Router for the registered endpoints. Endpoints sharing a URI are merged into
//! one route; axum answers 405 for methods no endpoint declared.

use crate::endpoint::Endpoint;
use crate::handlers;
use crate::registry::EndpointRegistry;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn method_filter(method: &Method) -> Option<MethodFilter> {
    match *method {
        Method::GET => Some(MethodFilter::GET),
        Method::POST => Some(MethodFilter::POST),
        Method::PUT => Some(MethodFilter::PUT),
        Method::DELETE => Some(MethodFilter::DELETE),
        Method::PATCH => Some(MethodFilter::PATCH),
        _ => None,
    }
}

fn method_router(
    endpoint: Arc<Endpoint>,
    filter: MethodFilter,
    existing: Option<MethodRouter<AppState>>,
) -> MethodRouter<AppState> {
    let handler = move |state: State<AppState>,
                        params: Option<Path<HashMap<String, String>>>,
                        query: Query<Vec<(String, String)>>,
                        body: Bytes| {
        let endpoint = Arc::clone(&endpoint);
        async move { handlers::handle(endpoint, state, params, query, body).await }
    };
    match existing {
        Some(router) => router.on(filter, handler),
        None => on(filter, handler),
    }
}

pub fn endpoint_routes(registry: &EndpointRegistry, state: AppState) -> Router {
    let mut by_uri: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for endpoint in registry.endpoints() {
        let Some(filter) = method_filter(&endpoint.method) else {
            tracing::warn!(
                endpoint = %endpoint.name,
                method = %endpoint.method,
                "method not routable; skipped"
            );
            continue;
        };
        let existing = by_uri.remove(&endpoint.uri);
        by_uri.insert(endpoint.uri.clone(), method_router(Arc::clone(endpoint), filter, existing));
    }

    let mut router = Router::new();
    for (uri, methods) in by_uri {
        router = router.route(&uri, methods);
    }
    router.with_state(state)
}
