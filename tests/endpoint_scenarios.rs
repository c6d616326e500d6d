//! End-to-end request scenarios: definition files on disk, an in-memory query
//! service, and the assembled router driven with `oneshot`.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use rest_presenter::codec;
use rest_presenter::querykit::proto::{Field, Record};
use rest_presenter::service::Operator;
use rest_presenter::{
    common_routes, endpoint_routes, AppState, EndpointRegistry, QueryClient, QueryError,
    QueryRequest, RhaiEvaluator, StateDefaults, TemplateStore,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Default)]
struct FakeQueryKit {
    records: Vec<Record>,
    fail: bool,
    seen: Mutex<Vec<QueryRequest>>,
}

impl FakeQueryKit {
    fn returning(rows: Vec<Value>) -> Self {
        FakeQueryKit {
            records: rows.iter().map(record).collect(),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        FakeQueryKit {
            fail: true,
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<QueryRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for FakeQueryKit {
    async fn query(&self, request: QueryRequest) -> Result<Vec<Record>, QueryError> {
        self.seen.lock().unwrap().push(request);
        if self.fail {
            return Err(QueryError::Rpc(tonic::Status::unavailable("backend down")));
        }
        Ok(self.records.clone())
    }

    async fn ping(&self) -> Result<(), QueryError> {
        if self.fail {
            Err(QueryError::DialTimeout)
        } else {
            Ok(())
        }
    }
}

fn record(row: &Value) -> Record {
    let fields = row
        .as_object()
        .unwrap()
        .iter()
        .map(|(name, v)| Field {
            name: name.clone(),
            value: Some(codec::encode(v).unwrap()),
        })
        .collect();
    Record { fields }
}

fn write(dir: &Path, rel: &str, body: &str) {
    std::fs::write(dir.join(rel), body).unwrap();
}

fn app(dir: &Path, client: Arc<FakeQueryKit>) -> Router {
    let mut templates = TemplateStore::new();
    let registry = EndpointRegistry::load(dir, &mut templates, &StateDefaults::default()).unwrap();
    let state = AppState {
        client,
        evaluator: Arc::new(RhaiEvaluator::default()),
        renderer: Arc::new(templates),
        query_timeout: Duration::from_secs(5),
    };
    common_routes(state.clone())
        .merge(endpoint_routes(&registry, state))
        .layer(RequestBodyLimitLayer::new(256))
}

fn users_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "users.json",
        r#"{
            "method": "get",
            "uri": "/users",
            "query": {
                "table": "users",
                "condition": {"name": "status", "operator": "=", "value": "active"}
            }
        }"#,
    );
    write(dir.path(), "users.tmpl", "{{ Records | tojson }}");
    dir
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn two_records_render_success_state() {
    let dir = users_dir();
    let client = Arc::new(FakeQueryKit::returning(vec![
        json!({"name": "ada", "age": 36}),
        json!({"name": "grace", "age": 45}),
    ]));

    let (status, content_type, body) = send(app(dir.path(), client.clone()), get("/users")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let rows: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(rows, json!([{"name": "ada", "age": 36}, {"name": "grace", "age": 45}]));

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].table, "users");
    let condition = requests[0].condition.as_ref().unwrap();
    assert_eq!(condition.name, "status");
    assert_eq!(condition.operator, Operator::Eq);
    assert_eq!(codec::decode(condition.value.as_ref().unwrap()), json!("active"));
    assert!(condition.conditions.is_empty());
}

#[tokio::test]
async fn zero_records_render_no_results_state() {
    let dir = users_dir();
    let client = Arc::new(FakeQueryKit::returning(vec![]));

    let (status, content_type, body) = send(app(dir.path(), client), get("/users")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn declared_states_choose_template_code_and_content_type() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "books.json",
        r#"{
            "method": "get",
            "uri": "/books",
            "query": {"table": "books"},
            "response": {
                "contentType": "text/plain",
                "state": {
                    "success": {"code": 203, "template": "list.tmpl"},
                    "no_results": {"code": 200, "contentType": "text/html", "template": "empty.tmpl"}
                }
            }
        }"#,
    );
    write(dir.path(), "list.tmpl", "{% for r in Records %}{{ r.title }};{% endfor %}");
    write(dir.path(), "empty.tmpl", "<p>nothing</p>");

    let client = Arc::new(FakeQueryKit::returning(vec![json!({"title": "Dune"})]));
    let (status, content_type, body) = send(app(dir.path(), client), get("/books")).await;
    assert_eq!(status, StatusCode::NON_AUTHORITATIVE_INFORMATION);
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(body, "Dune;");

    let client = Arc::new(FakeQueryKit::returning(vec![]));
    let (status, content_type, body) = send(app(dir.path(), client), get("/books")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, "<p>nothing</p>");
}

#[tokio::test]
async fn throwing_expression_aborts_with_400_before_query() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "users.json",
        r#"{
            "method": "get",
            "uri": "/users",
            "query": {
                "table": "users",
                "condition": {"name": "id", "value": {"expression": "throw \"boom\""}}
            }
        }"#,
    );
    write(dir.path(), "users.tmpl", "SHOULD NOT RENDER");
    let client = Arc::new(FakeQueryKit::returning(vec![json!({"id": 1})]));

    let (status, content_type, body) = send(app(dir.path(), client.clone()), get("/users")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert!(!body.contains("SHOULD NOT RENDER"));
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"]["code"], "expression_error");
    assert_eq!(err["error"]["details"]["path"], "condition.value");
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn backend_failure_is_500() {
    let dir = users_dir();
    let client = Arc::new(FakeQueryKit::failing());

    let (status, _, body) = send(app(dir.path(), client), get("/users")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"]["code"], "query_backend_error");
}

#[tokio::test]
async fn render_failure_is_500() {
    let dir = users_dir();
    write(dir.path(), "users.tmpl", "{% include \"missing.tmpl\" %}");
    let client = Arc::new(FakeQueryKit::returning(vec![json!({"a": 1})]));

    let (status, _, body) = send(app(dir.path(), client), get("/users")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"]["code"], "render_error");
}

#[tokio::test]
async fn path_query_and_pagination_flow_into_the_query() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "orders.json",
        r#"{
            "method": "get",
            "uri": "/users/:id/orders",
            "query": {
                "table": "orders",
                "condition": {
                    "name": "user_id", "value": {"expression": "parse_int(param.id)"},
                    "conditions": [
                        {"name": {"expression": "query.field"}, "operator": ">=", "value": {"expression": "query.min"}}
                    ]
                },
                "pagination": {"limit": 10, "page": {"expression": "query.page"}},
                "orderBy": "created_at",
                "descending": true
            }
        }"#,
    );
    write(dir.path(), "orders.tmpl", "{{ Records | length }}");
    let client = Arc::new(FakeQueryKit::returning(vec![json!({"total": 1.5})]));

    let (status, _, body) = send(
        app(dir.path(), client.clone()),
        get("/users/42/orders?page=3&field=total&min=first&min=second"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
    let request = &client.requests()[0];
    assert_eq!(request.options.limit, 10);
    assert_eq!(request.options.offset, 20);
    assert_eq!(request.options.order_by, "created_at");
    assert!(request.options.descending);
    let root = request.condition.as_ref().unwrap();
    assert_eq!(codec::decode(root.value.as_ref().unwrap()), json!(42));
    let child = &root.conditions[0];
    assert_eq!(child.name, "total");
    assert_eq!(child.operator, Operator::Gte);
    assert_eq!(codec::decode(child.value.as_ref().unwrap()), json!("first"));
}

#[tokio::test]
async fn static_limit_overrides_pagination() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "feed.json",
        r#"{
            "method": "get",
            "uri": "/feed",
            "query": {"table": "feed", "limit": 5, "pagination": {"limit": 10, "page": 2}}
        }"#,
    );
    write(dir.path(), "feed.tmpl", "");
    let client = Arc::new(FakeQueryKit::returning(vec![]));

    send(app(dir.path(), client.clone()), get("/feed")).await;

    let request = &client.requests()[0];
    assert_eq!(request.options.limit, 5);
    assert_eq!(request.options.offset, 10);
    assert!(request.condition.is_none());
}

#[tokio::test]
async fn body_fields_are_reachable_from_expressions() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "search.json",
        r#"{
            "method": "post",
            "uri": "/search",
            "query": {
                "table": "items",
                "condition": {"name": "kind", "value": {"expression": "lookup(body, \"filter.kinds.1\")"}}
            }
        }"#,
    );
    write(dir.path(), "search.tmpl", "ok");
    let client = Arc::new(FakeQueryKit::returning(vec![json!({"kind": "b"})]));

    let request = Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"filter": {"kinds": ["a", "b"]}}"#))
        .unwrap();
    let (status, _, body) = send(app(dir.path(), client.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    let condition = client.requests()[0].condition.clone().unwrap();
    assert_eq!(codec::decode(condition.value.as_ref().unwrap()), json!("b"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "search.json",
        r#"{"method": "post", "uri": "/search", "query": {"table": "items"}}"#,
    );
    write(dir.path(), "search.tmpl", "ok");
    let client = Arc::new(FakeQueryKit::returning(vec![]));

    let payload = "x".repeat(1024);
    let request = Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let (status, _, _) = send(app(dir.path(), client.clone()), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn methods_on_one_uri_share_a_route() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "list.json",
        r#"{"method": "get", "uri": "/items", "query": {"table": "items"}}"#,
    );
    write(dir.path(), "list.tmpl", "list");
    write(
        dir.path(),
        "create.json",
        r#"{"method": "post", "uri": "/items", "query": {"table": "items"}}"#,
    );
    write(dir.path(), "create.tmpl", "create");
    let client = Arc::new(FakeQueryKit::returning(vec![json!({"id": 1})]));
    let app = app(dir.path(), client);

    let (_, _, body) = send(app.clone(), get("/items")).await;
    assert_eq!(body, "list");

    let post = Request::builder().method("POST").uri("/items").body(Body::empty()).unwrap();
    let (_, _, body) = send(app.clone(), post).await;
    assert_eq!(body, "create");

    let delete = Request::builder().method("DELETE").uri("/items").body(Body::empty()).unwrap();
    let (status, _, _) = send(app.clone(), delete).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(app, get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_readiness() {
    let dir = users_dir();

    let (status, _, _) =
        send(app(dir.path(), Arc::new(FakeQueryKit::default())), get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) =
        send(app(dir.path(), Arc::new(FakeQueryKit::default())), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "ok");

    let (status, _, body) =
        send(app(dir.path(), Arc::new(FakeQueryKit::failing())), get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["querykit"], "unavailable");

    let (status, _, body) =
        send(app(dir.path(), Arc::new(FakeQueryKit::default())), get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["name"], "rest-presenter");
}
