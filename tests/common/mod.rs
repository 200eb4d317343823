//! Shared test utilities for integration tests.
//!
//! Every test gets its own mock budget backend: a small axum server on an
//! ephemeral port holding JSON fixtures in memory. `TestClient` builds the
//! real application against it and drives requests with `oneshot`, so the
//! full middleware stack (auth, cache invalidation, error pages) is in play.
//! Methods are intentionally broad to support the various test files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bucketwise::config::{AuthMode, Config};
use bucketwise::server::build_app;
use bucketwise::state::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const SERVICE_TOKEN: &str = "service-token";
pub const CHAT_REPLY: &str = "You spent $300.00 on groceries in March.";

/// In-memory state of the mock backend.
#[derive(Default)]
pub struct BackendData {
    pub buckets: Vec<Value>,
    /// When set, `GET /buckets` is missing and only this nested tree is served.
    pub bucket_tree: Option<Value>,
    pub performance: Value,
    pub members: Vec<Value>,
    pub transactions: Vec<Value>,
    pub rules: Vec<Value>,
    pub suggestions: Vec<Value>,
    pub cashflow: Value,
    pub settings: Option<Value>,
    pub splits: Vec<(i64, Value)>,
    pub chat_requests: Vec<Value>,
    /// `"GET /buckets"` -> number of requests seen.
    pub hits: HashMap<String, usize>,
    /// Last query parameters per path.
    pub last_query: HashMap<String, HashMap<String, String>>,
    /// When set, every request except login must carry this bearer token.
    pub accepted_token: Option<String>,
    /// username -> (password, token)
    pub users: HashMap<String, (String, String)>,
    pub next_id: i64,
}

impl BackendData {
    pub fn hits(&self, key: &str) -> usize {
        self.hits.get(key).copied().unwrap_or(0)
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// The household used by most tests.
pub fn fixtures() -> BackendData {
    BackendData {
        buckets: serde_json::from_value(json!([
            {"id": 1, "name": "Housing", "group": "Non-Discretionary"},
            {"id": 2, "name": "Rent", "parent_id": 1, "limit_a": 1200, "limit_b": 300},
            {"id": 3, "name": "Food", "group": "Non-Discretionary"},
            {"id": 4, "name": "Groceries", "parent_id": 3, "group": "Non-Discretionary",
             "limit_a": 400, "limit_b": 100, "tags": ["weekly"]},
            {"id": 5, "name": "Dining Out", "parent_id": 3, "group": "Discretionary", "limit_a": 150},
            {"id": 6, "name": "Fun", "group": "Discretionary", "limit_a": 200},
            {"id": 7, "name": "Salary", "group": "Income"}
        ]))
        .unwrap(),
        performance: json!({
            "months": ["Jan 2024", "Feb 2024", "Mar 2024"],
            "current_month_index": 2,
            "categories": [
                {"id": 3, "name": "Food", "group": "Non-Discretionary",
                 "spend_by_month": [450, 500, 480], "budget_limit": 550, "average": 476.67,
                 "children": [
                    {"id": 4, "name": "Groceries", "group": "Non-Discretionary",
                     "spend_by_month": [380, 420, 300], "budget_limit": 400, "average": 350}
                 ]},
                {"id": 6, "name": "Fun", "group": "Discretionary",
                 "spend_by_month": [120, 90, 260], "budget_limit": 200, "average": 156.67}
            ]
        }),
        members: serde_json::from_value(json!([
            {"id": 1, "name": "Sam", "color": "#3b82f6"},
            {"id": 2, "name": "Alex", "color": "#22c55e"}
        ]))
        .unwrap(),
        transactions: serde_json::from_value(json!([
            {"id": 10, "date": "2024-03-14", "description": "Costco Wholesale", "amount": -100.0,
             "bucket_id": 4, "bucket_name": "Groceries", "spender": "Sam"},
            {"id": 11, "date": "2024-03-15", "description": "Cinema", "amount": -24.5}
        ]))
        .unwrap(),
        rules: serde_json::from_value(json!([
            {"id": 1, "pattern": "costco", "match_type": "contains", "bucket_id": 4,
             "bucket_name": "Groceries", "priority": 0}
        ]))
        .unwrap(),
        suggestions: serde_json::from_value(json!([
            {"pattern": "netflix", "match_type": "contains", "bucket_id": 6,
             "bucket_name": "Fun", "match_count": 3}
        ]))
        .unwrap(),
        cashflow: json!({
            "nodes": [{"name": "Salary"}, {"name": "Needs"}, {"name": "Wants"}, {"name": "Groceries"}],
            "links": [
                {"source": 0, "target": 1, "value": 3000},
                {"source": 0, "target": 2, "value": 800},
                {"source": 1, "target": 3, "value": 420},
                {"source": 3, "target": 3, "value": 5},
                {"source": 0, "target": 9, "value": 10},
                {"source": 2, "target": 3, "value": -4}
            ]
        }),
        settings: Some(json!({
            "budget_mode": "couple", "partner_a": "Sam", "partner_b": "Alex",
            "currency": "USD", "locale": "en-US", "theme": "light", "page_size": 25
        })),
        next_id: 100,
        ..Default::default()
    }
}

type Shared = Arc<Mutex<BackendData>>;

#[derive(Clone)]
pub struct MockBackend {
    data: Shared,
    url: String,
}

impl MockBackend {
    pub async fn start(data: BackendData) -> Self {
        let data = Arc::new(Mutex::new(data));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let router = mock_routes(data.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { data, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Never hold this across an `.await`.
    pub fn data(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().unwrap()
    }
}

fn mock_routes(data: Shared) -> Router {
    Router::new()
        .route("/buckets", get(list_buckets).post(create_bucket))
        .route("/buckets/tree", get(bucket_tree))
        .route("/buckets/:id", axum::routing::put(update_bucket).delete(delete_bucket))
        .route("/performance", get(performance))
        .route("/members", get(list_members).post(create_member))
        .route("/members/:id", axum::routing::put(update_member).delete(delete_member))
        .route("/transactions", get(list_transactions))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(assign_transaction)
                .delete(delete_transaction),
        )
        .route("/transactions/:id/split", post(split_transaction))
        .route("/rules", get(list_rules).post(create_rule))
        .route("/rules/suggestions", get(rule_suggestions))
        .route("/rules/apply", post(apply_rules))
        .route("/rules/:id", axum::routing::delete(delete_rule))
        .route("/cashflow", get(cashflow))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/chat", post(chat))
        .route("/auth/login", post(login))
        .layer(middleware::from_fn_with_state(data.clone(), observe))
        .with_state(data)
}

/// Count requests and enforce the bearer token.
async fn observe(State(data): State<Shared>, request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let key = format!("{} {}", request.method(), path);
    let query: HashMap<String, String> = request
        .uri()
        .query()
        .map(|q| serde_urlencoded::from_str(q).unwrap_or_default())
        .unwrap_or_default();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let rejected = {
        let mut data = data.lock().unwrap();
        *data.hits.entry(key).or_insert(0) += 1;
        data.last_query.insert(path.clone(), query);
        match &data.accepted_token {
            Some(token) if path != "/auth/login" => {
                authorization.as_deref() != Some(format!("Bearer {}", token).as_str())
            }
            _ => false,
        }
    };
    if rejected {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))).into_response();
    }
    next.run(request).await
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))).into_response()
}

fn unprocessable(message: &str) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": message}))).into_response()
}

fn has_id(value: &Value, id: i64) -> bool {
    value.get("id").and_then(Value::as_i64) == Some(id)
}

/// Overwrite the fields present in `body`, keeping the id.
fn merge(target: &mut Value, body: Value) {
    if let (Some(target), Value::Object(fields)) = (target.as_object_mut(), body) {
        for (key, value) in fields {
            if key != "id" {
                target.insert(key, value);
            }
        }
    }
}

async fn list_buckets(State(data): State<Shared>) -> Response {
    let data = data.lock().unwrap();
    if data.bucket_tree.is_some() {
        return not_found();
    }
    Json(data.buckets.clone()).into_response()
}

async fn bucket_tree(State(data): State<Shared>) -> Response {
    match data.lock().unwrap().bucket_tree.clone() {
        Some(tree) => Json(tree).into_response(),
        None => not_found(),
    }
}

async fn create_bucket(State(data): State<Shared>, Json(mut body): Json<Value>) -> Response {
    if body.get("name").and_then(Value::as_str).unwrap_or("").is_empty() {
        return unprocessable("name is required");
    }
    let mut data = data.lock().unwrap();
    let id = data.next_id();
    body["id"] = json!(id);
    data.buckets.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_bucket(
    State(data): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if body.get("name").and_then(Value::as_str) == Some("Rejected") {
        return unprocessable("Bucket name is already taken");
    }
    let mut data = data.lock().unwrap();
    match data.buckets.iter_mut().find(|b| has_id(b, id)) {
        Some(bucket) => {
            merge(bucket, body);
            Json(bucket.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_bucket(State(data): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut data = data.lock().unwrap();
    let before = data.buckets.len();
    data.buckets.retain(|b| !has_id(b, id));
    if data.buckets.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn performance(State(data): State<Shared>) -> Json<Value> {
    Json(data.lock().unwrap().performance.clone())
}

async fn list_members(State(data): State<Shared>) -> Json<Vec<Value>> {
    Json(data.lock().unwrap().members.clone())
}

async fn create_member(State(data): State<Shared>, Json(mut body): Json<Value>) -> Response {
    let mut data = data.lock().unwrap();
    let id = data.next_id();
    body["id"] = json!(id);
    data.members.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_member(
    State(data): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = data.lock().unwrap();
    match data.members.iter_mut().find(|m| has_id(m, id)) {
        Some(member) => {
            merge(member, body);
            Json(member.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_member(State(data): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut data = data.lock().unwrap();
    data.members.retain(|m| !has_id(m, id));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_transactions(
    State(data): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let data = data.lock().unwrap();
    let search = params.get("search").map(|s| s.to_lowercase());
    let matching: Vec<Value> = data
        .transactions
        .iter()
        .filter(|tx| match &search {
            Some(needle) => tx["description"]
                .as_str()
                .unwrap_or("")
                .to_lowercase()
                .contains(needle.as_str()),
            None => true,
        })
        .cloned()
        .collect();
    Json(json!({"transactions": matching, "total": matching.len()}))
}

async fn get_transaction(State(data): State<Shared>, Path(id): Path<i64>) -> Response {
    let data = data.lock().unwrap();
    match data.transactions.iter().find(|t| has_id(t, id)) {
        Some(tx) => Json(tx.clone()).into_response(),
        None => not_found(),
    }
}

async fn assign_transaction(
    State(data): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = data.lock().unwrap();
    match data.transactions.iter_mut().find(|t| has_id(t, id)) {
        Some(tx) => {
            merge(tx, body);
            Json(tx.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn delete_transaction(State(data): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut data = data.lock().unwrap();
    data.transactions.retain(|t| !has_id(t, id));
    StatusCode::NO_CONTENT.into_response()
}

async fn split_transaction(
    State(data): State<Shared>,
    Path(id): Path<i64>,
    Json(lines): Json<Value>,
) -> Response {
    let mut data = data.lock().unwrap();
    let Some(original) = data
        .transactions
        .iter()
        .find(|t| has_id(t, id))
        .and_then(|t| t["amount"].as_f64())
    else {
        return not_found();
    };
    let total: f64 = lines
        .as_array()
        .map(|lines| lines.iter().filter_map(|l| l["amount"].as_f64()).sum())
        .unwrap_or(0.0);
    if (total - original).abs() >= 0.01 {
        return unprocessable("Split lines do not add up to the transaction");
    }
    data.splits.push((id, lines));
    data.transactions.retain(|t| !has_id(t, id));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_rules(State(data): State<Shared>) -> Json<Vec<Value>> {
    Json(data.lock().unwrap().rules.clone())
}

async fn create_rule(State(data): State<Shared>, Json(mut body): Json<Value>) -> Response {
    let mut data = data.lock().unwrap();
    let id = data.next_id();
    body["id"] = json!(id);
    data.rules.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn delete_rule(State(data): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut data = data.lock().unwrap();
    data.rules.retain(|r| !has_id(r, id));
    StatusCode::NO_CONTENT.into_response()
}

async fn rule_suggestions(State(data): State<Shared>) -> Json<Vec<Value>> {
    Json(data.lock().unwrap().suggestions.clone())
}

async fn apply_rules() -> Json<Value> {
    Json(json!({"updated": 2}))
}

async fn cashflow(State(data): State<Shared>) -> Json<Value> {
    Json(data.lock().unwrap().cashflow.clone())
}

async fn get_settings(State(data): State<Shared>) -> Response {
    match data.lock().unwrap().settings.clone() {
        Some(settings) => Json(settings).into_response(),
        None => not_found(),
    }
}

async fn put_settings(State(data): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    data.lock().unwrap().settings = Some(body);
    StatusCode::NO_CONTENT
}

async fn chat(State(data): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    data.lock().unwrap().chat_requests.push(body);
    Json(json!({"reply": CHAT_REPLY}))
}

async fn login(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let data = data.lock().unwrap();
    let username = body["username"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");
    match data.users.get(username) {
        Some((expected, token)) if expected == password => {
            Json(json!({"access_token": token})).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Bad credentials"}))).into_response(),
    }
}

/// A test client that simulates a browser session against the full app.
pub struct TestClient {
    pub backend: MockBackend,
    pub state: AppState,
    app: Router,
}

impl TestClient {
    /// Service-token mode against the default fixtures.
    pub async fn new() -> Self {
        Self::with_data(fixtures()).await
    }

    pub async fn with_data(mut data: BackendData) -> Self {
        data.accepted_token = Some(SERVICE_TOKEN.to_string());
        let backend = MockBackend::start(data).await;
        Self::connect(backend, AuthMode::ServiceToken(Some(SERVICE_TOKEN.to_string())))
    }

    /// Login mode with one backend user, `sam` / `secret`.
    pub async fn with_login() -> Self {
        let mut data = fixtures();
        data.users.insert(
            "sam".into(),
            ("secret".to_string(), "sam-token".to_string()),
        );
        data.accepted_token = Some("sam-token".into());
        let backend = MockBackend::start(data).await;
        Self::connect(backend, AuthMode::Login)
    }

    pub fn connect(backend: MockBackend, auth_mode: AuthMode) -> Self {
        let config = Config::for_backend(backend.url(), auth_mode);
        let (state, app) = build_app(config).expect("Failed to build app");
        Self {
            backend,
            state,
            app,
        }
    }

    /// Send any request and collect status, headers and body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8_lossy(&body).to_string())
    }

    /// Make a GET request and return status and body.
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let (status, _, body) = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        (status, body)
    }

    /// GET as HTMX would send it.
    pub async fn get_htmx(&self, uri: &str) -> (StatusCode, String) {
        let (status, _, body) = self
            .send(
                Request::builder()
                    .uri(uri)
                    .header("HX-Request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        (status, body)
    }

    /// Make a POST request with form data and return status, headers and body.
    pub async fn post_form_full(
        &self,
        uri: &str,
        form_data: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, HeaderMap, String) {
        let body = encode_form(form_data);
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/x-www-form-urlencoded");
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Make a POST request with form data and return status and body.
    pub async fn post_form(&self, uri: &str, form_data: &[(&str, &str)]) -> (StatusCode, String) {
        let (status, _, body) = self.post_form_full(uri, form_data, &[]).await;
        (status, body)
    }

    /// Get JSON from an endpoint and parse it.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        uri: &str,
    ) -> (StatusCode, Option<T>) {
        let (status, body) = self.get(uri).await;
        let parsed = serde_json::from_str(&body).ok();
        (status, parsed)
    }
}

pub fn encode_form(form_data: &[(&str, &str)]) -> String {
    form_data
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn location(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
}
