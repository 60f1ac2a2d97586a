//! A small stand-in for the hosted backend: auth, rest tables, object
//! storage and the weather API, all kept in memory.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::helpers::{E2EError, E2EResult};

pub const ANON_KEY: &str = "anon-key";
pub const SERVICE_KEY: &str = "service-key";
pub const WEATHER_KEY: &str = "weather-key";

const RESERVED_PARAMS: [&str; 4] = ["select", "order", "limit", "offset"];

#[derive(Debug, Clone)]
struct User {
    id: String,
    email: String,
    password: String,
    metadata: Value,
}

struct FakeState {
    users: Vec<User>,
    access: HashMap<String, String>,
    refresh: HashMap<String, String>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, (String, Vec<u8>)>,
    weather: HashMap<String, Value>,
    failing_tables: HashSet<String>,
    token_ttl_secs: i64,
    refreshes: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            access: HashMap::new(),
            refresh: HashMap::new(),
            tables: HashMap::new(),
            objects: HashMap::new(),
            weather: HashMap::new(),
            failing_tables: HashSet::new(),
            token_ttl_secs: 3600,
            refreshes: 0,
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    pub url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> E2EResult<Self> {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| E2EError::Setup(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| E2EError::Setup(e.to_string()))?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("fake backend stopped: {e}");
            }
        });

        Ok(Self {
            url: format!("http://{addr}"),
            state,
            server,
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().expect("fake state poisoned");
        f(&mut state)
    }

    /// Inserts into `table` answer 500 until cleared.
    pub fn fail_inserts_into(&self, table: &str) {
        self.with_state(|s| s.failing_tables.insert(table.to_string()));
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| s.failing_tables.clear());
    }

    /// Lifetime of tokens issued from now on.
    pub fn set_token_ttl(&self, secs: i64) {
        self.with_state(|s| s.token_ttl_secs = secs);
    }

    pub fn seed_weather(&self, city: &str, report: Value) {
        self.with_state(|s| s.weather.insert(city.to_lowercase(), report));
    }

    pub fn insert_row(&self, table: &str, row: Value) {
        self.with_state(|s| s.tables.entry(table.to_string()).or_default().push(row));
    }

    /// Invalidates every access and refresh token.
    pub fn revoke_all_sessions(&self) {
        self.with_state(|s| {
            s.access.clear();
            s.refresh.clear();
        });
    }

    pub fn user_count(&self) -> usize {
        self.with_state(|s| s.users.len())
    }

    pub fn user_metadata(&self, email: &str) -> Option<Value> {
        self.with_state(|s| {
            s.users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .map(|u| u.metadata.clone())
        })
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.with_state(|s| s.tables.get(table).cloned().unwrap_or_default())
    }

    pub fn object(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.with_state(|s| s.objects.get(path).cloned())
    }

    pub fn refreshes(&self) -> usize {
        self.with_state(|s| s.refreshes)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(current_user))
        .route("/auth/v1/admin/users/{id}", delete(admin_delete_user))
        .route(
            "/rest/v1/{table}",
            get(select_rows)
                .head(count_rows)
                .post(insert_rows)
                .delete(delete_rows),
        )
        .route("/storage/v1/object/public/{bucket}/{*key}", get(public_object))
        .route("/storage/v1/object/{bucket}/{*key}", post(upload_object))
        .route("/weather/v1/current.json", get(current_weather))
        .with_state(state)
}

fn auth_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "code": status.as_u16(), "msg": msg }))).into_response()
}

fn rest_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

fn require_apikey(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("apikey").and_then(|v| v.to_str().ok()) {
        Some(ANON_KEY) | Some(SERVICE_KEY) => Ok(()),
        _ => Err(rest_error(
            StatusCode::UNAUTHORIZED,
            "No API key found in request",
        )),
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn issue_tokens(state: &mut FakeState, user: &User) -> Value {
    let access = format!("at-{}", uuid::Uuid::new_v4());
    let refresh = format!("rt-{}", uuid::Uuid::new_v4());
    state.access.insert(access.clone(), user.id.clone());
    state.refresh.insert(refresh.clone(), user.id.clone());
    let ttl = state.token_ttl_secs;
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": ttl,
        "expires_at": Utc::now().timestamp() + ttl,
        "refresh_token": refresh,
        "user": { "id": user.id, "email": user.email },
    })
}

async fn signup(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if password.len() < 6 {
        return auth_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password should be at least 6 characters",
        );
    }

    let mut state = state.lock().expect("fake state poisoned");
    if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
        return auth_error(StatusCode::UNPROCESSABLE_ENTITY, "User already registered");
    }
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password,
        metadata: body.get("data").cloned().unwrap_or(Value::Null),
    };
    state.users.push(user.clone());
    Json(issue_tokens(&mut state, &user)).into_response()
}

async fn token(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let mut state = state.lock().expect("fake state poisoned");
    let invalid = |desc: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": desc })),
        )
            .into_response()
    };

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let Some(user) = state
                .users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
                .cloned()
            else {
                return invalid("Invalid login credentials");
            };
            Json(issue_tokens(&mut state, &user)).into_response()
        }
        Some("refresh_token") => {
            let presented = body["refresh_token"].as_str().unwrap_or_default();
            let Some(user_id) = state.refresh.remove(presented) else {
                return invalid("Invalid Refresh Token: Refresh Token Not Found");
            };
            let Some(user) = state.users.iter().find(|u| u.id == user_id).cloned() else {
                return invalid("User not found");
            };
            state.refreshes += 1;
            Json(issue_tokens(&mut state, &user)).into_response()
        }
        _ => auth_error(StatusCode::BAD_REQUEST, "unsupported grant_type"),
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let Some(token) = bearer(&headers) else {
        return auth_error(StatusCode::UNAUTHORIZED, "missing bearer token");
    };
    let mut state = state.lock().expect("fake state poisoned");
    if let Some(user_id) = state.access.remove(&token) {
        state.refresh.retain(|_, id| *id != user_id);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().expect("fake state poisoned");
    let user = bearer(&headers)
        .and_then(|t| state.access.get(&t).cloned())
        .and_then(|id| state.users.iter().find(|u| u.id == id).cloned());
    match user {
        Some(u) => Json(json!({ "id": u.id, "email": u.email })).into_response(),
        None => auth_error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}

async fn admin_delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if bearer(&headers).as_deref() != Some(SERVICE_KEY) {
        return auth_error(StatusCode::FORBIDDEN, "User not allowed");
    }
    let mut state = state.lock().expect("fake state poisoned");
    let before = state.users.len();
    state.users.retain(|u| u.id != id);
    if state.users.len() == before {
        return auth_error(StatusCode::NOT_FOUND, "User not found");
    }
    state.access.retain(|_, uid| *uid != id);
    state.refresh.retain(|_, uid| *uid != id);
    Json(json!({})).into_response()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filters(row: &Value, params: &[(String, String)]) -> bool {
    params
        .iter()
        .filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str()))
        .all(|(k, v)| match v.strip_prefix("eq.") {
            Some(wanted) => row.get(k).map(cell_text).as_deref() == Some(wanted),
            None => true,
        })
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.map(cell_text).unwrap_or_default();
    let b = b.map(cell_text).unwrap_or_default();
    match (a.parse::<DateTime<Utc>>(), b.parse::<DateTime<Utc>>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(&b),
    }
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

async fn select_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let state = state.lock().expect("fake state poisoned");
    let mut rows: Vec<Value> = state
        .tables
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|r| matches_filters(r, &params))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if let Some(order) = param(&params, "order") {
        let keys: Vec<(&str, bool)> = order
            .split(',')
            .filter_map(|key| key.rsplit_once('.'))
            .map(|(column, dir)| (column, dir == "desc"))
            .collect();
        rows.sort_by(|a, b| {
            keys.iter()
                .map(|&(column, desc)| {
                    let ord = compare_cells(a.get(column), b.get(column));
                    if desc { ord.reverse() } else { ord }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let offset = param(&params, "offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0usize);
    let limit = param(&params, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);
    let rows: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();
    Json(rows).into_response()
}

async fn count_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let state = state.lock().expect("fake state poisoned");
    let total = state
        .tables
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches_filters(r, &params)).count())
        .unwrap_or(0);
    let range = if total == 0 {
        "*/0".to_string()
    } else {
        format!("0-{}/{}", total - 1, total)
    };
    let mut resp = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&range) {
        resp.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    resp
}

fn unique_column(table: &str) -> Option<&'static str> {
    match table {
        "organizations" => Some("farm_code"),
        "profiles" => Some("id"),
        _ => None,
    }
}

async fn insert_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let mut state = state.lock().expect("fake state poisoned");
    if state.failing_tables.contains(&table) {
        return rest_error(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }

    let incoming = match body {
        Value::Array(rows) => rows,
        row @ Value::Object(_) => vec![row],
        _ => return rest_error(StatusCode::BAD_REQUEST, "expected an object or array"),
    };

    let existing = state.tables.entry(table.clone()).or_default();
    let mut created = Vec::new();
    for mut row in incoming {
        if let Some(col) = unique_column(&table) {
            let clash = row.get(col).is_some_and(|v| {
                existing
                    .iter()
                    .chain(created.iter())
                    .any(|r: &Value| r.get(col) == Some(v))
            });
            if clash {
                return rest_error(
                    StatusCode::CONFLICT,
                    &format!("duplicate key value violates unique constraint \"{table}_{col}_key\""),
                );
            }
        }
        if let Value::Object(map) = &mut row {
            map.entry("id")
                .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
            map.entry("created_at")
                .or_insert_with(|| json!(Utc::now().to_rfc3339()));
        }
        created.push(row);
    }
    existing.extend(created.iter().cloned());

    let wants_rows = headers
        .get("Prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"));
    if wants_rows {
        (StatusCode::CREATED, Json(created)).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn delete_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let mut state = state.lock().expect("fake state poisoned");
    if let Some(rows) = state.tables.get_mut(&table) {
        rows.retain(|r| !matches_filters(r, &params));
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn upload_object(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if let Err(resp) = require_apikey(&headers) {
        return resp;
    }
    let mut state = state.lock().expect("fake state poisoned");
    let signed_in = bearer(&headers).is_some_and(|t| state.access.contains_key(&t));
    if !signed_in {
        return rest_error(
            StatusCode::FORBIDDEN,
            "new row violates row-level security policy",
        );
    }
    let path = format!("{bucket}/{key}");
    let upsert = headers
        .get("x-upsert")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true");
    if !upsert && state.objects.contains_key(&path) {
        return rest_error(StatusCode::CONFLICT, "The resource already exists");
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    state
        .objects
        .insert(path.clone(), (content_type, body.to_vec()));
    Json(json!({ "Key": path })).into_response()
}

async fn public_object(
    State(state): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    let state = state.lock().expect("fake state poisoned");
    match state.objects.get(&format!("{bucket}/{key}")) {
        Some((content_type, data)) => {
            ([(header::CONTENT_TYPE, content_type.clone())], data.clone()).into_response()
        }
        None => rest_error(StatusCode::NOT_FOUND, "Object not found"),
    }
}

async fn current_weather(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("key").map(String::as_str) != Some(WEATHER_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": 2006, "message": "API key is invalid." } })),
        )
            .into_response();
    }
    let city = params
        .get("q")
        .map(|q| q.to_lowercase())
        .unwrap_or_default();
    let state = state.lock().expect("fake state poisoned");
    match state.weather.get(&city) {
        Some(report) => Json(report.clone()).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 1006, "message": "No matching location found." } })),
        )
            .into_response(),
    }
}
