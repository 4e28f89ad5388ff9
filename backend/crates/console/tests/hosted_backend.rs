//! Runs the console against an in-process stand-in for the hosted service:
//! GoTrue-style auth under `/auth/v1` and PostgREST-style tables under
//! `/rest/v1`, with row ownership enforced the way row-level policies would.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use promeconfig_common::{AiSettingsInput, AuthErrorKind, ScrapeInterval};
use promeconfig_console::views::{AlertRuleForm, TargetForm};
use promeconfig_console::{backend, AppController, ConsoleConfig, ConsoleError, SessionStore};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const ANON_KEY: &str = "anon-test-key";
const PASSWORD: &str = "hunter22";

struct StubUser {
    id: String,
    email: String,
    password: String,
    token: Option<String>,
    created_at: String,
}

impl StubUser {
    fn json(&self) -> Value {
        json!({ "id": self.id, "email": self.email, "created_at": self.created_at })
    }
}

#[derive(Default)]
struct StubState {
    users: Vec<StubUser>,
    tables: HashMap<String, Vec<Map<String, Value>>>,
}

type Shared = Arc<Mutex<StubState>>;

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Resolves the calling user, or the error response to send back.
fn caller(state: &StubState, headers: &HeaderMap) -> Result<String, Response> {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return Err(reply(StatusCode::UNAUTHORIZED, json!({ "message": "Invalid API key" })));
    }
    let token = bearer(headers);
    state
        .users
        .iter()
        .find(|u| u.token.is_some() && u.token == token)
        .map(|u| u.id.clone())
        .ok_or_else(|| reply(StatusCode::UNAUTHORIZED, json!({ "code": "PGRST301", "message": "JWT expired" })))
}

fn issue_token(user: &mut StubUser) -> Value {
    let token = format!("tok-{}", uuid::Uuid::new_v4());
    user.token = Some(token.clone());
    json!({ "access_token": token, "token_type": "bearer", "user": user.json() })
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    if state.users.iter().any(|u| u.email == email) {
        return reply(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "code": 422, "error_code": "user_already_exists", "msg": "User already registered" }),
        );
    }
    let mut user = StubUser {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.clone(),
        password,
        token: None,
        created_at: Utc::now().to_rfc3339(),
    };
    // Accounts that need confirmation get the bare user and no session.
    let body = if email.starts_with("pending") { user.json() } else { issue_token(&mut user) };
    state.users.push(user);
    reply(StatusCode::OK, body)
}

async fn token(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if query.get("grant_type").map(String::as_str) != Some("password") {
        return reply(StatusCode::BAD_REQUEST, json!({ "error": "unsupported_grant_type" }));
    }
    let mut state = state.lock().unwrap();
    let found = state.users.iter_mut().find(|u| {
        Some(u.email.as_str()) == body["email"].as_str() && Some(u.password.as_str()) == body["password"].as_str()
    });
    match found {
        Some(user) => reply(StatusCode::OK, issue_token(user)),
        None => reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
        ),
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    let token = bearer(&headers);
    if let Some(user) = state.users.iter_mut().find(|u| u.token.is_some() && u.token == token) {
        user.token = None;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    match caller(&state, &headers) {
        Ok(id) => {
            let user = state.users.iter().find(|u| u.id == id).map(StubUser::json);
            reply(StatusCode::OK, user.unwrap_or(Value::Null))
        }
        Err(resp) => resp,
    }
}

/// `column=eq.value` filters from the query string.
fn eq_filters(query: &HashMap<String, String>) -> Vec<(String, String)> {
    query
        .iter()
        .filter_map(|(k, v)| Some((k.clone(), v.strip_prefix("eq.")?.to_string())))
        .collect()
}

fn matches(row: &Map<String, Value>, owner: &str, filters: &[(String, String)]) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(owner)
        && filters
            .iter()
            .all(|(k, v)| row.get(k).and_then(Value::as_str) == Some(v.as_str()))
}

fn merge(row: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (k, v) in patch {
        if !matches!(k.as_str(), "id" | "user_id" | "created_at") {
            row.insert(k, v);
        }
    }
    row.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
}

async fn select_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let state = state.lock().unwrap();
    let owner = match caller(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let filters = eq_filters(&query);
    let limit = query.get("limit").and_then(|l| l.parse::<usize>().ok()).unwrap_or(usize::MAX);
    // Rows are kept in insertion order; created_at.desc is the reverse.
    let rows: Vec<Value> = state
        .tables
        .get(&table)
        .into_iter()
        .flatten()
        .rev()
        .filter(|row| matches(row, &owner, &filters))
        .take(limit)
        .map(|row| Value::Object(row.clone()))
        .collect();
    reply(StatusCode::OK, Value::Array(rows))
}

async fn insert_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.lock().unwrap();
    let owner = match caller(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    if body.get("user_id").and_then(Value::as_str) != Some(owner.as_str()) {
        return reply(
            StatusCode::FORBIDDEN,
            json!({ "code": "42501", "message": "new row violates row-level security policy" }),
        );
    }
    let rows = state.tables.entry(table).or_default();

    if let Some(column) = query.get("on_conflict") {
        let key = body.get(column).cloned();
        if let Some(existing) = rows.iter_mut().find(|r| r.get(column) == key.as_ref()) {
            merge(existing, body);
            return reply(StatusCode::OK, json!([existing.clone()]));
        }
    }

    let now = Utc::now().to_rfc3339();
    let mut row = body;
    row.insert("id".into(), json!(uuid::Uuid::new_v4().to_string()));
    row.insert("created_at".into(), json!(now));
    row.insert("updated_at".into(), json!(now));
    rows.push(row.clone());
    reply(StatusCode::CREATED, json!([row]))
}

async fn update_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut state = state.lock().unwrap();
    let owner = match caller(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let filters = eq_filters(&query);
    let mut updated = Vec::new();
    for row in state.tables.entry(table).or_default().iter_mut() {
        if matches(row, &owner, &filters) {
            merge(row, body.clone());
            updated.push(Value::Object(row.clone()));
        }
    }
    reply(StatusCode::OK, Value::Array(updated))
}

async fn delete_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    let owner = match caller(&state, &headers) {
        Ok(owner) => owner,
        Err(resp) => return resp,
    };
    let filters = eq_filters(&query);
    let rows = state.tables.entry(table).or_default();
    let (removed, kept): (Vec<_>, Vec<_>) = rows.drain(..).partition(|row| matches(row, &owner, &filters));
    *rows = kept;
    reply(StatusCode::OK, Value::Array(removed.into_iter().map(Value::Object).collect()))
}

struct Stub {
    url: String,
    state: Shared,
    dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for Stub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_stub() -> Stub {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(current_user))
        .route(
            "/rest/v1/{table}",
            get(select_rows).post(insert_rows).patch(update_rows).delete(delete_rows),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Stub { url: format!("http://{addr}"), state, dir: tempfile::tempdir().unwrap(), handle }
}

async fn console(stub: &Stub, name: &str) -> Arc<AppController> {
    let mut config = ConsoleConfig::hosted(&stub.url, ANON_KEY, stub.dir.path().join(format!("{name}.json")));
    config.request_timeout_secs = Some(5);
    let session = Arc::new(SessionStore::open(&config.session_path).await.unwrap());
    let backend = backend::from_config(&config, session.clone()).unwrap();
    let controller = Arc::new(AppController::new(backend, session));
    controller.init().await;
    controller
}

fn job(name: &str) -> TargetForm {
    let mut form = TargetForm::new();
    form.job_name = name.into();
    form.targets = "localhost:9100".into();
    form
}

#[tokio::test]
async fn targets_round_trip_through_hosted_tables() {
    let stub = spawn_stub().await;
    let app = console(&stub, "ops").await;
    let user = app.sign_up("ops@example.com", PASSWORD).await.unwrap();

    let first = app.create_target(job("node-exporter").to_new_target().unwrap()).await.unwrap();
    app.create_target(job("blackbox").to_new_target().unwrap()).await.unwrap();
    assert_eq!(first.user_id, user.id);

    let names: Vec<String> = app.targets().await.into_iter().map(|t| t.job_name).collect();
    assert_eq!(names, vec!["blackbox", "node-exporter"]);

    let mut edit = TargetForm::from_target(&first);
    edit.scrape_interval = ScrapeInterval::FiveSeconds;
    let updated = app.update_target(&first.id, edit.to_patch().unwrap()).await.unwrap();
    assert_eq!(updated.scrape_interval, ScrapeInterval::FiveSeconds);
    assert_eq!(updated.created_at, first.created_at);

    app.delete_target(&first.id).await.unwrap();
    assert_eq!(app.targets().await.len(), 1);
    let err = app.delete_target(&first.id).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn ai_settings_upsert_keeps_one_row_per_user() {
    let stub = spawn_stub().await;
    let app = console(&stub, "ai").await;
    app.sign_up("ai@example.com", PASSWORD).await.unwrap();

    assert!(app.ai_settings().await.unwrap().is_none());
    let first = app.save_ai_settings(AiSettingsInput::default()).await.unwrap();
    let second = app
        .save_ai_settings(AiSettingsInput { provider: "anthropic".into(), model: "claude".into(), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(stub.state.lock().unwrap().tables["ai_settings"].len(), 1);
    assert_eq!(app.ai_settings().await.unwrap().unwrap().provider, "anthropic");

    app.delete_ai_settings().await.unwrap();
    assert!(app.ai_settings().await.unwrap().is_none());
}

#[tokio::test]
async fn hosted_auth_errors_are_classified() {
    let stub = spawn_stub().await;
    let app = console(&stub, "auth").await;

    let err = app.sign_up("pending@example.com", PASSWORD).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::EmailNotConfirmed)), "{err:?}");
    assert!(!app.is_authenticated());

    app.sign_up("taken@example.com", PASSWORD).await.unwrap();
    app.sign_out().await.unwrap();
    let err = app.sign_up("taken@example.com", PASSWORD).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::DuplicateAccount)), "{err:?}");

    let err = app.sign_in("taken@example.com", "nope-nope").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::InvalidCredentials)), "{err:?}");

    app.sign_in("taken@example.com", PASSWORD).await.unwrap();
    assert!(app.is_authenticated());
}

#[tokio::test]
async fn revoked_token_signs_out_on_next_call() {
    let stub = spawn_stub().await;
    let app = console(&stub, "revoked").await;
    app.sign_up("revoked@example.com", PASSWORD).await.unwrap();
    app.create_target(job("node-exporter").to_new_target().unwrap()).await.unwrap();

    for user in stub.state.lock().unwrap().users.iter_mut() {
        user.token = None;
    }

    let err = app.reload().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!app.is_authenticated());
    assert!(app.targets().await.is_empty());
}

#[tokio::test]
async fn rows_are_scoped_to_their_owner() {
    let stub = spawn_stub().await;
    let alice = console(&stub, "alice").await;
    let bob = console(&stub, "bob").await;
    alice.sign_up("alice@example.com", PASSWORD).await.unwrap();
    bob.sign_up("bob@example.com", PASSWORD).await.unwrap();

    let mut form = AlertRuleForm::new();
    form.alert_name = "InstanceDown".into();
    form.expr = "up == 0".into();
    form.labels = "severity=page".into();
    let rule = alice.create_alert_rule(form.to_new_rule().unwrap()).await.unwrap();

    bob.reload().await.unwrap();
    assert!(bob.alert_rules().await.is_empty());
    let err = bob.update_alert_rule(&rule.id, form.to_patch().unwrap()).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    assert_eq!(alice.alert_rules().await.len(), 1);
}

#[tokio::test]
async fn null_label_columns_are_read_as_empty() {
    let stub = spawn_stub().await;
    let app = console(&stub, "nulls").await;
    let user = app.sign_up("nulls@example.com", PASSWORD).await.unwrap();

    let now = Utc::now().to_rfc3339();
    let row = json!({
        "id": "r-1",
        "user_id": user.id,
        "alert_name": "Imported",
        "expr": "vector(1)",
        "for_duration": "1m",
        "labels": null,
        "annotations": null,
        "created_at": now,
        "updated_at": now,
    });
    if let Value::Object(row) = row {
        stub.state.lock().unwrap().tables.entry("alert_rules".into()).or_default().push(row);
    }

    app.reload().await.unwrap();
    let rules = app.alert_rules().await;
    assert_eq!(rules.len(), 1);
    assert!(rules[0].labels.is_empty());
    assert_eq!(app.dashboard().await.rules_by_severity.get("none"), Some(&1));
}
