use promeconfig_common::{AiSettingsInput, AuthErrorKind, RelabelAction, RenderOptions, ScrapeInterval};
use promeconfig_console::views::{AlertRuleForm, ConfigFile, RelabelList, TargetForm};
use promeconfig_console::{
    backend, AppController, ConsoleConfig, ConsoleError, RestRoutes, Session, SessionStore,
};
use promeconfig_server::{ServerConfig, create_axum_router, db};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

const PASSWORD: &str = "hunter22";

struct TestServer {
    base_url: String,
    _dir: TempDir,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("promeconfig.db").display());
    let pool = db::connect(&url).await.unwrap();
    db::ensure_schema(&pool).await.unwrap();

    let mut config = ServerConfig::new(url, "console-integration-secret");
    config.bcrypt_cost = 4;
    let app = create_axum_router(pool, Arc::new(config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { base_url: format!("http://{addr}/api"), _dir: dir, handle }
}

async fn console(
    base_url: &str,
    session_path: &Path,
    routes: RestRoutes,
) -> (Arc<AppController>, Arc<SessionStore>) {
    let mut config = ConsoleConfig::rest(base_url, session_path);
    config.rest_routes = routes;
    config.request_timeout_secs = Some(5);
    let session = Arc::new(SessionStore::open(&config.session_path).await.unwrap());
    let backend = backend::from_config(&config, session.clone()).unwrap();
    let controller = Arc::new(AppController::new(backend, session.clone()));
    controller.init().await;
    (controller, session)
}

fn node_exporter_form() -> TargetForm {
    let mut form = TargetForm::new();
    form.job_name = "node-exporter".into();
    form.targets = "localhost:9100, localhost:9101".into();
    form.scrape_interval = ScrapeInterval::ThirtySeconds;
    let rule = form.add_rule(RelabelList::Relabel);
    rule.action = RelabelAction::Hashmod;
    rule.source_labels = "__address__".into();
    rule.target_label = "__tmp_hash".into();
    rule.modulus = "4".into();
    form
}

#[tokio::test]
async fn signed_up_user_manages_targets_end_to_end() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = console(&server.base_url, &dir.path().join("session.json"), RestRoutes::Default).await;
    assert!(!app.is_authenticated());

    let user = app.sign_up("ops@example.com", PASSWORD).await.unwrap();
    assert_eq!(user.email, "ops@example.com");
    assert!(app.is_authenticated());
    assert!(app.targets().await.is_empty());

    let created = app.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();
    assert_eq!(created.targets, vec!["localhost:9100", "localhost:9101"]);
    assert_eq!(created.metrics_path, "/metrics");

    let targets = app.targets().await;
    assert_eq!(targets.len(), 1);
    let rules = targets[0].relabel_configs.as_ref().unwrap();
    assert_eq!(rules[0].action, RelabelAction::Hashmod);
    assert_eq!(rules[0].modulus, Some(4));

    let stats = app.dashboard().await;
    assert_eq!(stats.target_count, 1);
    assert_eq!(stats.endpoint_count, 2);
    assert_eq!(stats.relabel_rule_count, 1);

    let preview = app.config_preview(&RenderOptions::default()).await.unwrap();
    let prometheus = preview.contents(ConfigFile::Prometheus);
    assert!(prometheus.contains("job_name: node-exporter"), "{prometheus}");
    assert!(prometheus.contains("scrape_interval: 30s"), "{prometheus}");
    assert!(prometheus.contains("action: hashmod"), "{prometheus}");
    assert!(prometheus.contains("modulus: 4"), "{prometheus}");

    let mut edit = TargetForm::from_target(&targets[0]);
    edit.remove_rule(RelabelList::Relabel, 0);
    edit.scrape_interval = ScrapeInterval::OneMinute;
    let updated = app.update_target(&created.id, edit.to_patch().unwrap()).await.unwrap();
    assert_eq!(updated.scrape_interval, ScrapeInterval::OneMinute);
    assert!(updated.relabel_configs.unwrap_or_default().is_empty());

    app.delete_target(&created.id).await.unwrap();
    assert!(app.targets().await.is_empty());
    let err = app.delete_target(&created.id).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn newest_target_lists_first_with_endpoints_in_input_order() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = console(&server.base_url, &dir.path().join("session.json"), RestRoutes::Default).await;
    app.sign_up("order@example.com", PASSWORD).await.unwrap();

    let mut first = TargetForm::new();
    first.job_name = "prometheus".into();
    first.targets = "localhost:9090".into();
    app.create_target(first.to_new_target().unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut form = TargetForm::new();
    form.job_name = "node-exporter".into();
    form.targets = "localhost:9100, localhost:9090".into();
    let created = app.create_target(form.to_new_target().unwrap()).await.unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.targets, vec!["localhost:9100", "localhost:9090"]);
    assert_eq!(created.scrape_interval, ScrapeInterval::FifteenSeconds);

    let targets = app.targets().await;
    let jobs: Vec<_> = targets.iter().map(|t| t.job_name.as_str()).collect();
    assert_eq!(jobs, ["node-exporter", "prometheus"]);
}

#[tokio::test]
async fn persisted_session_is_restored_on_startup() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let (first, _) = console(&server.base_url, &path, RestRoutes::Default).await;
    first.sign_up("restore@example.com", PASSWORD).await.unwrap();
    first.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();

    let (second, _) = console(&server.base_url, &path, RestRoutes::Default).await;
    assert!(second.is_authenticated());
    assert_eq!(second.current_user().unwrap().email, "restore@example.com");
    assert_eq!(second.targets().await.len(), 1);
}

#[tokio::test]
async fn auth_failures_are_classified() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = console(&server.base_url, &dir.path().join("session.json"), RestRoutes::Default).await;

    app.sign_up("dup@example.com", PASSWORD).await.unwrap();
    app.sign_out().await.unwrap();

    let err = app.sign_up("dup@example.com", PASSWORD).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::DuplicateAccount)), "{err:?}");

    let err = app.sign_in("dup@example.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::InvalidCredentials)), "{err:?}");

    let err = app.sign_up("dup@example.com", "123").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::WeakPassword)), "{err:?}");
    assert!(!app.is_authenticated());
}

#[tokio::test]
async fn rejected_token_signs_the_user_out() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (app, session) = console(&server.base_url, &path, RestRoutes::Default).await;

    let user = app.sign_up("expired@example.com", PASSWORD).await.unwrap();
    app.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();

    session.save(Session { token: "not-a-jwt".into(), user }).await.unwrap();
    let err = app.reload().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!app.is_authenticated());
    assert!(app.targets().await.is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn failed_sign_in_keeps_the_existing_session_consistent() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (app, session) = console(&server.base_url, &dir.path().join("session.json"), RestRoutes::Default).await;
    let user = app.sign_up("stay@example.com", PASSWORD).await.unwrap();
    app.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();

    let err = app.sign_in("stay@example.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::InvalidCredentials)), "{err:?}");

    assert_eq!(app.is_authenticated(), session.is_authenticated());
    assert!(app.is_authenticated());
    assert_eq!(app.current_user().unwrap().id, user.id);
    assert_eq!(app.targets().await.len(), 1);

    session.clear().await.unwrap();
    let err = app.sign_in("stay@example.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(AuthErrorKind::InvalidCredentials)), "{err:?}");
    assert!(!app.is_authenticated());
}

#[tokio::test]
async fn sign_out_clears_local_state_when_server_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let seeded = SessionStore::open(&path).await.unwrap();
    seeded
        .save(Session {
            token: "stale-token".into(),
            user: promeconfig_common::User {
                id: "u-1".into(),
                email: "offline@example.com".into(),
                created_at: chrono::Utc::now(),
                updated_at: None,
            },
        })
        .await
        .unwrap();

    // Nothing listens on the discard port.
    let (app, session) = console("http://127.0.0.1:9/api", &path, RestRoutes::Default).await;
    assert!(!app.is_authenticated());
    assert!(session.is_authenticated(), "a network failure must not drop the session file");

    app.sign_out().await.unwrap();
    assert!(!session.is_authenticated());
    assert!(!path.exists());
}

#[tokio::test]
async fn rows_of_other_users_are_invisible() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (alice, _) = console(&server.base_url, &dir.path().join("alice.json"), RestRoutes::Default).await;
    let (bob, _) = console(&server.base_url, &dir.path().join("bob.json"), RestRoutes::Default).await;
    alice.sign_up("alice@example.com", PASSWORD).await.unwrap();
    bob.sign_up("bob@example.com", PASSWORD).await.unwrap();

    let target = alice.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();
    bob.reload().await.unwrap();
    assert!(bob.targets().await.is_empty());

    let patch = node_exporter_form().to_patch().unwrap();
    let err = bob.update_target(&target.id, patch).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    let err = bob.delete_target(&target.id).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    assert_eq!(alice.targets().await.len(), 1);
}

#[tokio::test]
async fn legacy_routes_cover_alert_rules_and_ai_settings() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = console(&server.base_url, &dir.path().join("session.json"), RestRoutes::Legacy).await;
    app.sign_up("legacy@example.com", PASSWORD).await.unwrap();

    let mut form = AlertRuleForm::new();
    form.alert_name = "HighCPU".into();
    form.expr = "avg(rate(node_cpu_seconds_total{mode!=\"idle\"}[5m])) > 0.9".into();
    form.labels = "severity=critical".into();
    form.annotations = "summary=CPU is hot".into();
    let rule = app.create_alert_rule(form.to_new_rule().unwrap()).await.unwrap();
    assert_eq!(rule.for_duration, "5m");
    assert_eq!(app.dashboard().await.rules_by_severity.get("critical"), Some(&1));

    let mut edit = AlertRuleForm::from_rule(&rule);
    edit.for_duration = "10m".into();
    let updated = app.update_alert_rule(&rule.id, edit.to_patch().unwrap()).await.unwrap();
    assert_eq!(updated.for_duration, "10m");
    assert_eq!(updated.labels.get("severity").map(String::as_str), Some("critical"));

    assert!(app.ai_settings().await.unwrap().is_none());
    let first = app.save_ai_settings(AiSettingsInput::default()).await.unwrap();
    let second = app
        .save_ai_settings(AiSettingsInput { model: "gpt-4o".into(), temperature: 0.7, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(app.ai_settings().await.unwrap().unwrap().model, "gpt-4o");

    app.delete_ai_settings().await.unwrap();
    assert!(app.ai_settings().await.unwrap().is_none());

    app.delete_alert_rule(&rule.id).await.unwrap();
    assert!(app.alert_rules().await.is_empty());
}

#[tokio::test]
async fn watcher_follows_sign_out_from_another_process() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let (app, _) = console(&server.base_url, &path, RestRoutes::Default).await;
    app.sign_up("watch@example.com", PASSWORD).await.unwrap();
    app.create_target(node_exporter_form().to_new_target().unwrap()).await.unwrap();

    let watcher = app.spawn_session_watcher(Duration::from_millis(50));

    // A second console on the same file signs out.
    let other = SessionStore::open(&path).await.unwrap();
    other.clear().await.unwrap();

    let mut signed_out = false;
    for _ in 0..100 {
        if !app.is_authenticated() && app.targets().await.is_empty() {
            signed_out = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    watcher.abort();
    assert!(signed_out, "controller did not notice the cleared session");
    assert!(app.targets().await.is_empty());
}
