mod helpers;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::create_test_repo;
use webgit::error::GatewayResult;
use webgit::git::{
    Ack, BranchResult, BranchSummary, CommitDetail, CommitRecord, CommitResult, CommitSummary,
    ConfigSnapshot, PullResult, RemoteEntry, StatusSnapshot,
};
use webgit::security::{ConfigEntry, RepoPath, CSRF_HEADER};
use webgit::{router, AppState, GatewayError, GitError, GitGateway, Repository, RepositoryGateway, SessionGuard};

/// Gateway double that records every call it receives
struct RecordingGateway {
    root: PathBuf,
    calls: Mutex<Vec<String>>,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            root: PathBuf::from("/srv/repo"),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn join(paths: &[RepoPath]) -> String {
    paths.iter().map(RepoPath::as_str).collect::<Vec<_>>().join(",")
}

fn record_for(hash: &str) -> CommitRecord {
    CommitRecord {
        hash: hash.to_string(),
        short_hash: hash.chars().take(7).collect(),
        message: "Subject".to_string(),
        body: String::new(),
        author: "Test User".to_string(),
        email: "test@example.com".to_string(),
        date: "2024-01-01T00:00:00+00:00".to_string(),
        refs: String::new(),
    }
}

#[async_trait]
impl RepositoryGateway for RecordingGateway {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn get_status(&self) -> GatewayResult<StatusSnapshot> {
        self.record("status".to_string());
        Ok(StatusSnapshot {
            current: Some("main".to_string()),
            is_clean: true,
            ..StatusSnapshot::default()
        })
    }

    async fn get_branches(&self) -> GatewayResult<BranchSummary> {
        self.record("branches".to_string());
        Ok(BranchSummary::default())
    }

    async fn create_branch(&self, name: &str, checkout: bool) -> GatewayResult<BranchResult> {
        self.record(format!("create_branch:{}:{}", name, checkout));
        Ok(BranchResult::ok(name))
    }

    async fn checkout_branch(&self, name: &str) -> GatewayResult<BranchResult> {
        self.record(format!("checkout_branch:{}", name));
        Ok(BranchResult::ok(name))
    }

    async fn delete_branch(&self, name: &str) -> GatewayResult<BranchResult> {
        self.record(format!("delete_branch:{}", name));
        Ok(BranchResult::ok(name))
    }

    async fn get_commit_history(&self, limit: usize) -> GatewayResult<Vec<CommitRecord>> {
        self.record(format!("history:{}", limit));
        Ok(Vec::new())
    }

    async fn get_commit_details(&self, hash: &str) -> GatewayResult<CommitDetail> {
        self.record(format!("details:{}", hash));
        if hash == "deadbeef" {
            return Err(GatewayError::NotFound(format!("Commit not found: {}", hash)));
        }
        Ok(CommitDetail {
            record: record_for(hash),
            diff: String::new(),
            stats: String::new(),
            name_status: String::new(),
        })
    }

    async fn get_diff(&self, path: Option<&RepoPath>, staged: bool) -> GatewayResult<String> {
        let path = path.map(RepoPath::as_str).unwrap_or("*");
        self.record(format!("diff:{}:{}", path, staged));
        Ok(String::new())
    }

    async fn stage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        self.record(format!("stage:{}", join(paths)));
        Ok(Ack::ok())
    }

    async fn unstage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        self.record(format!("unstage:{}", join(paths)));
        Ok(Ack::ok())
    }

    async fn commit(&self, message: &str) -> GatewayResult<CommitResult> {
        self.record(format!("commit:{}", message));
        Ok(CommitResult {
            success: true,
            commit: "abc1234".to_string(),
            summary: CommitSummary {
                changes: 1,
                insertions: 2,
                deletions: 0,
            },
        })
    }

    async fn discard_changes(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        self.record(format!("discard:{}", join(paths)));
        Ok(Ack::ok())
    }

    async fn get_remotes(&self) -> GatewayResult<Vec<RemoteEntry>> {
        self.record("remotes".to_string());
        Ok(Vec::new())
    }

    async fn fetch(&self) -> GatewayResult<Ack> {
        self.record("fetch".to_string());
        Err(GatewayError::Backend(GitError::LockContention(
            "fatal: Unable to create '.git/index.lock': File exists.".to_string(),
        )))
    }

    async fn pull(&self, rebase: bool) -> GatewayResult<PullResult> {
        self.record(format!("pull:{}", rebase));
        Ok(PullResult {
            success: true,
            result: "Already up to date.".to_string(),
        })
    }

    async fn push(&self, force: bool, set_upstream: bool) -> GatewayResult<Ack> {
        self.record(format!("push:{}:{}", force, set_upstream));
        Ok(Ack::ok())
    }

    async fn get_config(&self) -> GatewayResult<ConfigSnapshot> {
        self.record("config".to_string());
        Ok(ConfigSnapshot {
            user_name: "Test User".to_string(),
            user_email: "test@example.com".to_string(),
            default_branch: "main".to_string(),
        })
    }

    async fn set_config(&self, entry: &ConfigEntry) -> GatewayResult<Ack> {
        self.record(format!("set_config:{}={}", entry.key(), entry.value()));
        Ok(Ack::ok())
    }
}

struct TestApp {
    gateway: Arc<RecordingGateway>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let state = AppState::new(gateway.clone(), SessionGuard::new());
        Self { gateway, state }
    }

    fn token(&self) -> String {
        self.state.guard.token().as_str().to_string()
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(self.app(), Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .header(CSRF_HEADER, self.token())
            .body(Body::from(body.to_string()))
            .unwrap();
        send(self.app(), request).await
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_csrf_token_endpoint() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/csrf-token").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], app.token());
    assert_eq!(app.token().len(), 64);
}

#[tokio::test]
async fn test_tokens_differ_between_sessions() {
    assert_ne!(TestApp::new().token(), TestApp::new().token());
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "repository": "/srv/repo" }));
}

#[tokio::test]
async fn test_reads_need_no_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], "main");
    assert_eq!(body["isClean"], true);
    assert_eq!(app.gateway.calls(), vec!["status"]);
}

#[tokio::test]
async fn test_mutation_without_token_is_forbidden() {
    let app = TestApp::new();
    let request = Request::post("/api/commit")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": "sneaky" }).to_string()))
        .unwrap();
    let (status, body) = send(app.app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_mutation_with_wrong_token_is_forbidden() {
    let app = TestApp::new();
    let token = app.token();
    let mut forged = token.clone();
    let last = if forged.ends_with('0') { "1" } else { "0" };
    forged.replace_range(63..64, last);

    for presented in [forged.as_str(), "", &token[..63]] {
        let request = Request::post("/api/stage")
            .header(CSRF_HEADER, presented)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.app(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_token_from_another_session_is_forbidden() {
    let app = TestApp::new();
    let stale = TestApp::new().token();
    let request = Request::delete("/api/branches/feature")
        .header(CSRF_HEADER, stale)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_commit_with_token() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/commit", json!({ "message": "Add feature" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "commit": "abc1234",
            "summary": { "changes": 1, "insertions": 2, "deletions": 0 }
        })
    );
    assert_eq!(app.gateway.calls(), vec!["commit:Add feature"]);
}

#[tokio::test]
async fn test_stage_accepts_one_or_many_paths() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/stage", json!({ "files": "src/main.rs" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    app.post("/api/stage", json!({ "files": ["a.txt", "./docs/b.md"] })).await;
    app.post("/api/stage", json!({})).await;

    assert_eq!(
        app.gateway.calls(),
        vec!["stage:src/main.rs", "stage:a.txt,docs/b.md", "stage:"]
    );
}

#[tokio::test]
async fn test_stage_without_body_means_all() {
    let app = TestApp::new();
    let request = Request::post("/api/unstage")
        .header(CSRF_HEADER, app.token())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.gateway.calls(), vec!["unstage:"]);
}

#[tokio::test]
async fn test_path_traversal_never_reaches_gateway() {
    let app = TestApp::new();

    for files in [
        json!(["ok.txt", "../../etc/passwd"]),
        json!("src/../../outside"),
        json!("..\\..\\windows"),
    ] {
        let (status, body) = app.post("/api/discard", json!({ "files": files })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "validation");
        assert!(body["error"].as_str().unwrap().contains("path traversal"));
    }
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_absolute_and_malformed_paths_rejected() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/stage", json!({ "files": "/etc/passwd" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("absolute"));

    let (status, body) = app.post("/api/stage", json!({ "files": ["a.txt", 42] })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "validation");

    let (status, _) = app.post("/api/stage", json!({ "files": "C:\\Windows" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_diff_validates_file_parameter() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/diff?file=../secret").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = app.get("/api/diff?file=a.txt&staged=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "diff": "" }));

    app.get("/api/diff").await;
    app.get("/api/diff?staged=yes").await;

    assert_eq!(
        app.gateway.calls(),
        vec!["diff:a.txt:true", "diff:*:false", "diff:*:false"]
    );
}

#[tokio::test]
async fn test_config_key_outside_allowlist() {
    let app = TestApp::new();

    for key in ["core.hooksPath", "core.sshCommand", "url.https://evil/.insteadOf", ""] {
        let (status, body) = app
            .post("/api/config", json!({ "key": key, "value": "/tmp/hooks" }))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("user.name, user.email, init.defaultbranch"), "{}", error);
    }
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_config_value_must_be_nonempty_string() {
    let app = TestApp::new();

    for value in [json!("   "), json!(""), json!(42), json!(null)] {
        let (status, body) = app
            .post("/api/config", json!({ "key": "user.name", "value": value }))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "validation");
    }
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_config_set_and_get() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/config", json!({ "key": "User.Name", "value": "  Alice  " }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userName"], "Test User");
    assert_eq!(body["defaultBranch"], "main");

    assert_eq!(app.gateway.calls(), vec!["set_config:user.name=Alice", "config"]);
}

#[tokio::test]
async fn test_history_limit_handling() {
    let app = TestApp::new();

    for uri in [
        "/api/commits",
        "/api/commits?limit=5",
        "/api/commits?limit=5000",
        "/api/commits?limit=abc",
        "/api/commits?limit=0",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    assert_eq!(
        app.gateway.calls(),
        vec!["history:50", "history:5", "history:1000", "history:50", "history:50"]
    );
}

#[tokio::test]
async fn test_configured_history_limit() {
    let gateway = Arc::new(RecordingGateway::new());
    let state = AppState::new(gateway.clone(), SessionGuard::new()).with_history_limit(20);

    let (status, _) = send(router(state), Request::get("/api/commits").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateway.calls(), vec!["history:20"]);
}

#[tokio::test]
async fn test_branch_routes() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/branches", json!({ "name": "topic", "checkout": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "branch": "topic" }));

    app.post("/api/branches/checkout", json!({ "branch": "main" })).await;

    let request = Request::delete("/api/branches/topic")
        .header(CSRF_HEADER, app.token())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.app(), request).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        app.gateway.calls(),
        vec!["create_branch:topic:true", "checkout_branch:main", "delete_branch:topic"]
    );
}

#[tokio::test]
async fn test_remote_operation_flags() {
    let app = TestApp::new();

    app.post("/api/pull", json!({ "rebase": true })).await;
    let (status, body) = app.post("/api/pull", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "Already up to date.");

    app.post("/api/push", json!({ "force": true, "setUpstream": true })).await;
    app.post("/api/push", json!({})).await;

    assert_eq!(
        app.gateway.calls(),
        vec!["pull:true", "pull:false", "push:true:true", "push:false:false"]
    );
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = TestApp::new();
    let request = Request::post("/api/commit")
        .header(CSRF_HEADER, app.token())
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(app.app(), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "validation");
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_backend_errors_are_500() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/fetch", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "backend");
    assert_eq!(body["retryable"], true);

    let (status, body) = app.get("/api/commits/deadbeef").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["error"], "Commit not found: deadbeef");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_commit_details_route() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/commits/abcdef1234").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], "abcdef1234");
    assert_eq!(body["shortHash"], "abcdef1");
    assert_eq!(body["nameStatus"], "");
}

#[tokio::test]
async fn test_foreign_host_is_forbidden() {
    let app = TestApp::new();

    let request = Request::get("/api/csrf-token")
        .header("host", "attacker.example.com:3000")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.app(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("token").is_none());

    let request = Request::get("/api/status")
        .header("host", "localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.app(), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_end_to_end_against_real_repository() {
    let (_temp, repo_path) = create_test_repo();
    std::fs::write(repo_path.join("hello.txt"), "hello\n").unwrap();

    let gateway = GitGateway::new(Repository::open(&repo_path).unwrap());
    let state = AppState::new(Arc::new(gateway), SessionGuard::new());
    let token = state.guard.token().as_str().to_string();

    let post = |uri: &str, body: Value| {
        Request::post(uri)
            .header("content-type", "application/json")
            .header(CSRF_HEADER, token.as_str())
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, _) = send(router(state.clone()), post("/api/stage", json!({ "files": ["hello.txt"] }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(router(state.clone()), post("/api/commit", json!({ "message": "Say hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["changes"], 1);

    let (status, body) = send(
        router(state.clone()),
        Request::get("/api/commits").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let commits = body.as_array().unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["message"], "Say hello");
    let short_hash = commits[0]["shortHash"].as_str().unwrap();
    assert!(commits[0]["hash"].as_str().unwrap().starts_with(short_hash));

    let (_, body) = send(
        router(state.clone()),
        Request::get("/api/status").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["isClean"], true);
    assert_eq!(body["current"], "main");

    let (status, body) = send(router(state), post("/api/stage", json!({ "files": "../escape" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "validation");
}
