use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::git::gateway::{
    Ack, BranchResult, BranchSummary, CommitDetail, CommitRecord, CommitResult, ConfigSnapshot,
    PullResult, RemoteEntry, StatusSnapshot,
};
use crate::security::{ConfigPolicy, RepoPath, ValidationError};
use crate::server::response::{ApiError, ApiResult};
use crate::server::AppState;

/// Upper bound on `?limit=` for history queries
pub const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub repository: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiffResponse {
    pub diff: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBranchRequest {
    pub name: String,
    pub checkout: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutRequest {
    pub branch: String,
}

/// Body of stage/unstage/discard; `files` is one path, a list, or absent for "all"
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilesRequest {
    pub files: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommitRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub rebase: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushRequest {
    pub force: bool,
    pub set_upstream: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetConfigRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitsQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiffQuery {
    pub file: Option<String>,
    pub staged: Option<String>,
}

/// Decode an optional JSON body; an empty body means "all defaults"
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::from(ValidationError::MalformedBody(e.to_string())))
}

fn validate_files(state: &AppState, files: Option<&Value>) -> ApiResult<Vec<RepoPath>> {
    match files {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(state.paths.validate_json(value)?),
    }
}

pub async fn csrf_token(State(state): State<AppState>) -> Json<TokenResponse> {
    Json(TokenResponse {
        token: state.guard.token().as_str().to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        repository: state.gateway.root().display().to_string(),
    })
}

pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusSnapshot>> {
    Ok(Json(state.gateway.get_status().await?))
}

pub async fn list_branches(State(state): State<AppState>) -> ApiResult<Json<BranchSummary>> {
    Ok(Json(state.gateway.get_branches().await?))
}

pub async fn create_branch(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<BranchResult>> {
    let request: CreateBranchRequest = parse_body(&body)?;
    Ok(Json(state.gateway.create_branch(&request.name, request.checkout).await?))
}

pub async fn checkout_branch(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<BranchResult>> {
    let request: CheckoutRequest = parse_body(&body)?;
    Ok(Json(state.gateway.checkout_branch(&request.branch).await?))
}

pub async fn delete_branch(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<BranchResult>> {
    Ok(Json(state.gateway.delete_branch(&name).await?))
}

pub async fn commit_history(
    State(state): State<AppState>,
    Query(query): Query<CommitsQuery>,
) -> ApiResult<Json<Vec<CommitRecord>>> {
    let limit = query
        .limit
        .and_then(|limit| limit.trim().parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(state.history_limit)
        .min(MAX_HISTORY_LIMIT);
    Ok(Json(state.gateway.get_commit_history(limit).await?))
}

pub async fn commit_details(State(state): State<AppState>, Path(hash): Path<String>) -> ApiResult<Json<CommitDetail>> {
    Ok(Json(state.gateway.get_commit_details(&hash).await?))
}

pub async fn diff(State(state): State<AppState>, Query(query): Query<DiffQuery>) -> ApiResult<Json<DiffResponse>> {
    let path = match query.file.as_deref() {
        None | Some("") => None,
        Some(file) => Some(state.paths.validate(file)?),
    };
    let staged = query.staged.as_deref() == Some("true");
    let diff = state.gateway.get_diff(path.as_ref(), staged).await?;
    Ok(Json(DiffResponse { diff }))
}

pub async fn stage(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: FilesRequest = parse_body(&body)?;
    let paths = validate_files(&state, request.files.as_ref())?;
    Ok(Json(state.gateway.stage_files(&paths).await?))
}

pub async fn unstage(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: FilesRequest = parse_body(&body)?;
    let paths = validate_files(&state, request.files.as_ref())?;
    Ok(Json(state.gateway.unstage_files(&paths).await?))
}

pub async fn commit(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<CommitResult>> {
    let request: CommitRequest = parse_body(&body)?;
    Ok(Json(state.gateway.commit(&request.message).await?))
}

pub async fn discard(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: FilesRequest = parse_body(&body)?;
    let paths = validate_files(&state, request.files.as_ref())?;
    Ok(Json(state.gateway.discard_changes(&paths).await?))
}

pub async fn remotes(State(state): State<AppState>) -> ApiResult<Json<Vec<RemoteEntry>>> {
    Ok(Json(state.gateway.get_remotes().await?))
}

pub async fn fetch(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    Ok(Json(state.gateway.fetch().await?))
}

pub async fn pull(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PullResult>> {
    let request: PullRequest = parse_body(&body)?;
    Ok(Json(state.gateway.pull(request.rebase).await?))
}

pub async fn push(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: PushRequest = parse_body(&body)?;
    Ok(Json(state.gateway.push(request.force, request.set_upstream).await?))
}

pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<ConfigSnapshot>> {
    Ok(Json(state.gateway.get_config().await?))
}

pub async fn set_config(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Ack>> {
    let request: SetConfigRequest = parse_body(&body)?;
    let entry = ConfigPolicy::check_set_json(&request.key, &request.value)?;
    Ok(Json(state.gateway.set_config(&entry).await?))
}
