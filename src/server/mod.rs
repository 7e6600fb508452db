//!
//! stowage HTTP server
//! -------------------
//! Axum-based HTTP API over the policy graph, the transfer ticket cache and
//! the blob store.
//!
//! Responsibilities:
//! - Bearer-token authentication on every protected route.
//! - Owner/workspace/service-account administration endpoints.
//! - RBAC-gated filesystem endpoints plus chunked upload/download traffic.
//! - Role CRUD, role assignment and role binding endpoints.
//! - Background reclamation: expired transfer tickets and graph snapshots.
//!
//! Handlers stay thin: extraction and status codes here, behavior in `ops`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::blobs::BlobStore;
use crate::config::AppConfig;
use crate::error::{codes, AppError, AppResult};
use crate::graph::PolicyGraph;
use crate::identity::{verify_token, Principal};
use crate::mail::Mailer;
use crate::tickets::TicketCache;

pub mod ops;

/// Shared server state injected into all handlers. Cloning shares the
/// underlying graph, ticket cache and blob store.
#[derive(Clone)]
pub struct AppState {
    pub graph: PolicyGraph,
    pub tickets: TicketCache,
    pub blobs: BlobStore,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let blobs = BlobStore::new(&config.storage_location)?;
        let graph = PolicyGraph::open(&config.snapshot_path)?;
        let tickets = TicketCache::new();
        let mailer = crate::mail::from_config(&config);
        Ok(Self { graph, tickets, blobs, mailer, config: Arc::new(config) })
    }
}

/// Start the server: build state, spawn the background loops and serve the
/// router until the process ends.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let port = config.port;
    let state = AppState::new(config)?;

    // Background ticket sweeper.
    {
        let tickets = state.tickets.clone();
        let interval = state.config.sweep_interval_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
                let removed = tickets.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "ticket_sweep");
                }
            }
        });
    }

    // Background graph snapshot saver.
    {
        let graph = state.graph.clone();
        let interval = state.config.snapshot_interval_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
                match graph.save_if_dirty() {
                    Ok(true) => tracing::debug!("graph snapshot saved"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("graph snapshot failed: {e:#}"),
                }
            }
        });
    }

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/server/status", get(server_status))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/sa/login", post(sa_login))
        .route("/auth/change-password", axum::routing::patch(change_password))
        .route("/auth/check", get(check_auth))
        .route("/auth/account", axum::routing::delete(delete_account))
        .route("/ws/check-avl", get(check_workspace_availability))
        .route(
            "/ws/op",
            get(list_workspaces_handler)
                .put(create_workspace_handler)
                .delete(delete_workspace_handler)
                .patch(rename_workspace_handler),
        )
        .route(
            "/ws/account",
            get(list_accounts_handler).put(create_account_handler).delete(delete_account_handler),
        )
        .route(
            "/fs/dir/query",
            get(dir_read_handler).put(dir_create_handler).delete(dir_delete_handler),
        )
        .route(
            "/fs/file/query",
            get(file_download_handler).post(file_upload_handler).delete(file_delete_handler),
        )
        .route("/fs/dir/details", get(dir_details_handler))
        .route("/fs/file/details", get(file_details_handler))
        .route("/fs/shared/query", get(shared_handler))
        .route("/fs/upload/{link_id}", post(upload_chunk_handler))
        .route("/fs/download/{link_id}", get(download_chunk_handler))
        .route(
            "/role/op",
            get(role_get_handler)
                .put(role_create_handler)
                .delete(role_delete_handler)
                .patch(role_update_handler),
        )
        .route("/role/assign", post(role_assign_handler).delete(role_unassign_handler))
        .route("/rbac/fs", post(role_bind_handler).delete(role_unbind_handler))
        .route("/roles/sa", get(account_roles_handler))
        .route("/roles/details", get(workspace_roles_handler))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

// ---------------- Extraction helpers ----------------

fn principal_from_headers(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let raw = headers
        .get("Authorization")
        .ok_or_else(|| AppError::unauthorized(codes::NO_TOKEN_FOUND))?;
    let value = raw.to_str().map_err(|_| AppError::unauthorized(codes::INVALID_TOKEN))?;
    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(AppError::unauthorized(codes::INVALID_TOKEN));
    }
    let claims = verify_token(&state.config.jwt_secret, parts[1])?;
    Ok(Principal::from(&claims))
}

/// `Chunk-Current` and `Chunk-Total` headers, 1-based and ordered.
fn chunk_headers(headers: &HeaderMap) -> AppResult<(u64, u64)> {
    let read = |name: &str| -> AppResult<u64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| AppError::user(codes::INVALID_DATA))
    };
    let current = read("Chunk-Current")?;
    let total = read("Chunk-Total")?;
    if current == 0 || total == 0 || current > total {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    Ok((current, total))
}

async fn not_found() -> AppError {
    AppError::not_found(codes::RESOURCE_NOT_FOUND)
}

async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

// ---------------- Server ----------------

async fn server_status() -> impl IntoResponse {
    (StatusCode::OK, "Server is running")
}

// ---------------- Auth ----------------

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    ops::register_owner(&state, &payload.name, &payload.email, &payload.password)?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<Json<Value>> {
    let body = ops::login_owner(&state, &payload.email, &payload.password, &addr.to_string())?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct SaLoginPayload {
    username: String,
    password: String,
}

async fn sa_login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<SaLoginPayload>,
) -> AppResult<Json<Value>> {
    let body =
        ops::login_service_account(&state, &payload.username, &payload.password, &addr.to_string())?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordPayload {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::change_owner_password(&state, &principal, &payload.old_password, &payload.new_password)?;
    Ok(Json(json!({})))
}

async fn check_auth(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    Ok(Json(json!({
        "account": {
            "id": principal.account_id,
            "name": principal.name,
            "username": principal.username,
            "isOwner": principal.is_owner,
        }
    })))
}

#[derive(Debug, Deserialize)]
struct DeleteAccountPayload {
    password: String,
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteAccountPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_owner_account(&state, &principal, &payload.password)?;
    Ok(Json(json!({})))
}

// ---------------- Workspaces ----------------

#[derive(Debug, Deserialize)]
struct NameQuery {
    name: String,
}

async fn check_workspace_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NameQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let available = ops::workspace_available(&state, &principal, &query.name)?;
    Ok(Json(json!({ "available": available })))
}

async fn list_workspaces_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let workspaces = ops::list_workspaces(&state, &principal)?;
    Ok(Json(json!({ "workspaces": workspaces })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspacePayload {
    workspace_name: String,
}

async fn create_workspace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WorkspacePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let principal = principal_from_headers(&state, &headers)?;
    let workspace = ops::create_workspace(&state, &principal, &payload.workspace_name)?;
    Ok((StatusCode::CREATED, Json(json!({ "workspace": workspace }))))
}

async fn delete_workspace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WorkspacePayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_workspace(&state, &principal, &payload.workspace_name)?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameWorkspacePayload {
    workspace_name: String,
    new_workspace_name: String,
}

async fn rename_workspace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RenameWorkspacePayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let workspace = ops::rename_workspace(
        &state,
        &principal,
        &payload.workspace_name,
        &payload.new_workspace_name,
    )?;
    Ok(Json(json!({ "workspace": workspace })))
}

// ---------------- Service accounts ----------------

#[derive(Debug, Deserialize)]
struct WorkspaceQuery {
    workspace: String,
}

async fn list_accounts_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WorkspaceQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let accounts = ops::list_service_accounts(&state, &principal, &query.workspace)?;
    let views: Vec<Value> = accounts.iter().map(ops::service_account_view).collect();
    Ok(Json(json!({ "accounts": views })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountPayload {
    workspace_name: String,
    name: String,
    username: String,
    password: String,
}

async fn create_account_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateAccountPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let principal = principal_from_headers(&state, &headers)?;
    let account = ops::create_service_account(
        &state,
        &principal,
        &payload.workspace_name,
        &payload.name,
        &payload.username,
        &payload.password,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "newServiceAccount": {
                "id": account.id,
                "name": account.name,
                "username": account.username,
            }
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountInWorkspacePayload {
    workspace_name: String,
    username: String,
}

async fn delete_account_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteAccountInWorkspacePayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_service_account(&state, &principal, &payload.workspace_name, &payload.username)?;
    Ok(Json(json!({})))
}

// ---------------- Filesystem ----------------

#[derive(Debug, Deserialize)]
struct LocationQuery {
    location: String,
}

async fn dir_read_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let listing = ops::read_directory(&state, &principal, &query.location)?;
    Ok(Json(json!({ "directoryAndContents": listing })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewDirectoryPayload {
    new_directory_name: String,
}

async fn dir_create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
    Json(payload): Json<NewDirectoryPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let principal = principal_from_headers(&state, &headers)?;
    let directory =
        ops::create_directory(&state, &principal, &query.location, &payload.new_directory_name)?;
    Ok((StatusCode::CREATED, Json(json!({ "newDirectory": directory }))))
}

async fn dir_delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_directory(&state, &principal, &query.location)?;
    Ok(Json(json!({})))
}

async fn file_download_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let body = ops::begin_download(&state, &principal, &query.location)?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct NewFilePayload {
    name: String,
    size: u64,
}

async fn file_upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
    Json(payload): Json<NewFilePayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let body =
        ops::begin_upload(&state, &principal, &query.location, &payload.name, payload.size)?;
    Ok(Json(body))
}

async fn file_delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_file(&state, &principal, &query.location)?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    data: String,
}

async fn upload_chunk_handler(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ChunkPayload>,
) -> AppResult<Json<Value>> {
    // The ticket itself is the authorization; the bearer check still gates
    // who may talk to the endpoint at all.
    principal_from_headers(&state, &headers)?;
    let (current, total) = chunk_headers(&headers)?;
    let body = ops::upload_chunk(&state, &link_id, current, total, &payload.data)?;
    Ok(Json(body))
}

async fn download_chunk_handler(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Vec<u8>> {
    principal_from_headers(&state, &headers)?;
    let (current, _total) = chunk_headers(&headers)?;
    ops::download_chunk(&state, &link_id, current)
}

async fn shared_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WorkspaceQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let shared = ops::shared_items(&state, &principal, &query.workspace)?;
    Ok(Json(json!({ "sharedContent": shared })))
}

async fn dir_details_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let (directory, roles) = ops::directory_details(&state, &principal, &query.location)?;
    Ok(Json(json!({ "directory": directory, "roles": roles })))
}

async fn file_details_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let (file, roles) = ops::file_details(&state, &principal, &query.location)?;
    Ok(Json(json!({ "file": file, "roles": roles })))
}

// ---------------- Roles ----------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleQuery {
    workspace_name: String,
    role_id: String,
}

async fn role_get_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RoleQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let (role, accounts) =
        ops::role_details(&state, &principal, &query.workspace_name, &query.role_id)?;
    let views: Vec<Value> = accounts.iter().map(ops::service_account_view).collect();
    Ok(Json(json!({ "role": { "role": role, "accounts": views } })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RolePayload {
    workspace_name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    can_read: bool,
    #[serde(default)]
    can_create: bool,
    #[serde(default)]
    can_rename: bool,
    #[serde(default)]
    can_delete: bool,
}

impl RolePayload {
    fn spec(&self) -> ops::RoleSpec<'_> {
        ops::RoleSpec {
            name: &self.name,
            description: &self.description,
            can_read: self.can_read,
            can_create: self.can_create,
            can_rename: self.can_rename,
            can_delete: self.can_delete,
        }
    }
}

async fn role_create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RolePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let principal = principal_from_headers(&state, &headers)?;
    let role = ops::create_role(&state, &principal, &payload.workspace_name, payload.spec())?;
    Ok((StatusCode::CREATED, Json(json!({ "role": role }))))
}

async fn role_update_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RolePayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let role = ops::update_role(
        &state,
        &principal,
        &payload.workspace_name,
        &payload.id,
        payload.spec(),
    )?;
    Ok(Json(json!({ "role": role })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleIdPayload {
    workspace_name: String,
    role_id: String,
}

async fn role_delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleIdPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::delete_role(&state, &principal, &payload.workspace_name, &payload.role_id)?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignPayload {
    workspace_name: String,
    role_id: String,
    account_id: String,
}

async fn role_assign_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleAssignPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::assign_role(
        &state,
        &principal,
        &payload.workspace_name,
        &payload.role_id,
        &payload.account_id,
    )?;
    Ok(Json(json!({ "success": true })))
}

async fn role_unassign_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleAssignPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::unassign_role(
        &state,
        &principal,
        &payload.workspace_name,
        &payload.role_id,
        &payload.account_id,
    )?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleBindPayload {
    location: String,
    role_id: String,
}

async fn role_bind_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleBindPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::bind_role(&state, &principal, &payload.location, &payload.role_id)?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn role_unbind_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoleBindPayload>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    ops::unbind_role(&state, &principal, &payload.location, &payload.role_id)?;
    Ok(Json(json!({})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRolesQuery {
    account_id: String,
    workspace_name: String,
}

async fn account_roles_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccountRolesQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let roles =
        ops::roles_for_account(&state, &principal, &query.workspace_name, &query.account_id)?;
    Ok(Json(json!({ "roles": roles })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceNameQuery {
    workspace_name: String,
}

async fn workspace_roles_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WorkspaceNameQuery>,
) -> AppResult<Json<Value>> {
    let principal = principal_from_headers(&state, &headers)?;
    let roles = ops::roles_in_workspace(&state, &principal, &query.workspace_name)?;
    Ok(Json(json!({ "roles": roles })))
}
