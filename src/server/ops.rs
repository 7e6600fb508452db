//! Request orchestration: every handler delegates here. Each operation
//! composes the authorization gate, the policy graph, the ticket cache and
//! the blob store, and maps store failures onto the stable wire codes. The
//! HTTP layer above only shapes extraction and status codes.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz::{authorize, Decision, DenyReason, Operation};
use crate::blobs::CHUNK_SIZE;
use crate::error::{codes, AppError, AppResult};
use crate::graph::StoreError;
use crate::identity::{issue_token, Claims, Principal};
use crate::location::Location;
use crate::models::{Directory, DirectoryListing, File, Item, OwnerAccount, Role, ServiceAccount, Workspace};
use crate::security::{hash_password, password_is_strong, verify_password};
use crate::tickets::TransferTicket;

use super::AppState;

const ID_GENERATION_ATTEMPTS: usize = 10;

pub(crate) fn map_store_err(e: StoreError) -> AppError {
    match e {
        StoreError::AccountNotFound => AppError::unauthorized(codes::INVALID_CREDENTIALS),
        StoreError::AccountWithEmailAlreadyExists => AppError::conflict(codes::OA_ALREADY_EXISTS),
        StoreError::WorkspaceAlreadyExists => AppError::conflict(codes::WORKSPACE_EXISTS),
        StoreError::WorkspaceNotFound => AppError::user(codes::INVALID_WORKSPACE),
        StoreError::DirectoryNotFound => AppError::user(codes::INVALID_LOCATION),
        StoreError::DirectoryAlreadyExists => AppError::conflict(codes::DIR_ALREADY_EXISTS),
        StoreError::DirectoryNotEmpty => AppError::user(codes::DIR_NOT_EMPTY),
        StoreError::RootDirectory => AppError::user(codes::INVALID_LOCATION),
        StoreError::FileNotFound => AppError::not_found(codes::RESOURCE_NOT_FOUND),
        StoreError::FileAlreadyExists => AppError::conflict(codes::FILE_ALREADY_EXISTS),
        StoreError::ItemNotFound => AppError::user(codes::INVALID_LOCATION),
        StoreError::ServiceAccountAlreadyExists => AppError::conflict(codes::SA_ALREADY_EXISTS),
        StoreError::ServiceAccountNotFound => AppError::user(codes::SA_NOT_FOUND),
        StoreError::RoleNotFound => AppError::user(codes::ROLE_NOT_FOUND),
        StoreError::RoleAlreadyAssigned => AppError::conflict(codes::ROLE_ALREADY_ASSIGNED),
        StoreError::RoleNotAssigned => AppError::user(codes::ROLE_NOT_ASSIGNED),
        StoreError::RoleAlreadyBound => AppError::conflict(codes::ROLE_ALREADY_ASSIGNED),
    }
}

fn deny_to_error(reason: DenyReason) -> AppError {
    match reason {
        DenyReason::InvalidLocation | DenyReason::RootDeletion => {
            AppError::user(codes::INVALID_LOCATION)
        }
        DenyReason::PermissionDenied => AppError::forbidden(codes::PERMISSION_DENIED),
        DenyReason::DirNotEmpty => AppError::user(codes::DIR_NOT_EMPTY),
    }
}

fn ensure_allowed(
    state: &AppState,
    principal: &Principal,
    op: Operation,
    location: &Location,
) -> AppResult<()> {
    match authorize(&state.graph, principal, op, location) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(deny_to_error(reason)),
    }
}

/// Verify the principal is the owner of the named workspace.
fn require_owner_of(state: &AppState, principal: &Principal, workspace: &str) -> AppResult<OwnerAccount> {
    let owner = state.graph.get_workspace_owner(workspace).map_err(map_store_err)?;
    if !principal.is_owner || owner.id != principal.account_id {
        return Err(AppError::forbidden(codes::PERMISSION_DENIED));
    }
    Ok(owner)
}

fn require_owner(principal: &Principal) -> AppResult<()> {
    if !principal.is_owner {
        return Err(AppError::forbidden(codes::PERMISSION_DENIED));
    }
    Ok(())
}

fn nonempty(value: &str, code: &'static str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::user(code));
    }
    Ok(())
}

pub(crate) fn service_account_view(account: &ServiceAccount) -> Value {
    json!({
        "id": account.id,
        "name": account.name,
        "username": account.username,
        "linkedEmail": account.linked_email,
        "shouldResetPassword": account.should_reset_password,
    })
}

// ---------------- Accounts ----------------

pub fn register_owner(state: &AppState, name: &str, email: &str, password: &str) -> AppResult<()> {
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    if !password_is_strong(password) {
        return Err(AppError::user(codes::WEAK_PASSWORD));
    }
    match state.graph.get_owner_by_email(email) {
        Ok(_) => return Err(AppError::conflict(codes::OA_ALREADY_EXISTS)),
        Err(StoreError::AccountNotFound) => {}
        Err(e) => return Err(map_store_err(e)),
    }

    let mut account_id = None;
    for _ in 0..ID_GENERATION_ATTEMPTS {
        let candidate = Uuid::new_v4().to_string();
        if !state.graph.exists_owner(&candidate) {
            account_id = Some(candidate);
            break;
        }
    }
    let Some(account_id) = account_id else {
        tracing::error!("exhausted id generation attempts for new owner account");
        return Err(AppError::server());
    };

    let account = OwnerAccount {
        id: account_id,
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
    };
    state.graph.create_owner(account.clone()).map_err(map_store_err)?;
    state.mailer.send_account_created(&account.name, &account.email);
    tracing::info!(account = %account.id, "registered owner account");
    Ok(())
}

pub fn login_owner(state: &AppState, email: &str, password: &str, remote_addr: &str) -> AppResult<Value> {
    let account = state.graph.get_owner_by_email(email).map_err(|e| match e {
        StoreError::AccountNotFound => AppError::unauthorized(codes::INVALID_CREDENTIALS),
        other => map_store_err(other),
    })?;
    if !verify_password(&account.password_hash, password) {
        return Err(AppError::unauthorized(codes::INVALID_CREDENTIALS));
    }
    let claims = Claims::new(
        remote_addr,
        Uuid::new_v4().to_string(),
        &account.id,
        &account.name,
        &account.email,
        true,
    );
    let token = issue_token(&state.config.jwt_secret, &claims)?;
    state.mailer.send_login_notice(&account.name, &account.email);
    tracing::info!(account = %account.id, "owner login");
    Ok(json!({
        "account": {
            "id": account.id,
            "name": account.name,
            "username": account.email,
            "isOwner": true,
        },
        "token": token,
    }))
}

pub fn login_service_account(
    state: &AppState,
    username: &str,
    password: &str,
    remote_addr: &str,
) -> AppResult<Value> {
    // Login usernames route as `localpart@workspaceName`; anything else is
    // rejected outright.
    let mut parts = username.split('@');
    let (local, workspace) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(workspace), None) if !local.is_empty() && !workspace.is_empty() => {
            (local, workspace)
        }
        _ => return Err(AppError::unauthorized(codes::INVALID_CREDENTIALS)),
    };
    let (account, workspace) = state
        .graph
        .get_service_account(local, workspace)
        .map_err(|_| AppError::unauthorized(codes::INVALID_CREDENTIALS))?;
    if !verify_password(&account.password_hash, password) {
        return Err(AppError::unauthorized(codes::INVALID_CREDENTIALS));
    }
    let claims = Claims::new(
        remote_addr,
        Uuid::new_v4().to_string(),
        &account.id,
        &account.name,
        username,
        false,
    );
    let token = issue_token(&state.config.jwt_secret, &claims)?;
    tracing::info!(account = %account.id, workspace = %workspace.name, "service account login");
    Ok(json!({
        "token": token,
        "account": {
            "id": account.id,
            "name": account.name,
            "username": account.username,
            "isOwner": false,
            "workspace": workspace.name,
        },
    }))
}

pub fn change_owner_password(
    state: &AppState,
    principal: &Principal,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    require_owner(principal)?;
    let account = state.graph.get_owner_by_id(&principal.account_id).map_err(map_store_err)?;
    if !verify_password(&account.password_hash, old_password) {
        return Err(AppError::unauthorized(codes::INVALID_CREDENTIALS));
    }
    if !password_is_strong(new_password) {
        return Err(AppError::user(codes::WEAK_PASSWORD));
    }
    let hash = hash_password(new_password)?;
    state.graph.update_owner_password(&principal.account_id, &hash).map_err(map_store_err)
}

/// Deleting an owner account requires a fresh password check and an account
/// with no remaining workspaces.
pub fn delete_owner_account(state: &AppState, principal: &Principal, password: &str) -> AppResult<()> {
    require_owner(principal)?;
    let account = state.graph.get_owner_by_id(&principal.account_id).map_err(map_store_err)?;
    if !verify_password(&account.password_hash, password) {
        return Err(AppError::unauthorized(codes::INVALID_CREDENTIALS));
    }
    if !state.graph.list_workspaces_by_owner(&principal.account_id).is_empty() {
        return Err(AppError::user(codes::ACCOUNT_HAS_WORKSPACE));
    }
    state.graph.delete_owner(&principal.account_id).map_err(map_store_err)?;
    tracing::info!(account = %principal.account_id, "owner account deleted");
    Ok(())
}

// ---------------- Workspaces ----------------

pub fn workspace_available(state: &AppState, principal: &Principal, name: &str) -> AppResult<bool> {
    require_owner(principal)?;
    nonempty(name, codes::INVALID_WORKSPACE)?;
    Ok(!state.graph.exists_workspace(name))
}

pub fn list_workspaces(state: &AppState, principal: &Principal) -> AppResult<Vec<Workspace>> {
    require_owner(principal)?;
    Ok(state.graph.list_workspaces_by_owner(&principal.account_id))
}

pub fn create_workspace(state: &AppState, principal: &Principal, name: &str) -> AppResult<Workspace> {
    require_owner(principal)?;
    Location::workspace_root(name)?;
    let workspace = Workspace { id: Uuid::new_v4().to_string(), name: name.to_string() };
    state.graph.create_workspace(workspace.clone(), &principal.account_id).map_err(map_store_err)?;
    state.blobs.create_workspace_dir(name)?;
    tracing::info!(workspace = %name, owner = %principal.account_id, "workspace created");
    Ok(workspace)
}

pub fn delete_workspace(state: &AppState, principal: &Principal, name: &str) -> AppResult<()> {
    nonempty(name, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, name)?;
    state.graph.delete_workspace(name).map_err(map_store_err)?;
    let purged = state.tickets.purge_workspace(name);
    if purged > 0 {
        tracing::debug!(workspace = %name, purged, "dropped in-flight transfer tickets");
    }
    state.blobs.delete_workspace_dir(name)?;
    tracing::info!(workspace = %name, "workspace deleted");
    Ok(())
}

pub fn rename_workspace(
    state: &AppState,
    principal: &Principal,
    old_name: &str,
    new_name: &str,
) -> AppResult<Workspace> {
    nonempty(old_name, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, old_name)?;
    Location::workspace_root(new_name).map_err(|_| AppError::user(codes::INVALID_WORKSPACE))?;
    state.graph.rename_workspace(old_name, new_name).map_err(map_store_err)?;
    state.blobs.rename_workspace_dir(old_name, new_name)?;
    state.graph.get_workspace(new_name).map_err(map_store_err)
}

// ---------------- Service accounts ----------------

pub fn list_service_accounts(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
) -> AppResult<Vec<ServiceAccount>> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, workspace)?;
    state.graph.list_service_accounts(workspace).map_err(map_store_err)
}

pub fn create_service_account(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    name: &str,
    username: &str,
    password: &str,
) -> AppResult<ServiceAccount> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, workspace)?;
    if name.is_empty() || username.is_empty() || password.is_empty() || username.contains('@') {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    if !password_is_strong(password) {
        return Err(AppError::user(codes::WEAK_PASSWORD));
    }
    let account = ServiceAccount {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        username: username.to_string(),
        linked_email: String::new(),
        should_reset_password: true,
        password_hash: hash_password(password)?,
    };
    state.graph.create_service_account(account.clone(), workspace).map_err(map_store_err)?;
    tracing::info!(workspace = %workspace, username = %username, "service account created");
    Ok(account)
}

pub fn delete_service_account(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    username: &str,
) -> AppResult<()> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, workspace)?;
    state.graph.delete_service_account(workspace, username).map_err(map_store_err)
}

// ---------------- Filesystem ----------------

pub fn read_directory(
    state: &AppState,
    principal: &Principal,
    location: &str,
) -> AppResult<DirectoryListing> {
    let location = Location::parse(location)?;
    ensure_allowed(state, principal, Operation::Read, &location)?;
    state.graph.list_directory(&location).map_err(map_store_err)
}

pub fn create_directory(
    state: &AppState,
    principal: &Principal,
    location: &str,
    new_directory_name: &str,
) -> AppResult<Directory> {
    let parent = Location::parse(location)?;
    let target = parent.child(new_directory_name)?;
    ensure_allowed(state, principal, Operation::Create, &parent)?;
    let directory = Directory {
        id: Uuid::new_v4().to_string(),
        name: new_directory_name.to_string(),
        location: target.joined(),
        created_on: Utc::now(),
    };
    state.graph.create_directory(directory.clone()).map_err(map_store_err)?;
    Ok(directory)
}

pub fn delete_directory(state: &AppState, principal: &Principal, location: &str) -> AppResult<()> {
    let location = Location::parse(location)?;
    ensure_allowed(state, principal, Operation::Delete, &location)?;
    state.graph.delete_directory(&location).map_err(map_store_err)
}

/// Authorize a download and issue its ticket. The response tells the client
/// the chunk window size and how many windows to pull.
pub fn begin_download(state: &AppState, principal: &Principal, location: &str) -> AppResult<Value> {
    let location = Location::parse(location)?;
    ensure_allowed(state, principal, Operation::Read, &location)?;
    let file = state.graph.get_file(&location).map_err(map_store_err)?;
    let chunk_total = file.size.div_ceil(CHUNK_SIZE);
    let ticket = state.tickets.issue(file);
    tracing::debug!(link = %ticket.link_id, location = %location, "download ticket issued");
    Ok(json!({
        "chunkSize": CHUNK_SIZE,
        "chunkTotal": chunk_total,
        "downloadLink": ticket.link_id,
    }))
}

/// Authorize an upload at the parent directory and issue its ticket. Nothing
/// touches the graph or the disk until chunks arrive.
pub fn begin_upload(
    state: &AppState,
    principal: &Principal,
    location: &str,
    name: &str,
    size: u64,
) -> AppResult<Value> {
    let parent = Location::parse(location)?;
    let target = parent.child(name)?;
    if size == 0 {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    ensure_allowed(state, principal, Operation::Create, &parent)?;
    let file = File {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        size,
        location: target.joined(),
        created_on: Utc::now(),
    };
    let ticket = state.tickets.issue(file);
    tracing::debug!(link = %ticket.link_id, location = %target, "upload ticket issued");
    Ok(json!({ "uploadLink": ticket.link_id }))
}

fn ticket_workspace(ticket: &TransferTicket) -> String {
    ticket.file.location.split('/').next().unwrap_or_default().to_string()
}

/// Append one upload chunk. On the final chunk the file enters the graph;
/// when that fails (name collision, parent vanished) the dangling blob is
/// cleaned up best-effort and the failure is reported.
pub fn upload_chunk(
    state: &AppState,
    link_id: &str,
    chunk_current: u64,
    chunk_total: u64,
    data: &str,
) -> AppResult<Value> {
    let ticket = state
        .tickets
        .get(link_id)
        .ok_or_else(|| AppError::user(codes::INVALID_UPLOAD_ID))?;
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|_| AppError::user(codes::INVALID_DATA))?;
    let workspace = ticket_workspace(&ticket);
    state.blobs.append_chunk(&workspace, &ticket.file.id, &bytes)?;

    if chunk_current != chunk_total {
        return Ok(json!({}));
    }
    if let Err(e) = state.graph.create_file(ticket.file.clone()) {
        if let Err(cleanup) = state.blobs.remove_blob(&workspace, &ticket.file.id) {
            tracing::error!(link = %link_id, "failed to clean up dangling blob: {cleanup:#}");
        }
        state.tickets.delete(link_id);
        return Err(map_store_err(e));
    }
    state.tickets.delete(link_id);
    tracing::info!(location = %ticket.file.location, size = ticket.file.size, "upload persisted");
    Ok(json!({ "newFile": ticket.file }))
}

/// Serve one download chunk for a live ticket.
pub fn download_chunk(state: &AppState, link_id: &str, chunk_current: u64) -> AppResult<Vec<u8>> {
    let ticket = state
        .tickets
        .get(link_id)
        .ok_or_else(|| AppError::user(codes::INVALID_UPLOAD_ID))?;
    let workspace = ticket_workspace(&ticket);
    let chunk = state
        .blobs
        .read_chunk(&workspace, &ticket.file.id, chunk_current, ticket.file.size)?;
    Ok(chunk)
}

pub fn delete_file(state: &AppState, principal: &Principal, location: &str) -> AppResult<()> {
    let location = Location::parse(location)?;
    ensure_allowed(state, principal, Operation::Delete, &location)?;
    let file = match state.graph.get_file(&location) {
        Ok(file) => file,
        // Deleting an already-missing file is a no-op success.
        Err(StoreError::FileNotFound) => return Ok(()),
        Err(e) => return Err(map_store_err(e)),
    };
    state.graph.delete_file(&location).map_err(map_store_err)?;
    // Blob removal happens out-of-band; the graph is already consistent.
    let blobs = state.blobs.clone();
    let workspace = location.workspace().to_string();
    tokio::spawn(async move {
        if let Err(e) = blobs.remove_blob(&workspace, &file.id) {
            tracing::error!(file = %file.id, "blob removal failed: {e:#}");
        }
    });
    Ok(())
}

pub fn shared_items(state: &AppState, principal: &Principal, workspace: &str) -> AppResult<Vec<Item>> {
    nonempty(workspace, codes::INVALID_DATA)?;
    Ok(state.graph.list_accessible_items(&principal.account_id, workspace))
}

pub fn directory_details(
    state: &AppState,
    principal: &Principal,
    location: &str,
) -> AppResult<(Directory, Vec<Role>)> {
    let location = Location::parse(location)?;
    require_owner_of(state, principal, location.workspace())?;
    let directory = state.graph.get_directory(&location).map_err(map_store_err)?;
    let roles = state.graph.list_roles_for_item(&location).map_err(map_store_err)?;
    Ok((directory, roles))
}

pub fn file_details(
    state: &AppState,
    principal: &Principal,
    location: &str,
) -> AppResult<(File, Vec<Role>)> {
    let location = Location::parse(location)?;
    require_owner_of(state, principal, location.workspace())?;
    let file = state.graph.get_file(&location).map_err(map_store_err)?;
    let roles = state.graph.list_roles_for_item(&location).map_err(map_store_err)?;
    Ok((file, roles))
}

// ---------------- Roles ----------------

pub struct RoleSpec<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub can_read: bool,
    pub can_create: bool,
    pub can_rename: bool,
    pub can_delete: bool,
}

pub fn role_details(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    role_id: &str,
) -> AppResult<(Role, Vec<ServiceAccount>)> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    nonempty(role_id, codes::INVALID_DATA)?;
    require_owner_of(state, principal, workspace)?;
    state.graph.get_role_with_assignees(workspace, role_id).map_err(map_store_err)
}

pub fn create_role(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    spec: RoleSpec<'_>,
) -> AppResult<Role> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    nonempty(spec.name, codes::INVALID_DATA)?;
    require_owner_of(state, principal, workspace)?;
    let role = Role {
        id: Uuid::new_v4().to_string(),
        name: spec.name.to_string(),
        description: spec.description.to_string(),
        can_read: spec.can_read,
        can_create: spec.can_create,
        can_rename: spec.can_rename,
        can_delete: spec.can_delete,
    };
    state.graph.create_role(role.clone(), workspace).map_err(map_store_err)?;
    Ok(role)
}

/// Update an existing role. Identity fields are validated before any store
/// call; empty name/description keep their previous values while the flags
/// always take the submitted tuple.
pub fn update_role(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    role_id: &str,
    spec: RoleSpec<'_>,
) -> AppResult<Role> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    nonempty(role_id, codes::INVALID_DATA)?;
    require_owner_of(state, principal, workspace)?;
    let mut role = state.graph.get_role(workspace, role_id).map_err(map_store_err)?;
    if !spec.name.is_empty() {
        role.name = spec.name.to_string();
    }
    if !spec.description.is_empty() {
        role.description = spec.description.to_string();
    }
    role.can_read = spec.can_read;
    role.can_create = spec.can_create;
    role.can_rename = spec.can_rename;
    role.can_delete = spec.can_delete;
    state.graph.update_role(role.clone(), workspace).map_err(map_store_err)?;
    Ok(role)
}

pub fn delete_role(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    role_id: &str,
) -> AppResult<()> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    nonempty(role_id, codes::INVALID_DATA)?;
    require_owner_of(state, principal, workspace)?;
    state.graph.delete_role(role_id, workspace).map_err(map_store_err)
}

pub fn assign_role(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    role_id: &str,
    account_id: &str,
) -> AppResult<()> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    if role_id.is_empty() || account_id.is_empty() {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    require_owner_of(state, principal, workspace)?;
    // Scope the role to the workspace first so foreign role ids read as
    // missing rather than leaking across tenants.
    state.graph.get_role(workspace, role_id).map_err(map_store_err)?;
    state.graph.assign_role(role_id, account_id).map_err(map_store_err)
}

pub fn unassign_role(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    role_id: &str,
    account_id: &str,
) -> AppResult<()> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    if role_id.is_empty() || account_id.is_empty() {
        return Err(AppError::user(codes::INVALID_DATA));
    }
    require_owner_of(state, principal, workspace)?;
    state.graph.unassign_role(role_id, account_id).map_err(map_store_err)
}

pub fn bind_role(
    state: &AppState,
    principal: &Principal,
    location: &str,
    role_id: &str,
) -> AppResult<()> {
    nonempty(role_id, codes::INVALID_DATA)?;
    let location = Location::parse(location)?;
    require_owner_of(state, principal, location.workspace())?;
    let role = state.graph.get_role(location.workspace(), role_id).map_err(map_store_err)?;
    state.graph.bind_role(&role.id, &location).map_err(map_store_err)
}

pub fn unbind_role(
    state: &AppState,
    principal: &Principal,
    location: &str,
    role_id: &str,
) -> AppResult<()> {
    nonempty(role_id, codes::INVALID_DATA)?;
    let location = Location::parse(location)?;
    require_owner_of(state, principal, location.workspace())?;
    state.graph.unbind_role(role_id, &location).map_err(map_store_err)
}

pub fn roles_for_account(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
    account_id: &str,
) -> AppResult<Vec<Role>> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    nonempty(account_id, codes::INVALID_DATA)?;
    require_owner_of(state, principal, workspace)?;
    Ok(state.graph.list_roles_for_account(account_id))
}

pub fn roles_in_workspace(
    state: &AppState,
    principal: &Principal,
    workspace: &str,
) -> AppResult<Vec<Role>> {
    nonempty(workspace, codes::INVALID_WORKSPACE)?;
    require_owner_of(state, principal, workspace)?;
    state.graph.list_roles_in_workspace(workspace).map_err(map_store_err)
}
