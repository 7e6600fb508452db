//! RBAC integration tests: nearest-ancestor resolution, OR-union of
//! equidistant roles and the owner bypass, exercised through the operation
//! layer the HTTP handlers delegate to.

use tempfile::{tempdir, TempDir};

use stowage::config::AppConfig;
use stowage::error::codes;
use stowage::identity::Principal;
use stowage::models::{Role, ServiceAccount};
use stowage::server::{ops, AppState};

fn test_state() -> (AppState, TempDir) {
    let tmp = tempdir().unwrap();
    let state = AppState::new(AppConfig::for_root(tmp.path(), "test-secret")).unwrap();
    (state, tmp)
}

fn owner_principal(state: &AppState, email: &str) -> Principal {
    ops::register_owner(state, "Owner", email, "P@ssw0rd!").unwrap();
    let account = state.graph.get_owner_by_email(email).unwrap();
    Principal {
        account_id: account.id,
        name: account.name,
        username: account.email,
        is_owner: true,
    }
}

fn service_principal(state: &AppState, owner: &Principal, workspace: &str, username: &str) -> (Principal, ServiceAccount) {
    let account =
        ops::create_service_account(state, owner, workspace, username, username, "P@ssw0rd!")
            .unwrap();
    let principal = Principal {
        account_id: account.id.clone(),
        name: account.name.clone(),
        username: format!("{username}@{workspace}"),
        is_owner: false,
    };
    (principal, account)
}

fn make_role(
    state: &AppState,
    owner: &Principal,
    workspace: &str,
    name: &str,
    read: bool,
    create: bool,
) -> Role {
    ops::create_role(
        state,
        owner,
        workspace,
        ops::RoleSpec {
            name,
            description: "",
            can_read: read,
            can_create: create,
            can_rename: false,
            can_delete: false,
        },
    )
    .unwrap()
}

/// acme with directories a, a/b, a/b/c owned by a fresh owner.
fn seeded_tree(state: &AppState) -> Principal {
    let owner = owner_principal(state, "a@x");
    ops::create_workspace(state, &owner, "acme").unwrap();
    ops::create_directory(state, &owner, "acme", "a").unwrap();
    ops::create_directory(state, &owner, "acme/a", "b").unwrap();
    ops::create_directory(state, &owner, "acme/a/b", "c").unwrap();
    owner
}

#[tokio::test]
async fn nearest_ancestor_binding_overrides_a_more_distant_one() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, account) = service_principal(&state, &owner, "acme", "svc");

    let r1 = make_role(&state, &owner, "acme", "reader", true, false);
    let r2 = make_role(&state, &owner, "acme", "creator", false, true);
    ops::assign_role(&state, &owner, "acme", &r1.id, &account.id).unwrap();
    ops::assign_role(&state, &owner, "acme", &r2.id, &account.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a", &r1.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a/b", &r2.id).unwrap();

    // READ at acme/a/b/c resolves to r2 (closer ancestor), which denies.
    let err = ops::read_directory(&state, &service, "acme/a/b/c").unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);
    assert_eq!(err.http_status(), 403);

    // CREATE at acme/a/b/c resolves to r2, which allows.
    let dir = ops::create_directory(&state, &service, "acme/a/b/c", "d").unwrap();
    assert_eq!(dir.location, "acme/a/b/c/d");

    // Above the r2 binding, r1 applies again and read succeeds.
    let listing = ops::read_directory(&state, &service, "acme/a").unwrap();
    assert_eq!(listing.location, "acme/a");
}

#[tokio::test]
async fn equidistant_roles_union_their_flags() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, account) = service_principal(&state, &owner, "acme", "svc");

    let r2 = make_role(&state, &owner, "acme", "creator", false, true);
    let r3 = make_role(&state, &owner, "acme", "reader", true, false);
    ops::assign_role(&state, &owner, "acme", &r2.id, &account.id).unwrap();
    ops::assign_role(&state, &owner, "acme", &r3.id, &account.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a/b", &r2.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a/b", &r3.id).unwrap();

    // Both roles sit at the same depth: read OR-unions to allowed.
    assert!(ops::read_directory(&state, &service, "acme/a/b/c").is_ok());
    assert!(ops::create_directory(&state, &service, "acme/a/b/c", "d").is_ok());
}

#[tokio::test]
async fn owner_bypasses_resolution_entirely() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    assert!(ops::read_directory(&state, &owner, "acme/a/b/c").is_ok());
    assert!(ops::create_directory(&state, &owner, "acme/a/b/c", "d").is_ok());
    assert!(ops::delete_directory(&state, &owner, "acme/a/b/c/d").is_ok());
}

#[tokio::test]
async fn another_owner_is_not_bypassed() {
    let (state, _tmp) = test_state();
    let _owner = seeded_tree(&state);
    let stranger = owner_principal(&state, "b@x");
    let err = ops::read_directory(&state, &stranger, "acme/a").unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);
}

#[tokio::test]
async fn no_reachable_binding_denies() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, _) = service_principal(&state, &owner, "acme", "svc");
    let err = ops::read_directory(&state, &service, "acme/a/b").unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);
}

#[tokio::test]
async fn root_access_requires_a_root_binding() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, account) = service_principal(&state, &owner, "acme", "svc");
    let role = make_role(&state, &owner, "acme", "reader", true, false);
    ops::assign_role(&state, &owner, "acme", &role.id, &account.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a", &role.id).unwrap();

    let err = ops::read_directory(&state, &service, "acme").unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);

    ops::bind_role(&state, &owner, "acme", &role.id).unwrap();
    assert!(ops::read_directory(&state, &service, "acme").is_ok());
}

#[tokio::test]
async fn duplicate_assignment_and_binding_report_conflicts() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (_, account) = service_principal(&state, &owner, "acme", "svc");
    let role = make_role(&state, &owner, "acme", "reader", true, false);

    ops::assign_role(&state, &owner, "acme", &role.id, &account.id).unwrap();
    let err = ops::assign_role(&state, &owner, "acme", &role.id, &account.id).unwrap_err();
    assert_eq!(err.code_str(), codes::ROLE_ALREADY_ASSIGNED);

    ops::bind_role(&state, &owner, "acme/a", &role.id).unwrap();
    let err = ops::bind_role(&state, &owner, "acme/a", &role.id).unwrap_err();
    assert_eq!(err.code_str(), codes::ROLE_ALREADY_ASSIGNED);

    // Unassigning twice stays a success.
    ops::unassign_role(&state, &owner, "acme", &role.id, &account.id).unwrap();
    ops::unassign_role(&state, &owner, "acme", &role.id, &account.id).unwrap();
}

#[tokio::test]
async fn role_operations_are_owner_only_and_workspace_scoped() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, account) = service_principal(&state, &owner, "acme", "svc");
    let role = make_role(&state, &owner, "acme", "reader", true, false);

    // A service account may not administer roles.
    let err = ops::create_role(
        &state,
        &service,
        "acme",
        ops::RoleSpec {
            name: "sneaky",
            description: "",
            can_read: true,
            can_create: true,
            can_rename: true,
            can_delete: true,
        },
    )
    .unwrap_err();
    assert_eq!(err.code_str(), codes::PERMISSION_DENIED);

    // Roles from another workspace read as missing.
    ops::create_workspace(&state, &owner, "beta").unwrap();
    let err = ops::bind_role(&state, &owner, "beta", &role.id).unwrap_err();
    assert_eq!(err.code_str(), codes::ROLE_NOT_FOUND);
    let beta_role = make_role(&state, &owner, "beta", "reader", true, false);
    let err = ops::assign_role(&state, &owner, "beta", &beta_role.id, &account.id).unwrap_err();
    assert_eq!(err.code_str(), codes::SA_NOT_FOUND);
}

#[tokio::test]
async fn update_role_validates_identifiers_first() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let spec = ops::RoleSpec {
        name: "renamed",
        description: "",
        can_read: true,
        can_create: false,
        can_rename: false,
        can_delete: false,
    };
    let err = ops::update_role(&state, &owner, "", "some-role", spec).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_WORKSPACE);
    let spec = ops::RoleSpec {
        name: "renamed",
        description: "",
        can_read: true,
        can_create: false,
        can_rename: false,
        can_delete: false,
    };
    let err = ops::update_role(&state, &owner, "acme", "", spec).unwrap_err();
    assert_eq!(err.code_str(), codes::INVALID_DATA);
}

#[tokio::test]
async fn shared_view_lists_items_reachable_through_roles() {
    let (state, _tmp) = test_state();
    let owner = seeded_tree(&state);
    let (service, account) = service_principal(&state, &owner, "acme", "svc");
    let role = make_role(&state, &owner, "acme", "reader", true, false);
    ops::assign_role(&state, &owner, "acme", &role.id, &account.id).unwrap();
    ops::bind_role(&state, &owner, "acme/a/b", &role.id).unwrap();

    let shared = ops::shared_items(&state, &service, "acme").unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].location(), "acme/a/b");
}
