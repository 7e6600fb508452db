//! The authorization gate: one chokepoint deciding whether a principal may
//! perform an operation at a location. Structural guards (root deletion,
//! non-empty directories, create-at-parent) are enforced here rather than in
//! the resolver.

use crate::graph::PolicyGraph;
use crate::identity::Principal;
use crate::location::Location;
use crate::models::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Rename,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InvalidLocation,
    PermissionDenied,
    RootDeletion,
    DirNotEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `principal` may perform `op` at `location`. For create
/// operations the caller passes the parent location (the directory that will
/// contain the new item).
pub fn authorize(
    graph: &PolicyGraph,
    principal: &Principal,
    op: Operation,
    location: &Location,
) -> Decision {
    // The first path segment names the workspace; without one the location
    // cannot be authorized at all.
    let Ok(owner) = graph.get_workspace_owner(location.workspace()) else {
        return Decision::Deny(DenyReason::InvalidLocation);
    };

    // Structural guards hold for the owner as well.
    match op {
        Operation::Delete => {
            if location.is_root() {
                return Decision::Deny(DenyReason::RootDeletion);
            }
            if let Ok(Item::Directory(_)) = graph.get_item(location) {
                match graph.count_children(location) {
                    Ok(0) => {}
                    Ok(_) => return Decision::Deny(DenyReason::DirNotEmpty),
                    Err(_) => return Decision::Deny(DenyReason::InvalidLocation),
                }
            }
        }
        Operation::Create => match graph.get_item(location) {
            Ok(Item::Directory(_)) => {}
            _ => return Decision::Deny(DenyReason::InvalidLocation),
        },
        Operation::Read | Operation::Rename => {}
    }

    if principal.is_owner && principal.account_id == owner.id {
        return Decision::Allow;
    }

    let Some(permissions) = super::effective_permissions(graph, &principal.account_id, location)
    else {
        return Decision::Deny(DenyReason::PermissionDenied);
    };
    let allowed = match op {
        Operation::Read => permissions.can_read,
        Operation::Create => permissions.can_create,
        Operation::Rename => permissions.can_rename,
        Operation::Delete => permissions.can_delete,
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::{Directory, Workspace};

    fn seeded() -> (PolicyGraph, Principal) {
        let graph = PolicyGraph::new();
        graph
            .create_owner(crate::models::OwnerAccount {
                id: "o1".into(),
                name: "Owner".into(),
                email: "a@x".into(),
                password_hash: "phc".into(),
            })
            .unwrap();
        graph.create_workspace(Workspace { id: "w1".into(), name: "acme".into() }, "o1").unwrap();
        graph
            .create_directory(Directory {
                id: Uuid::new_v4().to_string(),
                name: "a".into(),
                location: "acme/a".into(),
                created_on: Utc::now(),
            })
            .unwrap();
        let owner = Principal {
            account_id: "o1".into(),
            name: "Owner".into(),
            username: "a@x".into(),
            is_owner: true,
        };
        (graph, owner)
    }

    fn locate(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    #[test]
    fn owner_is_always_allowed_in_own_workspace() {
        let (graph, owner) = seeded();
        for op in [Operation::Read, Operation::Create, Operation::Rename] {
            assert_eq!(authorize(&graph, &owner, op, &locate("acme/a")), Decision::Allow);
        }
        assert_eq!(authorize(&graph, &owner, Operation::Delete, &locate("acme/a")), Decision::Allow);
    }

    #[test]
    fn unknown_workspace_is_an_invalid_location() {
        let (graph, owner) = seeded();
        assert_eq!(
            authorize(&graph, &owner, Operation::Read, &locate("ghost/a")),
            Decision::Deny(DenyReason::InvalidLocation)
        );
    }

    #[test]
    fn root_deletion_is_denied_even_for_the_owner() {
        let (graph, owner) = seeded();
        assert_eq!(
            authorize(&graph, &owner, Operation::Delete, &locate("acme")),
            Decision::Deny(DenyReason::RootDeletion)
        );
    }

    #[test]
    fn non_empty_directory_deletion_is_denied_regardless_of_permission() {
        let (graph, owner) = seeded();
        graph
            .create_directory(Directory {
                id: Uuid::new_v4().to_string(),
                name: "b".into(),
                location: "acme/a/b".into(),
                created_on: Utc::now(),
            })
            .unwrap();
        assert_eq!(
            authorize(&graph, &owner, Operation::Delete, &locate("acme/a")),
            Decision::Deny(DenyReason::DirNotEmpty)
        );
    }

    #[test]
    fn create_requires_an_existing_parent_directory() {
        let (graph, owner) = seeded();
        assert_eq!(
            authorize(&graph, &owner, Operation::Create, &locate("acme/missing")),
            Decision::Deny(DenyReason::InvalidLocation)
        );
        assert_eq!(authorize(&graph, &owner, Operation::Create, &locate("acme/a")), Decision::Allow);
    }

    #[test]
    fn non_owner_without_bindings_is_denied() {
        let (graph, _) = seeded();
        graph
            .create_service_account(
                crate::models::ServiceAccount {
                    id: "s1".into(),
                    name: "svc".into(),
                    username: "svc".into(),
                    linked_email: String::new(),
                    should_reset_password: false,
                    password_hash: "phc".into(),
                },
                "acme",
            )
            .unwrap();
        let service = Principal {
            account_id: "s1".into(),
            name: "svc".into(),
            username: "svc@acme".into(),
            is_owner: false,
        };
        assert_eq!(
            authorize(&graph, &service, Operation::Read, &locate("acme/a")),
            Decision::Deny(DenyReason::PermissionDenied)
        );
    }
}
