//! Effective-permission computation for a service account at a location.
//!
//! The closest binding along the containment chain expresses the most
//! specific intent, so only roles bound at the minimum distance from the
//! target survive; equidistant survivors are OR-united per flag, so stacked
//! roles stay additive without letting a broader, more distant role override
//! a narrower one.

use crate::graph::PolicyGraph;
use crate::location::Location;
use crate::models::Role;

/// OR the flags of all roles into one synthesized role. Identity fields are
/// left empty; only the flag tuple is meaningful.
pub fn union_roles(roles: &[Role]) -> Role {
    let mut merged = Role::default();
    for role in roles {
        merged.union_flags(role);
    }
    merged
}

/// The synthesized permission set for `account_id` at `location`, or `None`
/// when no binding is reachable along the ancestor chain (deny).
pub fn effective_permissions(
    graph: &PolicyGraph,
    account_id: &str,
    location: &Location,
) -> Option<Role> {
    let nearest = graph.find_nearest_bound_roles(account_id, location);
    if nearest.is_empty() {
        return None;
    }
    Some(union_roles(&nearest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str, read: bool, create: bool) -> Role {
        Role {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            can_read: read,
            can_create: create,
            can_rename: false,
            can_delete: false,
        }
    }

    #[test]
    fn union_is_per_flag_or() {
        let merged = union_roles(&[role("a", true, false), role("b", false, true)]);
        assert!(merged.can_read);
        assert!(merged.can_create);
        assert!(!merged.can_rename);
        assert!(!merged.can_delete);
        assert!(merged.id.is_empty(), "synthesized role carries no identity");
    }

    #[test]
    fn union_of_nothing_grants_nothing() {
        let merged = union_roles(&[]);
        assert!(!merged.can_read && !merged.can_create && !merged.can_rename && !merged.can_delete);
    }
}
