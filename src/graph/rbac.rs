//! Roles, role assignments (service account -> role), role bindings
//! (role -> item) and the nearest-ancestor resolution primitive.

use std::collections::HashMap;

use crate::location::Location;
use crate::models::{Item, Role, ServiceAccount};

use super::engine::{EdgeKind, GraphEngine, NodeData, NodeId};
use super::{PolicyGraph, StoreError, StoreResult};

/// Node of the role scoped to `workspace_name`, verifying the ROLLED_IN edge.
fn role_node_in_workspace(
    g: &GraphEngine,
    workspace_name: &str,
    role_id: &str,
) -> StoreResult<NodeId> {
    let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
    let node = g.role_id_by_role(role_id).ok_or(StoreError::RoleNotFound)?;
    if !g.has_edge(node, EdgeKind::RolledIn, ws_node) {
        return Err(StoreError::RoleNotFound);
    }
    Ok(node)
}

impl PolicyGraph {
    pub fn create_role(&self, role: Role, workspace_name: &str) -> StoreResult<()> {
        let mut g = self.write();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let node = g.insert(NodeData::Role(role));
        g.add_edge(node, EdgeKind::RolledIn, ws_node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    pub fn update_role(&self, role: Role, workspace_name: &str) -> StoreResult<()> {
        let mut g = self.write();
        let node = role_node_in_workspace(&g, workspace_name, &role.id)?;
        g.replace(node, NodeData::Role(role));
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Deleting an absent role is a no-op success.
    pub fn delete_role(&self, role_id: &str, workspace_name: &str) -> StoreResult<()> {
        let mut g = self.write();
        match role_node_in_workspace(&g, workspace_name, role_id) {
            Ok(node) => {
                g.remove(node);
                drop(g);
                self.mark_dirty();
                Ok(())
            }
            Err(StoreError::RoleNotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn get_role(&self, workspace_name: &str, role_id: &str) -> StoreResult<Role> {
        let g = self.read();
        let node = role_node_in_workspace(&g, workspace_name, role_id)?;
        g.role(node).cloned().ok_or(StoreError::RoleNotFound)
    }

    /// A role together with the service accounts holding it.
    pub fn get_role_with_assignees(
        &self,
        workspace_name: &str,
        role_id: &str,
    ) -> StoreResult<(Role, Vec<ServiceAccount>)> {
        let g = self.read();
        let node = role_node_in_workspace(&g, workspace_name, role_id)?;
        let role = g.role(node).cloned().ok_or(StoreError::RoleNotFound)?;
        let mut accounts: Vec<ServiceAccount> = g
            .in_neighbors(node, EdgeKind::HasRole)
            .into_iter()
            .filter_map(|n| g.service(n).cloned())
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok((role, accounts))
    }

    pub fn list_roles_in_workspace(&self, workspace_name: &str) -> StoreResult<Vec<Role>> {
        let g = self.read();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let mut roles: Vec<Role> = g
            .in_neighbors(ws_node, EdgeKind::RolledIn)
            .into_iter()
            .filter_map(|n| g.role(n).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    pub fn list_roles_for_item(&self, location: &Location) -> StoreResult<Vec<Role>> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::ItemNotFound)?;
        let mut roles: Vec<Role> = g
            .in_neighbors(node, EdgeKind::Manages)
            .into_iter()
            .filter_map(|n| g.role(n).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    pub fn list_roles_for_account(&self, account_id: &str) -> Vec<Role> {
        let g = self.read();
        let Some(sa_node) = g.service_id_by_account(account_id) else {
            return Vec::new();
        };
        let mut roles: Vec<Role> = g
            .out_neighbors(sa_node, EdgeKind::HasRole)
            .into_iter()
            .filter_map(|n| g.role(n).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    // ---------------- Assignments ----------------

    pub fn is_role_assigned(&self, role_id: &str, account_id: &str) -> bool {
        let g = self.read();
        match (g.role_id_by_role(role_id), g.service_id_by_account(account_id)) {
            (Some(role), Some(account)) => g.has_edge(account, EdgeKind::HasRole, role),
            _ => false,
        }
    }

    /// Assign a role to a service account in the same workspace.
    pub fn assign_role(&self, role_id: &str, account_id: &str) -> StoreResult<()> {
        let mut g = self.write();
        let role = g.role_id_by_role(role_id).ok_or(StoreError::RoleNotFound)?;
        let account = g.service_id_by_account(account_id).ok_or(StoreError::ServiceAccountNotFound)?;
        let role_ws = g.out_neighbors(role, EdgeKind::RolledIn).first().copied();
        let account_ws = g.out_neighbors(account, EdgeKind::Services).first().copied();
        if role_ws.is_none() || role_ws != account_ws {
            // The account does not exist in the role's workspace.
            return Err(StoreError::ServiceAccountNotFound);
        }
        if g.has_edge(account, EdgeKind::HasRole, role) {
            return Err(StoreError::RoleAlreadyAssigned);
        }
        g.add_edge(account, EdgeKind::HasRole, role);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Removing an absent assignment is a no-op success.
    pub fn unassign_role(&self, role_id: &str, account_id: &str) -> StoreResult<()> {
        let mut g = self.write();
        if let (Some(role), Some(account)) =
            (g.role_id_by_role(role_id), g.service_id_by_account(account_id))
        {
            if g.remove_edge(account, EdgeKind::HasRole, role) {
                drop(g);
                self.mark_dirty();
            }
        }
        Ok(())
    }

    // ---------------- Bindings ----------------

    pub fn is_role_bound(&self, role_id: &str, location: &Location) -> bool {
        let g = self.read();
        match (g.role_id_by_role(role_id), g.item_id_by_location(&location.joined())) {
            (Some(role), Some(item)) => g.has_edge(role, EdgeKind::Manages, item),
            _ => false,
        }
    }

    /// Bind a role to an item in its own workspace.
    pub fn bind_role(&self, role_id: &str, location: &Location) -> StoreResult<()> {
        let mut g = self.write();
        let role = g.role_id_by_role(role_id).ok_or(StoreError::RoleNotFound)?;
        let item = g.item_id_by_location(&location.joined()).ok_or(StoreError::ItemNotFound)?;
        let role_ws = g.out_neighbors(role, EdgeKind::RolledIn).first().copied();
        let item_ws = g.workspace_id_by_name(location.workspace());
        if role_ws.is_none() || role_ws != item_ws {
            // The item does not exist in the role's workspace.
            return Err(StoreError::ItemNotFound);
        }
        if g.has_edge(role, EdgeKind::Manages, item) {
            return Err(StoreError::RoleAlreadyBound);
        }
        g.add_edge(role, EdgeKind::Manages, item);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Removing an absent binding is a no-op success.
    pub fn unbind_role(&self, role_id: &str, location: &Location) -> StoreResult<()> {
        let mut g = self.write();
        if let (Some(role), Some(item)) =
            (g.role_id_by_role(role_id), g.item_id_by_location(&location.joined()))
        {
            if g.remove_edge(role, EdgeKind::Manages, item) {
                drop(g);
                self.mark_dirty();
            }
        }
        Ok(())
    }

    // ---------------- Resolution primitive ----------------

    /// The principal's roles bound at the closest ancestor of `location`
    /// (the target itself included). Multiple roles at the same closest
    /// ancestor are all returned. A single-segment location restricts the
    /// search to roles bound directly to the workspace root. Missing
    /// accounts, items or chains all yield an empty set.
    pub fn find_nearest_bound_roles(&self, account_id: &str, location: &Location) -> Vec<Role> {
        let g = self.read();
        let Some(account) = g.service_id_by_account(account_id) else {
            return Vec::new();
        };
        let Some(target) = g.item_id_by_location(&location.joined()) else {
            return Vec::new();
        };
        let held = g.out_neighbors(account, EdgeKind::HasRole);
        if location.is_root() {
            return held
                .into_iter()
                .filter(|r| g.has_edge(*r, EdgeKind::Manages, target))
                .filter_map(|r| g.role(r).cloned())
                .collect();
        }
        let Some(root) = g.item_id_by_location(location.workspace()) else {
            return Vec::new();
        };
        let Some(chain) = g.containment_chain(root, target) else {
            return Vec::new();
        };
        let depth_of: HashMap<NodeId, usize> =
            chain.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        // For each held role, the deepest chain item it manages; keep the
        // roles whose deepest binding ties for the overall deepest.
        let mut candidates: Vec<(usize, NodeId)> = Vec::new();
        for role in held {
            let deepest = g
                .out_neighbors(role, EdgeKind::Manages)
                .into_iter()
                .filter_map(|item| depth_of.get(&item).copied())
                .max();
            if let Some(depth) = deepest {
                candidates.push((depth, role));
            }
        }
        let Some(best) = candidates.iter().map(|(d, _)| *d).max() else {
            return Vec::new();
        };
        candidates
            .into_iter()
            .filter(|(d, _)| *d == best)
            .filter_map(|(_, r)| g.role(r).cloned())
            .collect()
    }

    /// Items reachable for an account through HAS_ROLE -> MANAGES within one
    /// workspace, deduplicated and sorted by location.
    pub fn list_accessible_items(&self, account_id: &str, workspace_name: &str) -> Vec<Item> {
        let g = self.read();
        let Some(account) = g.service_id_by_account(account_id) else {
            return Vec::new();
        };
        let Some(ws_node) = g.workspace_id_by_name(workspace_name) else {
            return Vec::new();
        };
        if !g.has_edge(account, EdgeKind::Services, ws_node) {
            return Vec::new();
        }
        let mut seen = Vec::new();
        let mut items: Vec<Item> = Vec::new();
        for role in g.out_neighbors(account, EdgeKind::HasRole) {
            for item_node in g.out_neighbors(role, EdgeKind::Manages) {
                if seen.contains(&item_node) {
                    continue;
                }
                seen.push(item_node);
                if let Some(item) = g.item(item_node) {
                    items.push(item.clone());
                }
            }
        }
        items.sort_by(|a, b| a.location().cmp(b.location()));
        items
    }
}
