//! Workspace and service-account operations, including the cascading
//! workspace delete and the rename that rewrites descendant locations.

use chrono::Utc;

use crate::models::{Directory, Item, OwnerAccount, ServiceAccount, Workspace};

use super::engine::{EdgeKind, NodeData};
use super::{PolicyGraph, StoreError, StoreResult};

impl PolicyGraph {
    pub fn exists_workspace(&self, name: &str) -> bool {
        self.read().workspace_id_by_name(name).is_some()
    }

    /// Create a workspace together with its root directory. The root
    /// directory shares the workspace id and its location is the workspace
    /// name itself.
    pub fn create_workspace(&self, workspace: Workspace, owner_account_id: &str) -> StoreResult<()> {
        let mut g = self.write();
        if g.workspace_id_by_name(&workspace.name).is_some() {
            return Err(StoreError::WorkspaceAlreadyExists);
        }
        let owner_node = g.owner_id_by_account(owner_account_id).ok_or(StoreError::AccountNotFound)?;
        let root = Directory {
            id: workspace.id.clone(),
            name: workspace.name.clone(),
            location: workspace.name.clone(),
            created_on: Utc::now(),
        };
        let ws_node = g.insert(NodeData::Workspace(workspace));
        let root_node = g.insert(NodeData::Item(Item::Directory(root)));
        g.add_edge(owner_node, EdgeKind::Owns, ws_node);
        g.add_edge(ws_node, EdgeKind::Stores, root_node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Rename a workspace. The root directory's name and location follow the
    /// workspace name, and every descendant location is rewritten so that
    /// location prefixes stay consistent with the tree.
    pub fn rename_workspace(&self, old_name: &str, new_name: &str) -> StoreResult<()> {
        let mut g = self.write();
        let ws_node = g.workspace_id_by_name(old_name).ok_or(StoreError::WorkspaceNotFound)?;
        if g.workspace_id_by_name(new_name).is_some() {
            return Err(StoreError::WorkspaceAlreadyExists);
        }
        g.rename_workspace_node(ws_node, new_name);
        if let Some(root) = g.out_neighbors(ws_node, EdgeKind::Stores).first().copied() {
            let moves: Vec<(super::NodeId, String)> = g
                .containment_descendants(root)
                .into_iter()
                .filter_map(|id| {
                    let item = g.item(id)?;
                    let old_location = item.location();
                    let new_location = if old_location == old_name {
                        new_name.to_string()
                    } else {
                        format!("{new_name}{}", &old_location[old_name.len()..])
                    };
                    Some((id, new_location))
                })
                .collect();
            for (id, new_location) in moves {
                let rename = (id == root).then_some(new_name);
                g.relocate_item(id, rename, &new_location);
            }
        }
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Delete a workspace and everything scoped to it: the item tree, the
    /// roles rolled into it and the service accounts servicing it.
    pub fn delete_workspace(&self, name: &str) -> StoreResult<()> {
        let mut g = self.write();
        let ws_node = g.workspace_id_by_name(name).ok_or(StoreError::WorkspaceNotFound)?;
        let mut doomed = Vec::new();
        if let Some(root) = g.out_neighbors(ws_node, EdgeKind::Stores).first().copied() {
            doomed.extend(g.containment_descendants(root));
        }
        doomed.extend(g.in_neighbors(ws_node, EdgeKind::RolledIn));
        doomed.extend(g.in_neighbors(ws_node, EdgeKind::Services));
        doomed.push(ws_node);
        for node in doomed {
            g.remove(node);
        }
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    pub fn get_workspace(&self, name: &str) -> StoreResult<Workspace> {
        let g = self.read();
        let ws_node = g.workspace_id_by_name(name).ok_or(StoreError::WorkspaceNotFound)?;
        Ok(g.workspace(ws_node).ok_or(StoreError::WorkspaceNotFound)?.clone())
    }

    pub fn get_workspace_owner(&self, name: &str) -> StoreResult<OwnerAccount> {
        let g = self.read();
        let ws_node = g.workspace_id_by_name(name).ok_or(StoreError::WorkspaceNotFound)?;
        let owner_node = g
            .in_neighbors(ws_node, EdgeKind::Owns)
            .first()
            .copied()
            .ok_or(StoreError::WorkspaceNotFound)?;
        Ok(g.owner(owner_node).ok_or(StoreError::WorkspaceNotFound)?.clone())
    }

    pub fn list_workspaces_by_owner(&self, owner_account_id: &str) -> Vec<Workspace> {
        let g = self.read();
        let Some(owner_node) = g.owner_id_by_account(owner_account_id) else {
            return Vec::new();
        };
        let mut out: Vec<Workspace> = g
            .out_neighbors(owner_node, EdgeKind::Owns)
            .into_iter()
            .filter_map(|n| g.workspace(n).cloned())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    // ---------------- Service accounts ----------------

    pub fn create_service_account(
        &self,
        account: ServiceAccount,
        workspace_name: &str,
    ) -> StoreResult<()> {
        let mut g = self.write();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let duplicate = g
            .in_neighbors(ws_node, EdgeKind::Services)
            .into_iter()
            .filter_map(|n| g.service(n))
            .any(|sa| sa.username == account.username);
        if duplicate {
            return Err(StoreError::ServiceAccountAlreadyExists);
        }
        let sa_node = g.insert(NodeData::Service(account));
        g.add_edge(sa_node, EdgeKind::Services, ws_node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Look up a service account by username within a workspace, returning
    /// the workspace alongside it.
    pub fn get_service_account(
        &self,
        username: &str,
        workspace_name: &str,
    ) -> StoreResult<(ServiceAccount, Workspace)> {
        let g = self.read();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let workspace = g.workspace(ws_node).ok_or(StoreError::WorkspaceNotFound)?.clone();
        let account = g
            .in_neighbors(ws_node, EdgeKind::Services)
            .into_iter()
            .filter_map(|n| g.service(n))
            .find(|sa| sa.username == username)
            .cloned()
            .ok_or(StoreError::ServiceAccountNotFound)?;
        Ok((account, workspace))
    }

    pub fn list_service_accounts(&self, workspace_name: &str) -> StoreResult<Vec<ServiceAccount>> {
        let g = self.read();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let mut out: Vec<ServiceAccount> = g
            .in_neighbors(ws_node, EdgeKind::Services)
            .into_iter()
            .filter_map(|n| g.service(n).cloned())
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(out)
    }

    /// Delete a service account by username. Deleting an absent account is a
    /// no-op success.
    pub fn delete_service_account(&self, workspace_name: &str, username: &str) -> StoreResult<()> {
        let mut g = self.write();
        let ws_node = g.workspace_id_by_name(workspace_name).ok_or(StoreError::WorkspaceNotFound)?;
        let node = g
            .in_neighbors(ws_node, EdgeKind::Services)
            .into_iter()
            .find(|n| g.service(*n).map(|sa| sa.username == username).unwrap_or(false));
        if let Some(node) = node {
            g.remove(node);
            drop(g);
            self.mark_dirty();
        }
        Ok(())
    }
}
