//! Owner account operations.

use crate::models::OwnerAccount;

use super::engine::NodeData;
use super::{PolicyGraph, StoreError, StoreResult};

impl PolicyGraph {
    pub fn create_owner(&self, account: OwnerAccount) -> StoreResult<()> {
        let mut g = self.write();
        if g.owner_id_by_email(&account.email).is_some() {
            return Err(StoreError::AccountWithEmailAlreadyExists);
        }
        g.insert(NodeData::Owner(account));
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    pub fn get_owner_by_email(&self, email: &str) -> StoreResult<OwnerAccount> {
        let g = self.read();
        let id = g.owner_id_by_email(email).ok_or(StoreError::AccountNotFound)?;
        Ok(g.owner(id).ok_or(StoreError::AccountNotFound)?.clone())
    }

    pub fn get_owner_by_id(&self, account_id: &str) -> StoreResult<OwnerAccount> {
        let g = self.read();
        let id = g.owner_id_by_account(account_id).ok_or(StoreError::AccountNotFound)?;
        Ok(g.owner(id).ok_or(StoreError::AccountNotFound)?.clone())
    }

    pub fn exists_owner(&self, account_id: &str) -> bool {
        self.read().owner_id_by_account(account_id).is_some()
    }

    pub fn update_owner_password(&self, account_id: &str, new_hash: &str) -> StoreResult<()> {
        let mut g = self.write();
        let node = g.owner_id_by_account(account_id).ok_or(StoreError::AccountNotFound)?;
        let mut account = g.owner(node).ok_or(StoreError::AccountNotFound)?.clone();
        account.password_hash = new_hash.to_string();
        g.replace(node, NodeData::Owner(account));
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Remove the owner node. Callers are responsible for verifying the
    /// account owns no workspaces first; deleting anyway detaches edges.
    pub fn delete_owner(&self, account_id: &str) -> StoreResult<()> {
        let mut g = self.write();
        if let Some(node) = g.owner_id_by_account(account_id) {
            g.remove(node);
            drop(g);
            self.mark_dirty();
        }
        Ok(())
    }
}
