use serde::{Deserialize, Serialize};

use super::Claims;

/// The authenticated caller of a request, as established from its bearer
/// token. Owners bypass RBAC inside the workspaces they own; service
/// accounts go through the resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub account_id: String,
    pub name: String,
    pub username: String,
    pub is_owner: bool,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            account_id: claims.account_id.clone(),
            name: claims.name.clone(),
            username: claims.username.clone(),
            is_owner: claims.is_owner,
        }
    }
}
