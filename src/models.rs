//! Entity types stored in the policy graph and shaped onto the wire.
//! Wire JSON uses camelCase field names; items carry a `type` discriminator
//! of `directory` or `file`. Password hashes stay inside the graph snapshot
//! format and are never echoed by handlers, which build explicit account
//! views instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub linked_email: String,
    pub should_reset_password: bool,
    pub password_hash: String,
}

/// A named capability record scoped to one workspace. The resolver also uses
/// this shape for the synthesized flag tuple it returns, with empty identity
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub can_read: bool,
    pub can_create: bool,
    pub can_rename: bool,
    pub can_delete: bool,
}

impl Role {
    /// OR the permission flags of `other` into this role.
    pub fn union_flags(&mut self, other: &Role) {
        self.can_read |= other.can_read;
        self.can_create |= other.can_create;
        self.can_rename |= other.can_rename;
        self.can_delete |= other.can_delete;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub id: String,
    pub name: String,
    pub location: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub location: String,
    pub created_on: DateTime<Utc>,
}

/// Directory or file. The workspace root is the directory whose location is
/// a single segment (the workspace name itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Directory(Directory),
    File(File),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Directory(d) => &d.id,
            Item::File(f) => &f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Directory(d) => &d.name,
            Item::File(f) => &f.name,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Item::Directory(d) => &d.location,
            Item::File(f) => &f.location,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Item::Directory(_))
    }
}

/// `listDirectory` result: the parent directory plus its tagged children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub id: String,
    pub name: String,
    pub location: String,
    pub created_on: DateTime<Utc>,
    pub contents: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_json_carries_type_discriminator() {
        let dir = Item::Directory(Directory {
            id: "d1".into(),
            name: "reports".into(),
            location: "acme/reports".into(),
            created_on: Utc::now(),
        });
        let v = serde_json::to_value(&dir).unwrap();
        assert_eq!(v["type"], "directory");
        assert_eq!(v["location"], "acme/reports");
        assert!(v.get("createdOn").is_some(), "camelCase field name expected");

        let file = Item::File(File {
            id: "f1".into(),
            name: "x.bin".into(),
            size: 1500000,
            location: "acme/a/x.bin".into(),
            created_on: Utc::now(),
        });
        let v = serde_json::to_value(&file).unwrap();
        assert_eq!(v["type"], "file");
        assert_eq!(v["size"], 1500000);
    }

    #[test]
    fn role_union_ors_each_flag() {
        let mut acc = Role { can_read: false, can_create: true, ..Default::default() };
        let other = Role { can_read: true, can_delete: true, ..Default::default() };
        acc.union_flags(&other);
        assert!(acc.can_read && acc.can_create && acc.can_delete);
        assert!(!acc.can_rename);
    }
}
