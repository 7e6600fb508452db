//! In-memory labelled-property graph engine.
//! ------------------------------------------
//! Nodes carry typed entity payloads, edges carry a relation kind. Secondary
//! indexes give O(1) lookup for the keys the policy layer queries by (owner
//! email/id, workspace name, item location, service-account id, role id) and
//! are rebuilt wholesale when a snapshot is restored. The engine itself knows
//! nothing about authorization; the typed operations live in the sibling
//! modules.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::models::{Item, OwnerAccount, Role, ServiceAccount, Workspace};

pub type NodeId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeData {
    Workspace(Workspace),
    Owner(OwnerAccount),
    Service(ServiceAccount),
    Item(Item),
    Role(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// OwnerAccount -> Workspace
    Owns,
    /// Workspace -> root Directory
    Stores,
    /// Directory -> Directory | File
    Contains,
    /// ServiceAccount -> Workspace
    Services,
    /// ServiceAccount -> Role
    HasRole,
    /// Role -> Workspace
    RolledIn,
    /// Role -> Item
    Manages,
}

#[derive(Default)]
pub struct GraphEngine {
    next_id: NodeId,
    nodes: HashMap<NodeId, NodeData>,
    out: HashMap<NodeId, Vec<(EdgeKind, NodeId)>>,
    inc: HashMap<NodeId, Vec<(EdgeKind, NodeId)>>,

    // Secondary indexes over node payload keys.
    owner_by_email: HashMap<String, NodeId>,
    owner_by_id: HashMap<String, NodeId>,
    workspace_by_name: HashMap<String, NodeId>,
    item_by_location: HashMap<String, NodeId>,
    service_by_id: HashMap<String, NodeId>,
    role_by_id: HashMap<String, NodeId>,
}

impl GraphEngine {
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.index_node(id, &data);
        self.nodes.insert(id, data);
        id
    }

    /// Remove a node and every edge touching it (detach-delete).
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        let data = self.nodes.remove(&id)?;
        self.unindex_node(&data);
        if let Some(edges) = self.out.remove(&id) {
            for (kind, to) in edges {
                if let Some(v) = self.inc.get_mut(&to) {
                    v.retain(|(k, n)| !(*k == kind && *n == id));
                }
            }
        }
        if let Some(edges) = self.inc.remove(&id) {
            for (kind, from) in edges {
                if let Some(v) = self.out.get_mut(&from) {
                    v.retain(|(k, n)| !(*k == kind && *n == id));
                }
            }
        }
        Some(data)
    }

    pub fn add_edge(&mut self, from: NodeId, kind: EdgeKind, to: NodeId) {
        self.out.entry(from).or_default().push((kind, to));
        self.inc.entry(to).or_default().push((kind, from));
    }

    pub fn remove_edge(&mut self, from: NodeId, kind: EdgeKind, to: NodeId) -> bool {
        let mut removed = false;
        if let Some(v) = self.out.get_mut(&from) {
            let before = v.len();
            v.retain(|(k, n)| !(*k == kind && *n == to));
            removed = v.len() != before;
        }
        if removed {
            if let Some(v) = self.inc.get_mut(&to) {
                v.retain(|(k, n)| !(*k == kind && *n == from));
            }
        }
        removed
    }

    pub fn has_edge(&self, from: NodeId, kind: EdgeKind, to: NodeId) -> bool {
        self.out
            .get(&from)
            .map(|v| v.iter().any(|(k, n)| *k == kind && *n == to))
            .unwrap_or(false)
    }

    pub fn out_neighbors(&self, from: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        self.out
            .get(&from)
            .map(|v| v.iter().filter(|(k, _)| *k == kind).map(|(_, n)| *n).collect())
            .unwrap_or_default()
    }

    pub fn in_neighbors(&self, to: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        self.inc
            .get(&to)
            .map(|v| v.iter().filter(|(k, _)| *k == kind).map(|(_, n)| *n).collect())
            .unwrap_or_default()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ---------------- Typed payload accessors ----------------

    pub fn owner(&self, id: NodeId) -> Option<&OwnerAccount> {
        match self.nodes.get(&id)? {
            NodeData::Owner(o) => Some(o),
            _ => None,
        }
    }

    pub fn workspace(&self, id: NodeId) -> Option<&Workspace> {
        match self.nodes.get(&id)? {
            NodeData::Workspace(w) => Some(w),
            _ => None,
        }
    }

    pub fn service(&self, id: NodeId) -> Option<&ServiceAccount> {
        match self.nodes.get(&id)? {
            NodeData::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn item(&self, id: NodeId) -> Option<&Item> {
        match self.nodes.get(&id)? {
            NodeData::Item(i) => Some(i),
            _ => None,
        }
    }

    pub fn role(&self, id: NodeId) -> Option<&Role> {
        match self.nodes.get(&id)? {
            NodeData::Role(r) => Some(r),
            _ => None,
        }
    }

    // ---------------- Index lookups ----------------

    pub fn owner_id_by_email(&self, email: &str) -> Option<NodeId> {
        self.owner_by_email.get(email).copied()
    }

    pub fn owner_id_by_account(&self, account_id: &str) -> Option<NodeId> {
        self.owner_by_id.get(account_id).copied()
    }

    pub fn workspace_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.workspace_by_name.get(name).copied()
    }

    pub fn item_id_by_location(&self, location: &str) -> Option<NodeId> {
        self.item_by_location.get(location).copied()
    }

    pub fn service_id_by_account(&self, account_id: &str) -> Option<NodeId> {
        self.service_by_id.get(account_id).copied()
    }

    pub fn role_id_by_role(&self, role_id: &str) -> Option<NodeId> {
        self.role_by_id.get(role_id).copied()
    }

    /// Relocate an item in the location index and rewrite its payload
    /// location (and name, when it changes with it).
    pub fn relocate_item(&mut self, id: NodeId, new_name: Option<&str>, new_location: &str) {
        if let Some(NodeData::Item(item)) = self.nodes.get_mut(&id) {
            let old_location = item.location().to_string();
            match item {
                Item::Directory(d) => {
                    d.location = new_location.to_string();
                    if let Some(n) = new_name {
                        d.name = n.to_string();
                    }
                }
                Item::File(f) => {
                    f.location = new_location.to_string();
                    if let Some(n) = new_name {
                        f.name = n.to_string();
                    }
                }
            }
            self.item_by_location.remove(&old_location);
            self.item_by_location.insert(new_location.to_string(), id);
        }
    }

    /// Rename a workspace node and fix its name index entry.
    pub fn rename_workspace_node(&mut self, id: NodeId, new_name: &str) {
        if let Some(NodeData::Workspace(ws)) = self.nodes.get_mut(&id) {
            self.workspace_by_name.remove(&ws.name);
            ws.name = new_name.to_string();
            self.workspace_by_name.insert(new_name.to_string(), id);
        }
    }

    /// Replace the payload of a node in place, keeping indexes consistent.
    pub fn replace(&mut self, id: NodeId, data: NodeData) {
        if let Some(old) = self.nodes.remove(&id) {
            self.unindex_node(&old);
        }
        self.index_node(id, &data);
        self.nodes.insert(id, data);
    }

    // ---------------- Traversal ----------------

    /// Path root -> target along `Contains` edges, both ends inclusive.
    /// Returns `None` when the target is not reachable from the root.
    pub fn containment_chain(&self, root: NodeId, target: NodeId) -> Option<Vec<NodeId>> {
        if root == target {
            return Some(vec![root]);
        }
        let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([root]);
        while let Some(n) = queue.pop_front() {
            for next in self.out_neighbors(n, EdgeKind::Contains) {
                if next == root || prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, n);
                if next == target {
                    let mut chain = vec![target];
                    let mut cur = target;
                    while let Some(&p) = prev.get(&cur) {
                        chain.push(p);
                        cur = p;
                    }
                    chain.reverse();
                    return Some(chain);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// All nodes reachable from `root` along `Contains` edges, root included.
    pub fn containment_descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(n) = queue.pop_front() {
            for next in self.out_neighbors(n, EdgeKind::Contains) {
                if !seen.contains(&next) {
                    seen.push(next);
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    // ---------------- Snapshot support ----------------

    pub fn export_nodes(&self) -> Vec<(NodeId, NodeData)> {
        let mut v: Vec<_> = self.nodes.iter().map(|(id, d)| (*id, d.clone())).collect();
        v.sort_by_key(|(id, _)| *id);
        v
    }

    pub fn export_edges(&self) -> Vec<(NodeId, EdgeKind, NodeId)> {
        let mut v: Vec<_> = self
            .out
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(|(k, to)| (*from, *k, *to)))
            .collect();
        v.sort();
        v
    }

    /// Rebuild an engine from exported nodes and edges, restoring indexes.
    pub fn restore(nodes: Vec<(NodeId, NodeData)>, edges: Vec<(NodeId, EdgeKind, NodeId)>) -> Self {
        let mut engine = GraphEngine::default();
        for (id, data) in nodes {
            engine.index_node(id, &data);
            engine.nodes.insert(id, data);
            engine.next_id = engine.next_id.max(id + 1);
        }
        for (from, kind, to) in edges {
            engine.add_edge(from, kind, to);
        }
        engine
    }

    fn index_node(&mut self, id: NodeId, data: &NodeData) {
        match data {
            NodeData::Owner(o) => {
                self.owner_by_email.insert(o.email.clone(), id);
                self.owner_by_id.insert(o.id.clone(), id);
            }
            NodeData::Workspace(w) => {
                self.workspace_by_name.insert(w.name.clone(), id);
            }
            NodeData::Item(i) => {
                self.item_by_location.insert(i.location().to_string(), id);
            }
            NodeData::Service(s) => {
                self.service_by_id.insert(s.id.clone(), id);
            }
            NodeData::Role(r) => {
                self.role_by_id.insert(r.id.clone(), id);
            }
        }
    }

    fn unindex_node(&mut self, data: &NodeData) {
        match data {
            NodeData::Owner(o) => {
                self.owner_by_email.remove(&o.email);
                self.owner_by_id.remove(&o.id);
            }
            NodeData::Workspace(w) => {
                self.workspace_by_name.remove(&w.name);
            }
            NodeData::Item(i) => {
                self.item_by_location.remove(i.location());
            }
            NodeData::Service(s) => {
                self.service_by_id.remove(&s.id);
            }
            NodeData::Role(r) => {
                self.role_by_id.remove(&r.id);
            }
        }
    }
}
