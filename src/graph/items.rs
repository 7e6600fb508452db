//! Item tree operations: directories and files under a workspace root.
//! Creation validates the parent and sibling-name uniqueness across both
//! item kinds before touching the graph.

use crate::location::Location;
use crate::models::{Directory, DirectoryListing, File, Item};

use super::engine::{EdgeKind, GraphEngine, NodeData, NodeId};
use super::{PolicyGraph, StoreError, StoreResult};

fn parent_directory_node(g: &GraphEngine, location: &Location) -> StoreResult<NodeId> {
    let parent = location.parent().ok_or(StoreError::DirectoryNotFound)?;
    let node = g.item_id_by_location(&parent.joined()).ok_or(StoreError::DirectoryNotFound)?;
    match g.item(node) {
        Some(Item::Directory(_)) => Ok(node),
        _ => Err(StoreError::DirectoryNotFound),
    }
}

fn sibling_name_taken(g: &GraphEngine, parent: NodeId, name: &str) -> bool {
    g.out_neighbors(parent, EdgeKind::Contains)
        .into_iter()
        .filter_map(|n| g.item(n))
        .any(|item| item.name() == name)
}

impl PolicyGraph {
    pub fn create_directory(&self, directory: Directory) -> StoreResult<()> {
        let location = Location::parse(&directory.location).map_err(|_| StoreError::DirectoryNotFound)?;
        let mut g = self.write();
        let parent = parent_directory_node(&g, &location)?;
        if sibling_name_taken(&g, parent, &directory.name) {
            return Err(StoreError::DirectoryAlreadyExists);
        }
        let node = g.insert(NodeData::Item(Item::Directory(directory)));
        g.add_edge(parent, EdgeKind::Contains, node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    pub fn create_file(&self, file: File) -> StoreResult<()> {
        let location = Location::parse(&file.location).map_err(|_| StoreError::DirectoryNotFound)?;
        let mut g = self.write();
        let parent = parent_directory_node(&g, &location)?;
        if sibling_name_taken(&g, parent, &file.name) {
            return Err(StoreError::FileAlreadyExists);
        }
        let node = g.insert(NodeData::Item(Item::File(file)));
        g.add_edge(parent, EdgeKind::Contains, node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    pub fn get_directory(&self, location: &Location) -> StoreResult<Directory> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::DirectoryNotFound)?;
        match g.item(node) {
            Some(Item::Directory(d)) => Ok(d.clone()),
            _ => Err(StoreError::DirectoryNotFound),
        }
    }

    pub fn get_file(&self, location: &Location) -> StoreResult<File> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::FileNotFound)?;
        match g.item(node) {
            Some(Item::File(f)) => Ok(f.clone()),
            _ => Err(StoreError::FileNotFound),
        }
    }

    pub fn get_item(&self, location: &Location) -> StoreResult<Item> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::ItemNotFound)?;
        g.item(node).cloned().ok_or(StoreError::ItemNotFound)
    }

    /// The directory plus its children, directories first, each group sorted
    /// by name.
    pub fn list_directory(&self, location: &Location) -> StoreResult<DirectoryListing> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::DirectoryNotFound)?;
        let parent = match g.item(node) {
            Some(Item::Directory(d)) => d.clone(),
            _ => return Err(StoreError::DirectoryNotFound),
        };
        let mut contents: Vec<Item> = g
            .out_neighbors(node, EdgeKind::Contains)
            .into_iter()
            .filter_map(|n| g.item(n).cloned())
            .collect();
        contents.sort_by(|a, b| {
            b.is_directory().cmp(&a.is_directory()).then_with(|| a.name().cmp(b.name()))
        });
        Ok(DirectoryListing {
            id: parent.id,
            name: parent.name,
            location: parent.location,
            created_on: parent.created_on,
            contents,
        })
    }

    pub fn count_children(&self, location: &Location) -> StoreResult<usize> {
        let g = self.read();
        let node = g.item_id_by_location(&location.joined()).ok_or(StoreError::DirectoryNotFound)?;
        match g.item(node) {
            Some(Item::Directory(_)) => Ok(g.out_neighbors(node, EdgeKind::Contains).len()),
            _ => Err(StoreError::DirectoryNotFound),
        }
    }

    /// Delete an empty directory. The workspace root is only removed through
    /// workspace deletion; deleting an already-missing directory succeeds.
    pub fn delete_directory(&self, location: &Location) -> StoreResult<()> {
        if location.is_root() {
            return Err(StoreError::RootDirectory);
        }
        let mut g = self.write();
        let Some(node) = g.item_id_by_location(&location.joined()) else {
            return Ok(());
        };
        match g.item(node) {
            Some(Item::Directory(_)) => {}
            _ => return Err(StoreError::DirectoryNotFound),
        }
        if !g.out_neighbors(node, EdgeKind::Contains).is_empty() {
            return Err(StoreError::DirectoryNotEmpty);
        }
        g.remove(node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }

    /// Delete a file node; absent files are a no-op success.
    pub fn delete_file(&self, location: &Location) -> StoreResult<()> {
        let mut g = self.write();
        let Some(node) = g.item_id_by_location(&location.joined()) else {
            return Ok(());
        };
        match g.item(node) {
            Some(Item::File(_)) => {}
            _ => return Err(StoreError::FileNotFound),
        }
        g.remove(node);
        drop(g);
        self.mark_dirty();
        Ok(())
    }
}
