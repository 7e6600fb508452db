//!
//! Policy graph store
//! ------------------
//! Typed operations over a labelled-property graph holding the whole policy
//! model: owner accounts, workspaces, the item containment tree, service
//! accounts, roles and the role assignment/binding edges. Every exposed
//! operation takes the engine lock once, validates before mutating, and so
//! either succeeds or leaves the store unchanged.
//!
//! Layout:
//! - `engine`: the untyped node/edge core with secondary indexes.
//! - `owners`, `workspaces`, `items`, `rbac`: typed operation groups.
//! - `snapshot`: JSON persistence with atomic replace.

use parking_lot::RwLock;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod engine;
mod items;
mod owners;
mod rbac;
mod snapshot;
mod workspaces;


pub use engine::{EdgeKind, GraphEngine, NodeData, NodeId};

/// Store-level failure conditions. Handlers map these onto the stable wire
/// codes; the store never shapes HTTP responses itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    AccountNotFound,
    AccountWithEmailAlreadyExists,
    WorkspaceAlreadyExists,
    WorkspaceNotFound,
    DirectoryNotFound,
    DirectoryAlreadyExists,
    DirectoryNotEmpty,
    RootDirectory,
    FileNotFound,
    FileAlreadyExists,
    ItemNotFound,
    ServiceAccountAlreadyExists,
    ServiceAccountNotFound,
    RoleNotFound,
    RoleAlreadyAssigned,
    RoleNotAssigned,
    RoleAlreadyBound,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            StoreError::AccountNotFound => "account not found",
            StoreError::AccountWithEmailAlreadyExists => "account with this email already exists",
            StoreError::WorkspaceAlreadyExists => "workspace already exists",
            StoreError::WorkspaceNotFound => "workspace not found",
            StoreError::DirectoryNotFound => "directory not found",
            StoreError::DirectoryAlreadyExists => "directory with the same name already exists",
            StoreError::DirectoryNotEmpty => "directory is not empty",
            StoreError::RootDirectory => "workspace root directory cannot be removed",
            StoreError::FileNotFound => "file not found",
            StoreError::FileAlreadyExists => "file with the same name already exists",
            StoreError::ItemNotFound => "item not found",
            StoreError::ServiceAccountAlreadyExists => "service account already exists",
            StoreError::ServiceAccountNotFound => "service account not found",
            StoreError::RoleNotFound => "role not found",
            StoreError::RoleAlreadyAssigned => "role already assigned to the account",
            StoreError::RoleNotAssigned => "role is not assigned to the account",
            StoreError::RoleAlreadyBound => "role already bound to the location",
        };
        write!(f, "{msg}")
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle over the policy graph. Cloning is cheap; all clones see the
/// same graph. Mutations flip a dirty flag that the background snapshot task
/// observes.
#[derive(Clone)]
pub struct PolicyGraph {
    inner: Arc<RwLock<GraphEngine>>,
    dirty: Arc<AtomicBool>,
    snapshot_path: Option<PathBuf>,
}

impl PolicyGraph {
    /// Fresh in-memory graph without persistence (tests, tooling).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(GraphEngine::default())),
            dirty: Arc::new(AtomicBool::new(false)),
            snapshot_path: None,
        }
    }

    /// Open a graph backed by a snapshot file, loading it when present.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let engine = snapshot::load(&path)?.unwrap_or_default();
        tracing::info!(
            nodes = engine.node_count(),
            snapshot = %path.display(),
            "policy graph opened"
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(engine)),
            dirty: Arc::new(AtomicBool::new(false)),
            snapshot_path: Some(path),
        })
    }

    pub(crate) fn read(&self) -> parking_lot::RwLockReadGuard<'_, GraphEngine> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> parking_lot::RwLockWriteGuard<'_, GraphEngine> {
        self.inner.write()
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn save_snapshot(&self) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else { return Ok(()) };
        let guard = self.inner.read();
        snapshot::save(path, &guard)
    }

    /// Persist the graph when something changed since the last save.
    pub fn save_if_dirty(&self) -> anyhow::Result<bool> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(false);
        }
        match self.save_snapshot() {
            Ok(()) => Ok(true),
            Err(e) => {
                // Leave the flag set so the next tick retries.
                self.dirty.store(true, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().node_count()
    }
}

impl Default for PolicyGraph {
    fn default() -> Self {
        Self::new()
    }
}
