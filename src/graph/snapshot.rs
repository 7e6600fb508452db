//! JSON snapshot persistence for the policy graph.
//! Snapshots are written to a temp file and atomically renamed into place;
//! indexes are rebuilt on load rather than persisted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::engine::{EdgeKind, GraphEngine, NodeData, NodeId};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    nodes: Vec<(NodeId, NodeData)>,
    edges: Vec<(NodeId, EdgeKind, NodeId)>,
}

pub fn save(path: &Path, engine: &GraphEngine) -> Result<()> {
    let snap = Snapshot {
        version: SNAPSHOT_VERSION,
        nodes: engine.export_nodes(),
        edges: engine.export_edges(),
    };
    let bytes = serde_json::to_vec(&snap).context("serializing graph snapshot")?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

/// Load a snapshot when one exists; `Ok(None)` when the file is absent.
pub fn load(path: &Path) -> Result<Option<GraphEngine>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let snap: Snapshot =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    anyhow::ensure!(snap.version == SNAPSHOT_VERSION, "unsupported snapshot version {}", snap.version);
    Ok(Some(GraphEngine::restore(snap.nodes, snap.edges)))
}
