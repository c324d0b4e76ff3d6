//! Read/write graph and checkpoint files under the data directory.

use crate::graph::MedGraph;
use crate::schema;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const GRAPH_FILE: &str = "medical_kg.json";
const ENTITIES_FILE: &str = "entities.json";
const RELATIONS_FILE: &str = "relations.json";

/// Path to the graph file inside a data directory.
pub fn graph_file(data_dir: &Path) -> PathBuf {
    data_dir.join(GRAPH_FILE)
}

/// Path to the entity extraction checkpoint file.
pub fn entities_file(data_dir: &Path) -> PathBuf {
    data_dir.join(ENTITIES_FILE)
}

/// Path to the relation extraction checkpoint file.
pub fn relations_file(data_dir: &Path) -> PathBuf {
    data_dir.join(RELATIONS_FILE)
}

/// Check if a graph file exists in the data directory.
pub fn graph_exists(data_dir: &Path) -> bool {
    graph_file(data_dir).exists()
}

/// Load a graph from an explicit file path.
pub fn load_path(path: &Path) -> Result<MedGraph> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph from {}", path.display()))?;
    schema::from_json(&json)
}

/// Load a graph from the data directory.
pub fn load(data_dir: &Path) -> Result<MedGraph> {
    load_path(&graph_file(data_dir))
}

/// Save a graph into the data directory, creating it if needed.
pub fn save(data_dir: &Path, graph: &MedGraph) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    let path = graph_file(data_dir);
    let json = schema::to_json(graph)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write graph to {}", path.display()))?;
    Ok(())
}

/// Write a serializable checkpoint (entities or relations) as pretty JSON.
pub fn save_checkpoint<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(data).context("failed to serialize checkpoint")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write checkpoint to {}", path.display()))?;
    Ok(())
}

/// Load a checkpoint file if it exists. Returns `None` when absent.
pub fn load_checkpoint<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read checkpoint from {}", path.display()))?;
    let data = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse checkpoint {}", path.display()))?;
    Ok(Some(data))
}
