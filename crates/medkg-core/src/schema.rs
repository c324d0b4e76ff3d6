//! JSON schema validation and version handling for graph files.

use crate::graph::MedGraph;
use anyhow::{Context, Result};

pub const CURRENT_VERSION: &str = "1.0.0";

/// Validate a graph's schema version.
pub fn validate_version(graph: &MedGraph) -> Result<()> {
    if graph.version != CURRENT_VERSION {
        anyhow::bail!(
            "graph version mismatch: expected {}, found {}",
            CURRENT_VERSION,
            graph.version
        );
    }
    Ok(())
}

/// Serialize a graph to a pretty-printed JSON string.
pub fn to_json(graph: &MedGraph) -> Result<String> {
    serde_json::to_string_pretty(graph).context("failed to serialize graph to JSON")
}

/// Deserialize a graph from a JSON string, validating the version and
/// rebuilding the derived indexes.
pub fn from_json(json: &str) -> Result<MedGraph> {
    let mut graph: MedGraph =
        serde_json::from_str(json).context("failed to deserialize graph from JSON")?;
    validate_version(&graph)?;
    graph.rebuild_indexes();
    Ok(graph)
}
