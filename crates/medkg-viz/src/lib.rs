//! Graph exports for external renderers.
//!
//! Nothing here draws pixels. The graph is written in formats that
//! established renderers consume: DOT for Graphviz, a node-link JSON
//! document for D3, a self-contained HTML page for the browser, and a
//! statistics JSON for dashboards.

pub mod export;
pub mod html;
pub mod stats;

use anyhow::{Context, Result};
use medkg_core::graph::MedGraph;
use std::path::Path;

pub use export::{export_d3_json, export_dot, ExportFormat};
pub use html::export_html;
pub use stats::{graph_stats, GraphStats};

/// Write the requested export formats into `output_dir`, creating it if
/// needed. Returns the list of files written.
pub fn write_outputs(
    graph: &MedGraph,
    output_dir: &Path,
    formats: &[ExportFormat],
    max_nodes: usize,
) -> Result<Vec<std::path::PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut written = Vec::new();
    for format in formats {
        let (name, content) = match format {
            ExportFormat::Dot => ("medical_kg.dot".to_string(), export_dot(graph, max_nodes)),
            ExportFormat::D3 => (
                "medical_kg_d3.json".to_string(),
                serde_json::to_string_pretty(&export_d3_json(graph, max_nodes))
                    .context("failed to serialize D3 export")?,
            ),
            ExportFormat::Html => (
                "medical_kg.html".to_string(),
                export_html(graph, max_nodes).context("failed to render HTML export")?,
            ),
            ExportFormat::Stats => (
                "medical_kg_stats.json".to_string(),
                serde_json::to_string_pretty(&graph_stats(graph))
                    .context("failed to serialize statistics")?,
            ),
        };
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote export");
        written.push(path);
    }
    Ok(written)
}
