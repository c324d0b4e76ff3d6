//! Self-contained interactive HTML page. The node-link data is embedded
//! inline; the force-graph renderer loads from a CDN.

use anyhow::{Context, Result};
use medkg_core::graph::MedGraph;

use crate::export::export_d3_json;

/// Render an interactive force-graph page for the graph. The returned
/// string is a complete HTML document with the graph data inlined.
pub fn export_html(graph: &MedGraph, max_nodes: usize) -> Result<String> {
    let doc = export_d3_json(graph, max_nodes);
    let data = serde_json::to_string(&doc).context("failed to serialize graph data")?;
    // </script> inside a string literal would terminate the script block
    let data = data.replace("</", "<\\/");
    Ok(PAGE_TEMPLATE.replace("__GRAPH_DATA__", &data))
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Medical Knowledge Graph</title>
<style>
  body { margin: 0; font-family: sans-serif; }
  #graph { width: 100vw; height: 100vh; }
  .tooltip { font-size: 13px; }
</style>
<script src="https://cdn.jsdelivr.net/npm/force-graph@1"></script>
</head>
<body>
<div id="graph"></div>
<script>
const data = __GRAPH_DATA__;
// force-graph wants object references; map indices to node objects
data.links = data.links.map(l => ({
  ...l,
  source: data.nodes[l.source].id,
  target: data.nodes[l.target].id,
}));
ForceGraph()(document.getElementById('graph'))
  .graphData(data)
  .nodeId('id')
  .nodeLabel(n => `${n.name} (${n.type})` + (n.description ? `: ${n.description}` : ''))
  .nodeColor(n => n.color)
  .linkLabel(l => l.type)
  .linkColor(l => l.color)
  .linkDirectionalArrowLength(4)
  .linkWidth(l => 1 + l.value);
</script>
</body>
</html>
"#;
