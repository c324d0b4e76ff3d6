//! DOT and D3 node-link exports.

use medkg_core::graph::MedGraph;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// Export format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Dot,
    D3,
    Html,
    Stats,
}

/// Fill color per entity category. Unknown categories render gray.
pub fn category_color(category: &str) -> &'static str {
    match category {
        "disease" => "#ff7f7f",
        "symptom" => "#ffbf7f",
        "drug" => "#7fbfff",
        "treatment" => "#7fff7f",
        "test" => "#bf7fff",
        "anatomy" => "#ffff7f",
        "cause" => "#ff7fbf",
        "complication" => "#bf7f7f",
        "hospital" => "#7fffff",
        "department" => "#bfbfbf",
        _ => "#d0d0d0",
    }
}

/// Edge color per relation kind. Unknown kinds render gray.
pub fn kind_color(kind: &str) -> &'static str {
    match kind {
        "treats" => "#2e7d32",
        "prevents" => "#558b2f",
        "causes" => "#c62828",
        "has_symptom" => "#ef6c00",
        "diagnoses" | "examines" => "#6a1b9a",
        "complicates" => "#ad1457",
        "side_effect" => "#d84315",
        "used_for" => "#00695c",
        "located_in" | "belongs_to" => "#1565c0",
        _ => "#757575",
    }
}

fn escape_dot(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Entity ids included in a capped export, in deterministic (BTreeMap)
/// order.
fn capped_ids(graph: &MedGraph, max_nodes: usize) -> HashSet<&str> {
    graph.entities.keys().take(max_nodes).map(String::as_str).collect()
}

/// Export the graph as a DOT (Graphviz) string. At most `max_nodes`
/// entities are included; edges with an excluded endpoint are dropped.
pub fn export_dot(graph: &MedGraph, max_nodes: usize) -> String {
    let included = capped_ids(graph, max_nodes);

    let mut out = String::new();
    writeln!(out, "digraph MedicalKG {{").unwrap();
    writeln!(out, "  rankdir=LR;").unwrap();
    writeln!(out, "  node [shape=box, style=filled, fontsize=10];").unwrap();
    writeln!(out).unwrap();

    for (id, entity) in &graph.entities {
        if !included.contains(id.as_str()) {
            continue;
        }
        writeln!(
            out,
            "  \"{}\" [fillcolor=\"{}\", label=\"{}\"];",
            escape_dot(id),
            category_color(&entity.category),
            escape_dot(&entity.name)
        )
        .unwrap();
    }

    writeln!(out).unwrap();

    for relation in &graph.relations {
        if !included.contains(relation.source.as_str())
            || !included.contains(relation.target.as_str())
        {
            continue;
        }
        writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\", color=\"{}\"];",
            escape_dot(&relation.source),
            escape_dot(&relation.target),
            escape_dot(&relation.kind),
            kind_color(&relation.kind)
        )
        .unwrap();
    }

    writeln!(out, "}}").unwrap();
    out
}

/// The node-link document D3's force layout consumes.
#[derive(Debug, Clone, Serialize)]
pub struct D3Document {
    pub nodes: Vec<D3Node>,
    pub links: Vec<D3Link>,
}

#[derive(Debug, Clone, Serialize)]
pub struct D3Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub description: String,
    /// Category group index, for D3 color scales.
    pub group: usize,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct D3Link {
    /// Index into `nodes`.
    pub source: usize,
    /// Index into `nodes`.
    pub target: usize,
    #[serde(rename = "type")]
    pub kind: String,
    /// Link strength, scaled from relation confidence.
    pub value: f64,
    pub description: String,
    pub color: String,
}

/// Export the graph as a D3 node-link document. Links reference node
/// indices as D3 expects. The same `max_nodes` cap as the DOT export
/// applies.
pub fn export_d3_json(graph: &MedGraph, max_nodes: usize) -> D3Document {
    let mut group_of: HashMap<&str, usize> = HashMap::new();
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    let mut nodes = Vec::new();

    for (id, entity) in graph.entities.iter().take(max_nodes) {
        let next_group = group_of.len();
        let group = *group_of.entry(entity.category.as_str()).or_insert(next_group);
        index_of.insert(id.as_str(), nodes.len());
        nodes.push(D3Node {
            id: id.clone(),
            name: entity.name.clone(),
            category: entity.category.clone(),
            description: entity.description.clone(),
            group,
            color: category_color(&entity.category).to_string(),
        });
    }

    let mut links = Vec::new();
    for relation in &graph.relations {
        if let Some(&source) = index_of.get(relation.source.as_str())
            && let Some(&target) = index_of.get(relation.target.as_str())
        {
            links.push(D3Link {
                source,
                target,
                kind: relation.kind.clone(),
                value: relation.confidence,
                description: relation.description.clone(),
                color: kind_color(&relation.kind).to_string(),
            });
        }
    }

    D3Document { nodes, links }
}
