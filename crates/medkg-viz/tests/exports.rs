//! File-level export behavior, including the empty-graph case.

use medkg_core::graph::{Entity, MedGraph, Relation};
use medkg_viz::{write_outputs, ExportFormat};
use std::collections::BTreeMap;

const ALL_FORMATS: [ExportFormat; 4] = [
    ExportFormat::Dot,
    ExportFormat::D3,
    ExportFormat::Html,
    ExportFormat::Stats,
];

fn sample_graph() -> MedGraph {
    let mut graph = MedGraph::new();
    for (id, name, category) in
        [("disease_1", "diabetes", "disease"), ("drug_1", "metformin", "drug")]
    {
        graph.insert_entity(Entity {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: String::new(),
            source_doc: String::new(),
            attributes: BTreeMap::new(),
        });
    }
    graph.insert_relation(Relation {
        source: "drug_1".to_string(),
        target: "disease_1".to_string(),
        kind: "treats".to_string(),
        confidence: 0.9,
        description: String::new(),
    });
    graph.refresh_metadata();
    graph
}

#[test]
fn writes_all_formats_into_created_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("viz").join("nested");
    let written = write_outputs(&sample_graph(), &out, &ALL_FORMATS, 100).unwrap();
    assert_eq!(written.len(), 4);
    for path in &written {
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn empty_graph_produces_valid_files() {
    let tmp = tempfile::tempdir().unwrap();
    let written = write_outputs(&MedGraph::new(), tmp.path(), &ALL_FORMATS, 100).unwrap();

    for path in &written {
        let content = std::fs::read_to_string(path).unwrap();
        assert!(!content.is_empty());
        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str::<serde_json::Value>(&content).unwrap();
        }
    }
}

#[test]
fn d3_file_round_trips_through_serde() {
    let tmp = tempfile::tempdir().unwrap();
    let written =
        write_outputs(&sample_graph(), tmp.path(), &[ExportFormat::D3], 100).unwrap();
    let content = std::fs::read_to_string(&written[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(value["links"][0]["type"], "treats");
}
