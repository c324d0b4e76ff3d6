//! End-to-end QA flow against a scripted model.

use anyhow::Result;
use async_trait::async_trait;
use medkg_core::graph::{Entity, MedGraph, Relation};
use medkg_extract::llm::{ChatModel, GenerationOptions};
use medkg_query::QaService;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, _prompt: &str, _opts: &GenerationOptions) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted response left"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn sample_graph() -> Arc<MedGraph> {
    let mut graph = MedGraph::new();
    for (id, name, category) in [
        ("disease_1", "diabetes", "disease"),
        ("drug_1", "metformin", "drug"),
    ] {
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
        description: "first-line therapy".to_string(),
    });
    graph.refresh_metadata();
    Arc::new(graph)
}

#[tokio::test]
async fn answer_carries_matched_context() {
    // Call order: mention analysis, kind analysis, answer generation.
    let model = ScriptedModel::new(&[
        r#"{"entities": [{"name": "diabetes", "type": "disease"}]}"#,
        r#"["treats"]"#,
        "Metformin is the usual first-line treatment.",
    ]);
    let qa = QaService::new(model, Some(sample_graph()), 512);

    let response = qa.answer("how is diabetes treated?").await.unwrap();
    assert_eq!(response.answer, "Metformin is the usual first-line treatment.");
    assert_eq!(response.related_entities.len(), 1);
    assert_eq!(response.related_entities[0].name, "diabetes");
    assert_eq!(response.related_relations.len(), 1);
    assert_eq!(response.related_relations[0].source_name, "metformin");
}

#[tokio::test]
async fn unmatched_question_returns_empty_context() {
    let model = ScriptedModel::new(&[
        r#"{"entities": [{"name": "hypertension", "type": "disease"}]}"#,
        r#"[]"#,
        "I have no graph data on that, but generally...",
    ]);
    let qa = QaService::new(model, Some(sample_graph()), 512);

    let response = qa.answer("what about hypertension?").await.unwrap();
    assert!(response.related_entities.is_empty());
    assert!(response.related_relations.is_empty());
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn missing_graph_skips_analysis_calls() {
    // Only the answer call should be consumed.
    let model = ScriptedModel::new(&["General medical knowledge answer."]);
    let qa = QaService::new(model, None, 512);

    let response = qa.answer("does metformin treat diabetes?").await.unwrap();
    assert_eq!(response.answer, "General medical knowledge answer.");
    assert!(response.related_entities.is_empty());
}

#[tokio::test]
async fn model_failure_surfaces_as_error() {
    // Analysis calls fail open; the exhausted script then fails the
    // answer call itself.
    let model = ScriptedModel::new(&[]);
    let qa = QaService::new(model, Some(sample_graph()), 512);
    assert!(qa.answer("anything").await.is_err());
}
