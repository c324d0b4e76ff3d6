//! API behavior through the full router, with a scripted model.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use medkg_core::graph::{Entity, MedGraph, Relation};
use medkg_extract::llm::{ChatModel, GenerationOptions};
use medkg_query::QaService;
use medkg_server::{router, AppState};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

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
        ("symptom_1", "polyuria", "symptom"),
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
        description: String::new(),
    });
    graph.refresh_metadata();
    Arc::new(graph)
}

fn app(graph: Option<Arc<MedGraph>>, responses: &[&str]) -> axum::Router {
    let model = ScriptedModel::new(responses);
    let qa = Arc::new(QaService::new(model, graph.clone(), 512));
    router(AppState::new(graph, qa))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn index_serves_form_page() {
    let response = app(Some(sample_graph()), &[]).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("<form id=\"ask\""));
}

#[tokio::test]
async fn health_reports_graph_counts() {
    let response = app(Some(sample_graph()), &[])
        .oneshot(get("/api/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["kg_loaded"], true);
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["nodes_count"], 3);
    assert_eq!(body["edges_count"], 1);
}

#[tokio::test]
async fn health_is_ok_without_graph() {
    let response = app(None, &[]).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["kg_loaded"], false);
    assert_eq!(body["nodes_count"], 0);
}

#[tokio::test]
async fn query_answers_with_context() {
    let app = app(
        Some(sample_graph()),
        &[
            r#"{"entities": [{"name": "diabetes", "type": "disease"}]}"#,
            r#"["treats"]"#,
            "Metformin is first-line.",
        ],
    );
    let response = app
        .oneshot(post_json("/api/query", r#"{"question": "how is diabetes treated?"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["question"], "how is diabetes treated?");
    assert_eq!(body["answer"], "Metformin is first-line.");
    assert_eq!(body["related_entities"][0]["name"], "diabetes");
    assert_eq!(body["related_relations"][0]["source_name"], "metformin");
}

#[tokio::test]
async fn query_rejects_missing_question() {
    for body in [r#"{}"#, r#"{"question": "  "}"#] {
        let response = app(Some(sample_graph()), &[])
            .oneshot(post_json("/api/query", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("question"));
    }
}

#[tokio::test]
async fn query_maps_model_failure_to_bad_gateway() {
    // Analysis calls fail open; the answer call then has no response left.
    let response = app(Some(sample_graph()), &[])
        .oneshot(post_json("/api/query", r#"{"question": "anything"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("model"));
}

#[tokio::test]
async fn entities_filters_by_type_and_limit() {
    let response = app(Some(sample_graph()), &[])
        .oneshot(get("/api/entities?type=drug"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["entities"][0]["id"], "drug_1");

    let response = app(Some(sample_graph()), &[])
        .oneshot(get("/api/entities?limit=2"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn entities_without_graph_is_unavailable() {
    let response = app(None, &[]).oneshot(get("/api/entities")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn entity_detail_tags_direction() {
    let response = app(Some(sample_graph()), &[])
        .oneshot(get("/api/entity/disease_1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["entity"]["name"], "diabetes");
    assert_eq!(body["relations"][0]["direction"], "incoming");
    assert_eq!(body["relations"][0]["source_name"], "metformin");
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let response = app(Some(sample_graph()), &[])
        .oneshot(get("/api/entity/disease_99"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
