//! Request handlers.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use medkg_query::{EntityView, QaResponse};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub kg_loaded: bool,
    pub model_loaded: bool,
    pub nodes_count: usize,
    pub edges_count: usize,
}

/// Liveness plus a quick state summary. Always 200 while the process
/// runs, even without a graph.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (nodes, edges) = state
        .graph
        .as_ref()
        .map(|g| (g.entities.len(), g.relations.len()))
        .unwrap_or((0, 0));
    Json(HealthResponse {
        status: "ok",
        kg_loaded: state.graph.is_some(),
        model_loaded: !state.qa.model_name().is_empty(),
        nodes_count: nodes,
        edges_count: edges,
    })
}

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub question: String,
    #[serde(flatten)]
    pub result: QaResponse,
}

pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::MissingQuestion);
    }
    let result = state
        .qa
        .answer(&question)
        .await
        .map_err(|e| ApiError::Model(format!("{e:#}")))?;
    Ok(Json(QueryResponse { question, result }))
}

#[derive(Deserialize)]
pub struct EntitiesParams {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct EntitiesResponse {
    pub entities: Vec<EntityView>,
    pub count: usize,
}

pub async fn entities(
    State(state): State<AppState>,
    Query(params): Query<EntitiesParams>,
) -> Result<Json<EntitiesResponse>, ApiError> {
    let graph = state.graph.as_ref().ok_or(ApiError::GraphNotLoaded)?;
    let limit = params.limit.unwrap_or(100);
    let entities: Vec<EntityView> = graph
        .entities
        .values()
        .filter(|e| params.category.as_ref().is_none_or(|c| &e.category == c))
        .take(limit)
        .map(|e| EntityView {
            id: e.id.clone(),
            name: e.name.clone(),
            category: e.category.clone(),
            description: e.description.clone(),
        })
        .collect();
    let count = entities.len();
    Ok(Json(EntitiesResponse { entities, count }))
}

#[derive(Serialize)]
pub struct EntityRelation {
    pub direction: &'static str,
    pub source: String,
    pub source_name: String,
    pub target: String,
    pub target_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Serialize)]
pub struct EntityDetailResponse {
    pub entity: medkg_core::graph::Entity,
    pub relations: Vec<EntityRelation>,
}

pub async fn entity_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntityDetailResponse>, ApiError> {
    let graph = state.graph.as_ref().ok_or(ApiError::GraphNotLoaded)?;
    let entity = graph
        .get_entity(&id)
        .cloned()
        .ok_or_else(|| ApiError::EntityNotFound(id.clone()))?;

    let name_of = |entity_id: &str| {
        graph
            .get_entity(entity_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| entity_id.to_string())
    };
    let relations = graph
        .relations_for(&id)
        .into_iter()
        .map(|r| EntityRelation {
            direction: if r.source == id { "outgoing" } else { "incoming" },
            source: r.source.clone(),
            source_name: name_of(&r.source),
            target: r.target.clone(),
            target_name: name_of(&r.target),
            kind: r.kind.clone(),
            confidence: r.confidence,
            description: r.description.clone(),
        })
        .collect();

    Ok(Json(EntityDetailResponse { entity, relations }))
}
