//! Graph context retrieval for an analyzed question.

use medkg_core::graph::MedGraph;
use serde::Serialize;
use std::collections::HashSet;

use crate::analyze::QuestionAnalysis;

/// Minimum normalized edit similarity for a fuzzy name match.
const FUZZY_THRESHOLD: f64 = 0.75;

/// Entity as presented to the caller and the answer prompt.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Relation with endpoint ids resolved to display names.
#[derive(Debug, Clone, Serialize)]
pub struct RelationView {
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

/// The graph context retrieved for one question.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub entities: Vec<EntityView>,
    pub relations: Vec<RelationView>,
}

/// Match the analyzed mentions against the graph and collect the incident
/// relations of every match. When the analysis names relation kinds, only
/// those kinds survive; otherwise all incident relations do. No match
/// means an empty context.
pub fn retrieve_context(graph: &MedGraph, analysis: &QuestionAnalysis) -> RetrievedContext {
    let mut seen_entities = HashSet::new();
    let mut entities = Vec::new();
    for mention in &analysis.mentions {
        let mut matches = graph.find_by_name(&mention.name, mention.category.as_deref());
        if matches.is_empty()
            && let Some(near) = fuzzy_match(graph, &mention.name, mention.category.as_deref())
        {
            matches.push(near);
        }
        for entity in matches {
            if seen_entities.insert(entity.id.clone()) {
                entities.push(EntityView {
                    id: entity.id.clone(),
                    name: entity.name.clone(),
                    category: entity.category.clone(),
                    description: entity.description.clone(),
                });
            }
        }
    }

    let mut seen_relations = HashSet::new();
    let mut relations = Vec::new();
    for entity in &entities {
        for relation in graph.relations_for(&entity.id) {
            if !analysis.kinds.is_empty() && !analysis.kinds.contains(&relation.kind) {
                continue;
            }
            let key = (relation.source.clone(), relation.target.clone(), relation.kind.clone());
            if !seen_relations.insert(key) {
                continue;
            }
            let source_name = graph
                .get_entity(&relation.source)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| relation.source.clone());
            let target_name = graph
                .get_entity(&relation.target)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| relation.target.clone());
            relations.push(RelationView {
                source: relation.source.clone(),
                source_name,
                target: relation.target.clone(),
                target_name,
                kind: relation.kind.clone(),
                confidence: relation.confidence,
                description: relation.description.clone(),
            });
        }
    }

    tracing::debug!(
        entities = entities.len(),
        relations = relations.len(),
        "retrieved question context"
    );
    RetrievedContext { entities, relations }
}

/// Best near-miss match for a mention with no substring hit. Catches
/// misspellings in questions without pulling in unrelated nodes.
fn fuzzy_match<'a>(
    graph: &'a MedGraph,
    name: &str,
    category: Option<&str>,
) -> Option<&'a medkg_core::graph::Entity> {
    let query = name.to_lowercase();
    let mut best: Option<(f64, &medkg_core::graph::Entity)> = None;
    for entity in graph.entities.values() {
        if category.is_some_and(|c| entity.category != c) {
            continue;
        }
        let sim = strsim::normalized_levenshtein(&query, &entity.name.to_lowercase());
        if sim >= FUZZY_THRESHOLD && best.is_none_or(|(b, _)| sim > b) {
            best = Some((sim, entity));
        }
    }
    best.map(|(_, entity)| entity)
}
