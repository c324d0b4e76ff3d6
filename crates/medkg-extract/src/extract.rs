//! Single-call extraction steps: entities from a text chunk, relations
//! from an entity pair.

use anyhow::Result;
use serde::Deserialize;

use crate::llm::ChatModel;
use crate::prompts;

fn default_confidence() -> f64 {
    1.0
}

/// One entity as reported by the model, before deduplication.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
}

#[derive(Deserialize)]
struct EntityExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

/// One relation as reported by the model for a specific entity pair.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// Extract entities from one text chunk. Records with an empty name or a
/// category outside the vocabulary are dropped. A malformed response yields
/// an empty list rather than an error so one bad chunk cannot sink a run.
pub async fn extract_entities(model: &dyn ChatModel, chunk: &str) -> Result<Vec<RawEntity>> {
    let prompt = prompts::entity_extraction(chunk);
    let parsed: EntityExtraction = match crate::llm::generate_json(model, &prompt).await {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("entity extraction failed for chunk, continuing: {:#}", e);
            return Ok(Vec::new());
        }
    };

    let mut entities = Vec::new();
    for raw in parsed.entities {
        let name = raw.name.trim().to_string();
        let category = raw.category.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        if !prompts::ENTITY_CATEGORIES.contains(&category.as_str()) {
            tracing::debug!(name, category, "dropping entity with unknown category");
            continue;
        }
        entities.push(RawEntity { name, category });
    }
    Ok(entities)
}

/// Extract relations for one ordered entity pair. The candidate kind list
/// constrains what the model may answer; anything outside it or below the
/// confidence floor is dropped. Malformed responses yield an empty list.
pub async fn extract_relations(
    model: &dyn ChatModel,
    source: &medkg_core::graph::Entity,
    target: &medkg_core::graph::Entity,
    candidate_kinds: &[&str],
    min_confidence: f64,
) -> Result<Vec<RawRelation>> {
    let prompt = prompts::relation_extraction(source, target, candidate_kinds);
    let parsed: Vec<RawRelation> = match crate::llm::generate_json(model, &prompt).await {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                source = %source.name,
                target = %target.name,
                "relation extraction failed for pair, continuing: {:#}", e
            );
            return Ok(Vec::new());
        }
    };

    let mut relations = Vec::new();
    for raw in parsed {
        let kind = raw.kind.trim().to_lowercase();
        if !candidate_kinds.contains(&kind.as_str()) {
            tracing::debug!(kind, "dropping relation with unexpected kind");
            continue;
        }
        if raw.confidence < min_confidence {
            tracing::debug!(kind, confidence = raw.confidence, "dropping low-confidence relation");
            continue;
        }
        relations.push(RawRelation { kind, description: raw.description, confidence: raw.confidence });
    }
    Ok(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationOptions;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedModel {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            }
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

    fn entity(id: &str, name: &str, category: &str) -> medkg_core::graph::Entity {
        medkg_core::graph::Entity {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: String::new(),
            source_doc: String::new(),
            attributes: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_extract_entities_filters_unknown_categories() {
        let model = ScriptedModel::new(&[r#"{"entities": [
            {"name": "diabetes", "type": "disease"},
            {"name": "", "type": "disease"},
            {"name": "quantum", "type": "physics"}
        ]}"#]);
        let entities = extract_entities(&model, "chunk").await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "diabetes");
        assert_eq!(entities[0].category, "disease");
    }

    #[tokio::test]
    async fn test_extract_entities_fails_open_on_garbage() {
        let model = ScriptedModel::new(&["not json at all"]);
        let entities = extract_entities(&model, "chunk").await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn test_extract_relations_enforces_confidence_floor() {
        let model = ScriptedModel::new(&[r#"[
            {"type": "treats", "description": "first line", "confidence": 0.9},
            {"type": "treats", "description": "weak", "confidence": 0.3},
            {"type": "causes", "description": "off vocabulary", "confidence": 0.9}
        ]"#]);
        let source = entity("drug_1", "metformin", "drug");
        let target = entity("disease_1", "diabetes", "disease");
        let relations = extract_relations(&model, &source, &target, &["treats", "prevents"], 0.6)
            .await
            .unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, "treats");
        assert!((relations[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_extract_relations_missing_confidence_defaults_to_one() {
        let model = ScriptedModel::new(&[r#"[{"type": "treats", "description": "d"}]"#]);
        let source = entity("drug_1", "metformin", "drug");
        let target = entity("disease_1", "diabetes", "disease");
        let relations = extract_relations(&model, &source, &target, &["treats"], 0.6)
            .await
            .unwrap();
        assert_eq!(relations.len(), 1);
        assert!((relations[0].confidence - 1.0).abs() < f64::EPSILON);
    }
}
