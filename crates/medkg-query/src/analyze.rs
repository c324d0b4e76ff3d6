//! Model-driven question analysis: which entities and relation kinds is
//! the user asking about?

use medkg_extract::llm::{self, ChatModel};
use medkg_extract::prompts::{ENTITY_CATEGORIES, RELATION_KINDS};
use serde::Deserialize;

/// One entity mention found in the question. The category is optional;
/// the model may not be able to classify a mention.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionMention {
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: Option<String>,
}

#[derive(Deserialize)]
struct MentionExtraction {
    #[serde(default)]
    entities: Vec<QuestionMention>,
}

/// What the question is about, as judged by the model.
#[derive(Debug, Clone, Default)]
pub struct QuestionAnalysis {
    pub mentions: Vec<QuestionMention>,
    /// Relation kinds relevant to the question. Empty means "all kinds".
    pub kinds: Vec<String>,
}

fn mention_prompt(question: &str) -> String {
    format!(
        "Identify the medical entities mentioned in the question below.\n\
         Valid entity types: {types}.\n\
         Respond with JSON: {{\"entities\": [{{\"name\": \"...\", \"type\": \"...\"}}]}}.\n\
         If an entity's type is unclear, omit the \"type\" field.\n\n\
         Question: {question}",
        types = ENTITY_CATEGORIES.join(", "),
    )
}

fn kind_prompt(question: &str) -> String {
    format!(
        "Which of these relation types is the question below asking about?\n\
         Relation types: {kinds}.\n\
         Respond with a JSON array of relation type strings, for example\n\
         [\"treats\", \"causes\"]. Respond with [] if none clearly apply.\n\n\
         Question: {question}",
        kinds = RELATION_KINDS.join(", "),
    )
}

/// Analyze a question with two model calls: entity mentions, then relation
/// kinds. Either call failing or returning unparseable output degrades to
/// an empty list so the answer can still be generated without context.
pub async fn analyze_question(model: &dyn ChatModel, question: &str) -> QuestionAnalysis {
    let mentions = match llm::generate_json::<MentionExtraction>(model, &mention_prompt(question)).await
    {
        Ok(parsed) => parsed
            .entities
            .into_iter()
            .filter(|m| !m.name.trim().is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("question entity analysis failed, continuing without: {:#}", e);
            Vec::new()
        }
    };

    let kinds = match llm::generate_json::<Vec<String>>(model, &kind_prompt(question)).await {
        Ok(kinds) => kinds
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| RELATION_KINDS.contains(&k.as_str()))
            .collect(),
        Err(e) => {
            tracing::warn!("question kind analysis failed, continuing without: {:#}", e);
            Vec::new()
        }
    };

    QuestionAnalysis { mentions, kinds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use medkg_extract::llm::GenerationOptions;
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

    #[tokio::test]
    async fn test_analysis_parses_mentions_and_kinds() {
        let model = ScriptedModel::new(&[
            r#"{"entities": [{"name": "diabetes", "type": "disease"}, {"name": "metformin"}]}"#,
            r#"["treats", "TELEPORTS"]"#,
        ]);
        let analysis = analyze_question(&model, "does metformin treat diabetes?").await;
        assert_eq!(analysis.mentions.len(), 2);
        assert_eq!(analysis.mentions[0].category.as_deref(), Some("disease"));
        assert!(analysis.mentions[1].category.is_none());
        // Kinds outside the vocabulary are dropped
        assert_eq!(analysis.kinds, vec!["treats"]);
    }

    #[tokio::test]
    async fn test_analysis_fails_open() {
        let model = ScriptedModel::new(&["not json", "also not json"]);
        let analysis = analyze_question(&model, "anything").await;
        assert!(analysis.mentions.is_empty());
        assert!(analysis.kinds.is_empty());
    }
}
