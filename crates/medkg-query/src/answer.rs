//! Answer generation: question plus retrieved graph context, one model
//! call.

use anyhow::{Context, Result};
use medkg_core::graph::MedGraph;
use medkg_extract::llm::{ChatModel, GenerationOptions};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

use crate::analyze;
use crate::retrieve::{self, RetrievedContext};

/// At most this many entities and relations go into the answer prompt.
const CONTEXT_LIMIT: usize = 5;

/// The QA result handed back to callers (and serialized by the API).
#[derive(Debug, Clone, Serialize)]
pub struct QaResponse {
    pub answer: String,
    pub related_entities: Vec<retrieve::EntityView>,
    pub related_relations: Vec<retrieve::RelationView>,
}

/// Question answering over an optional graph. Without a graph every
/// question is answered from the model's own knowledge with an empty
/// context.
pub struct QaService {
    model: Arc<dyn ChatModel>,
    graph: Option<Arc<MedGraph>>,
    answer_max_tokens: u32,
}

impl QaService {
    pub fn new(model: Arc<dyn ChatModel>, graph: Option<Arc<MedGraph>>, answer_max_tokens: u32) -> Self {
        Self { model, graph, answer_max_tokens }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn graph_loaded(&self) -> bool {
        self.graph.is_some()
    }

    /// Answer one question: analyze, retrieve, generate.
    pub async fn answer(&self, question: &str) -> Result<QaResponse> {
        let context = match &self.graph {
            Some(graph) => {
                let analysis = analyze::analyze_question(self.model.as_ref(), question).await;
                retrieve::retrieve_context(graph, &analysis)
            }
            None => RetrievedContext::default(),
        };

        let prompt = answer_prompt(question, &context);
        let answer = self
            .model
            .generate(&prompt, &GenerationOptions::answer(self.answer_max_tokens))
            .await
            .context("answer generation failed")?;

        Ok(QaResponse {
            answer: answer.trim().to_string(),
            related_entities: context.entities,
            related_relations: context.relations,
        })
    }
}

fn answer_prompt(question: &str, context: &RetrievedContext) -> String {
    let mut prompt = String::from(
        "You are a medical information assistant. Answer the question using \
         the knowledge graph context below where it applies. State clearly \
         which parts of your answer come from the knowledge graph and which \
         come from your general medical knowledge. Remind the user to \
         consult a medical professional for diagnosis or treatment.\n",
    );

    if context.entities.is_empty() {
        prompt.push_str("\nKnowledge graph context: none found for this question.\n");
    } else {
        prompt.push_str("\nKnowledge graph entities:\n");
        for entity in context.entities.iter().take(CONTEXT_LIMIT) {
            let _ = write!(prompt, "- {} ({})", entity.name, entity.category);
            if !entity.description.is_empty() {
                let _ = write!(prompt, ": {}", entity.description);
            }
            prompt.push('\n');
        }
        if !context.relations.is_empty() {
            prompt.push_str("\nKnowledge graph relations:\n");
            for relation in context.relations.iter().take(CONTEXT_LIMIT) {
                let _ = write!(
                    prompt,
                    "- {} --[{}]--> {}",
                    relation.source_name, relation.kind, relation.target_name
                );
                if !relation.description.is_empty() {
                    let _ = write!(prompt, ": {}", relation.description);
                }
                prompt.push('\n');
            }
        }
    }

    let _ = write!(prompt, "\nQuestion: {}", question);
    prompt
}
