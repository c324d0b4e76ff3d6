//! The end-to-end graph build pipeline: corpus in, knowledge graph out.
//!
//! Entity and relation extraction are checkpointed per document so an
//! interrupted run resumes where it stopped instead of re-spending model
//! calls.

use anyhow::{Context, Result};
use medkg_core::config::MedkgConfig;
use medkg_core::graph::{Entity, MedGraph, Relation};
use medkg_core::storage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use crate::corpus;
use crate::extract;
use crate::llm::ChatModel;
use crate::prompts;

/// One entity occurrence before deduplication, tagged with its source
/// document. This is what the entity checkpoint stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub source_doc: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EntityCheckpoint {
    processed: BTreeSet<String>,
    entities: Vec<ExtractedEntity>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RelationCheckpoint {
    processed: BTreeSet<String>,
    relations: Vec<Relation>,
}

/// Builds a [`MedGraph`] from a raw corpus directory using a chat model
/// for extraction.
pub struct GraphBuilder {
    model: Arc<dyn ChatModel>,
    data_dir: PathBuf,
    output_dir: PathBuf,
    config: MedkgConfig,
}

impl GraphBuilder {
    pub fn new(
        model: Arc<dyn ChatModel>,
        data_dir: PathBuf,
        output_dir: PathBuf,
        config: MedkgConfig,
    ) -> Self {
        Self { model, data_dir, output_dir, config }
    }

    /// Run the whole pipeline: entities, relations, graph assembly, save.
    pub async fn build(&self, force: bool) -> Result<MedGraph> {
        let entities = self.extract_entities(force).await?;
        let relations = self.extract_relations(&entities, force).await?;
        let graph = self.build_graph(entities, relations);
        self.save(&graph)?;
        Ok(graph)
    }

    /// Phase 1: extract entity mentions from every document, then
    /// deduplicate them into the final entity list with assigned ids.
    pub async fn extract_entities(&self, force: bool) -> Result<Vec<Entity>> {
        let documents = corpus::read_documents(&self.data_dir)?;
        let checkpoint_path = storage::entities_file(&self.output_dir);

        let mut checkpoint = if force {
            EntityCheckpoint::default()
        } else {
            storage::load_checkpoint(&checkpoint_path)?.unwrap_or_default()
        };
        if !checkpoint.processed.is_empty() {
            tracing::info!(
                done = checkpoint.processed.len(),
                total = documents.len(),
                "resuming entity extraction from checkpoint"
            );
        }

        let mut since_checkpoint = 0usize;
        for doc in &documents {
            if checkpoint.processed.contains(&doc.id) {
                continue;
            }
            let text = corpus::preprocess_text(&doc.text);
            for chunk in corpus::split_into_chunks(&text, self.config.extraction.chunk_size) {
                for raw in extract::extract_entities(self.model.as_ref(), &chunk).await? {
                    checkpoint.entities.push(ExtractedEntity {
                        name: raw.name,
                        category: raw.category,
                        description: String::new(),
                        source_doc: doc.id.clone(),
                    });
                }
            }
            checkpoint.processed.insert(doc.id.clone());
            since_checkpoint += 1;
            if since_checkpoint >= self.config.extraction.checkpoint_interval {
                storage::save_checkpoint(&checkpoint_path, &checkpoint)?;
                since_checkpoint = 0;
            }
        }
        storage::save_checkpoint(&checkpoint_path, &checkpoint)?;

        let entities = dedup_entities(checkpoint.entities);
        tracing::info!(count = entities.len(), "entity extraction complete");
        Ok(entities)
    }

    /// Phase 2: for each document, pair up entities of different
    /// categories and ask the model which relations hold between them.
    pub async fn extract_relations(
        &self,
        entities: &[Entity],
        force: bool,
    ) -> Result<Vec<Relation>> {
        let checkpoint_path = storage::relations_file(&self.output_dir);
        let mut checkpoint = if force {
            RelationCheckpoint::default()
        } else {
            storage::load_checkpoint(&checkpoint_path)?.unwrap_or_default()
        };
        if !checkpoint.processed.is_empty() {
            tracing::info!(
                done = checkpoint.processed.len(),
                "resuming relation extraction from checkpoint"
            );
        }

        // Group by source document; relations only form within one document.
        let mut by_doc: BTreeMap<&str, Vec<&Entity>> = BTreeMap::new();
        for entity in entities {
            if !entity.source_doc.is_empty() {
                by_doc.entry(entity.source_doc.as_str()).or_default().push(entity);
            }
        }

        let min_confidence = self.config.extraction.min_confidence;
        let mut since_checkpoint = 0usize;
        for (doc, members) in &by_doc {
            if checkpoint.processed.contains(*doc) {
                continue;
            }
            for (source, target) in candidate_pairs(members, self.config.extraction.max_pairs) {
                let (kinds, swapped) = prompts::candidate_kinds(&source.category, &target.category);
                let (source, target) = if swapped { (target, source) } else { (source, target) };
                let found = extract::extract_relations(
                    self.model.as_ref(),
                    source,
                    target,
                    &kinds,
                    min_confidence,
                )
                .await?;
                for raw in found {
                    checkpoint.relations.push(Relation {
                        source: source.id.clone(),
                        target: target.id.clone(),
                        kind: raw.kind,
                        confidence: raw.confidence,
                        description: raw.description,
                    });
                }
            }
            checkpoint.processed.insert(doc.to_string());
            since_checkpoint += 1;
            if since_checkpoint >= self.config.extraction.checkpoint_interval {
                storage::save_checkpoint(&checkpoint_path, &checkpoint)?;
                since_checkpoint = 0;
            }
        }
        storage::save_checkpoint(&checkpoint_path, &checkpoint)?;

        let relations = dedup_relations(checkpoint.relations);
        tracing::info!(count = relations.len(), "relation extraction complete");
        Ok(relations)
    }

    /// Phase 3: assemble the graph. Relations whose endpoints were dropped
    /// during deduplication vanish here.
    pub fn build_graph(&self, entities: Vec<Entity>, relations: Vec<Relation>) -> MedGraph {
        let mut graph = MedGraph::new();
        for entity in entities {
            graph.insert_entity(entity);
        }
        for relation in relations {
            graph.insert_relation(relation);
        }
        graph.refresh_metadata();
        graph
    }

    /// Phase 4: persist the graph under the output directory.
    pub fn save(&self, graph: &MedGraph) -> Result<()> {
        storage::save(&self.output_dir, graph)
            .with_context(|| format!("failed to save graph to {}", self.output_dir.display()))?;
        tracing::info!(
            path = %storage::graph_file(&self.output_dir).display(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "graph saved"
        );
        Ok(())
    }
}

/// Merge entity mentions that share a category and (case-insensitive) name
/// into one entity per key, assigning ids of the form `category_n` in
/// first-seen order. Descriptions are merged; the first source document
/// wins.
pub fn dedup_entities(raw: Vec<ExtractedEntity>) -> Vec<Entity> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut per_category: HashMap<String, usize> = HashMap::new();
    let mut entities: Vec<Entity> = Vec::new();

    for mention in raw {
        let key = (mention.category.clone(), mention.name.to_lowercase());
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut entities[i];
                if !mention.description.is_empty()
                    && !existing.description.contains(&mention.description)
                {
                    if !existing.description.is_empty() {
                        existing.description.push_str("; ");
                    }
                    existing.description.push_str(&mention.description);
                }
            }
            None => {
                let n = per_category.entry(mention.category.clone()).or_insert(0);
                *n += 1;
                let id = format!("{}_{}", mention.category, n);
                index.insert(key, entities.len());
                entities.push(Entity {
                    id,
                    name: mention.name,
                    category: mention.category,
                    description: mention.description,
                    source_doc: mention.source_doc,
                    attributes: BTreeMap::new(),
                });
            }
        }
    }
    entities
}

/// Collapse duplicate (source, target, kind) triples, keeping the highest
/// confidence and its description.
pub fn dedup_relations(raw: Vec<Relation>) -> Vec<Relation> {
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();
    let mut relations: Vec<Relation> = Vec::new();
    for relation in raw {
        let key = (relation.source.clone(), relation.target.clone(), relation.kind.clone());
        match index.get(&key) {
            Some(&i) => {
                if relation.confidence > relations[i].confidence {
                    relations[i] = relation;
                }
            }
            None => {
                index.insert(key, relations.len());
                relations.push(relation);
            }
        }
    }
    relations
}

/// Ordered entity pairs within one document worth asking the model about:
/// different categories only, capped at `max_pairs` per category pair.
fn candidate_pairs<'a>(members: &[&'a Entity], max_pairs: usize) -> Vec<(&'a Entity, &'a Entity)> {
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    let mut pairs = Vec::new();
    for (i, source) in members.iter().enumerate() {
        for target in members.iter().skip(i + 1) {
            if source.category == target.category {
                continue;
            }
            let mut key = [source.category.clone(), target.category.clone()];
            key.sort();
            let [a, b] = key;
            let count = counts.entry((a, b)).or_insert(0);
            if *count >= max_pairs {
                continue;
            }
            *count += 1;
            pairs.push((*source, *target));
        }
    }
    pairs
}
