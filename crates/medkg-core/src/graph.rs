//! Graph data model for the medical knowledge graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// The complete medical knowledge graph: entity nodes plus typed directed
/// relation edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedGraph {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: GraphMetadata,
    /// Entity nodes keyed by id.
    pub entities: BTreeMap<String, Entity>,
    /// All relation edges. Identity is the (source, target, kind) triple.
    pub relations: Vec<Relation>,
    /// Lookup index: lowercased entity name → entity ids.
    /// Rebuilt on load via `rebuild_name_index()`.
    #[serde(skip)]
    pub name_index: BTreeMap<String, Vec<String>>,
    /// Performance index: entity id → relation indices in `relations`.
    /// Rebuilt on load and after bulk mutations via `rebuild_edge_index()`.
    #[serde(skip)]
    pub edge_index: HashMap<String, Vec<usize>>,
}

/// Aggregate statistics for the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub total_entities: usize,
    pub total_relations: usize,
    /// Entity count per category.
    #[serde(default)]
    pub categories: BTreeMap<String, usize>,
    /// Relation count per kind.
    #[serde(default)]
    pub relation_kinds: BTreeMap<String, usize>,
}

/// A medical concept node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id, `"{category}_{n}"` with `n` assigned during dedup.
    pub id: String,
    pub name: String,
    /// Category from the extraction vocabulary (disease, symptom, drug, ...).
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Relative path of the document this entity was first extracted from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_doc: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A typed directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    /// Relation kind from the extraction vocabulary (treats, causes, ...).
    pub kind: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A bounded subgraph extracted around one or more seed entities.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl MedGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: crate::schema::CURRENT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            metadata: GraphMetadata::default(),
            entities: BTreeMap::new(),
            relations: Vec::new(),
            name_index: BTreeMap::new(),
            edge_index: HashMap::new(),
        }
    }

    /// Insert an entity node, replacing any previous entry with the same id.
    pub fn insert_entity(&mut self, entity: Entity) {
        let id = entity.id.clone();
        let name_key = entity.name.to_lowercase();
        self.entities.insert(id.clone(), entity);
        let ids = self.name_index.entry(name_key).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Insert a relation edge. A relation whose endpoints are not both
    /// present is dropped silently. A duplicate (source, target, kind)
    /// keeps whichever copy has the higher confidence.
    pub fn insert_relation(&mut self, relation: Relation) {
        if !self.entities.contains_key(&relation.source)
            || !self.entities.contains_key(&relation.target)
        {
            tracing::debug!(
                source = %relation.source,
                target = %relation.target,
                "dropping relation with missing endpoint"
            );
            return;
        }
        if let Some(existing) = self.relations.iter_mut().find(|r| {
            r.source == relation.source && r.target == relation.target && r.kind == relation.kind
        }) {
            if relation.confidence > existing.confidence {
                *existing = relation;
            }
            return;
        }
        let idx = self.relations.len();
        self.edge_index
            .entry(relation.source.clone())
            .or_default()
            .push(idx);
        self.edge_index
            .entry(relation.target.clone())
            .or_default()
            .push(idx);
        self.relations.push(relation);
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Find entities whose name contains `query` (case-insensitive), with an
    /// optional exact category filter. Empty queries match nothing.
    pub fn find_by_name(&self, query: &str, category: Option<&str>) -> Vec<&Entity> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.name_index
            .iter()
            .filter(|(name, _)| name.contains(&query))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.entities.get(id))
            .filter(|e| category.is_none_or(|c| e.category == c))
            .collect()
    }

    /// All relations incident to an entity, in either direction.
    pub fn relations_for(&self, entity_id: &str) -> Vec<&Relation> {
        if let Some(indices) = self.edge_index.get(entity_id) {
            indices.iter().filter_map(|&i| self.relations.get(i)).collect()
        } else {
            // Fallback to linear scan if index not built
            self.relations
                .iter()
                .filter(|r| r.source == entity_id || r.target == entity_id)
                .collect()
        }
    }

    /// Extract the subgraph within `hops` edges of the seed entities,
    /// BFS order, capped at `max_nodes` entities. Unknown seeds are ignored.
    pub fn neighborhood(&self, seeds: &[String], hops: usize, max_nodes: usize) -> Subgraph {
        let mut included: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        for seed in seeds {
            if self.entities.contains_key(seed) && included.insert(seed.clone()) {
                order.push(seed.clone());
                queue.push_back((seed.clone(), 0));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= hops || order.len() >= max_nodes {
                continue;
            }
            for relation in self.relations_for(&current) {
                if order.len() >= max_nodes {
                    break;
                }
                let neighbor = if relation.source == current {
                    &relation.target
                } else {
                    &relation.source
                };
                if included.insert(neighbor.clone()) {
                    order.push(neighbor.clone());
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        let entities: Vec<Entity> = order
            .iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect();
        let relations: Vec<Relation> = self
            .relations
            .iter()
            .filter(|r| included.contains(&r.source) && included.contains(&r.target))
            .cloned()
            .collect();

        Subgraph { entities, relations }
    }

    /// Recompute metadata from current state and bump the update timestamp.
    pub fn refresh_metadata(&mut self) {
        self.metadata.total_entities = self.entities.len();
        self.metadata.total_relations = self.relations.len();
        self.metadata.categories.clear();
        for entity in self.entities.values() {
            *self
                .metadata
                .categories
                .entry(entity.category.clone())
                .or_insert(0) += 1;
        }
        self.metadata.relation_kinds.clear();
        for relation in &self.relations {
            *self
                .metadata
                .relation_kinds
                .entry(relation.kind.clone())
                .or_insert(0) += 1;
        }
        self.updated_at = Utc::now();
    }

    /// Rebuild the name index from the entity map. Call after deserialization.
    pub fn rebuild_name_index(&mut self) {
        self.name_index.clear();
        for (id, entity) in &self.entities {
            self.name_index
                .entry(entity.name.to_lowercase())
                .or_default()
                .push(id.clone());
        }
    }

    /// Rebuild the edge index from the relation list. Call after
    /// deserialization or bulk relation mutations.
    pub fn rebuild_edge_index(&mut self) {
        self.edge_index.clear();
        for (i, relation) in self.relations.iter().enumerate() {
            self.edge_index
                .entry(relation.source.clone())
                .or_default()
                .push(i);
            self.edge_index
                .entry(relation.target.clone())
                .or_default()
                .push(i);
        }
    }

    /// Rebuild all derived indexes. Call after deserialization.
    pub fn rebuild_indexes(&mut self) {
        self.rebuild_name_index();
        self.rebuild_edge_index();
    }
}

impl Default for MedGraph {
    fn default() -> Self {
        Self::new()
    }
}
