//! Summary statistics for the graph.

use medkg_core::graph::MedGraph;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many entities the top-degree list carries.
const TOP_ENTITIES: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_entities: usize,
    pub total_relations: usize,
    /// Mean of in-degree plus out-degree over all entities.
    pub average_degree: f64,
    pub categories: BTreeMap<String, usize>,
    pub relation_kinds: BTreeMap<String, usize>,
    pub top_entities: Vec<EntityDegree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityDegree {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub degree: usize,
}

/// Compute summary statistics. An empty graph yields zero counts and an
/// average degree of 0.0.
pub fn graph_stats(graph: &MedGraph) -> GraphStats {
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    let mut degree: BTreeMap<&str, usize> = BTreeMap::new();

    for entity in graph.entities.values() {
        *categories.entry(entity.category.clone()).or_insert(0) += 1;
    }
    for relation in &graph.relations {
        *kinds.entry(relation.kind.clone()).or_insert(0) += 1;
        *degree.entry(relation.source.as_str()).or_insert(0) += 1;
        *degree.entry(relation.target.as_str()).or_insert(0) += 1;
    }

    let average_degree = if graph.entities.is_empty() {
        0.0
    } else {
        2.0 * graph.relations.len() as f64 / graph.entities.len() as f64
    };

    let mut ranked: Vec<EntityDegree> = graph
        .entities
        .values()
        .map(|entity| EntityDegree {
            id: entity.id.clone(),
            name: entity.name.clone(),
            category: entity.category.clone(),
            degree: degree.get(entity.id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.id.cmp(&b.id)));
    ranked.truncate(TOP_ENTITIES);

    GraphStats {
        total_entities: graph.entities.len(),
        total_relations: graph.relations.len(),
        average_degree,
        categories,
        relation_kinds: kinds,
        top_entities: ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medkg_core::graph::{Entity, Relation};

    fn entity(id: &str, name: &str, category: &str) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: String::new(),
            source_doc: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_stats_count_and_rank() {
        let mut graph = MedGraph::new();
        graph.insert_entity(entity("disease_1", "diabetes", "disease"));
        graph.insert_entity(entity("drug_1", "metformin", "drug"));
        graph.insert_entity(entity("drug_2", "insulin", "drug"));
        for source in ["drug_1", "drug_2"] {
            graph.insert_relation(Relation {
                source: source.to_string(),
                target: "disease_1".to_string(),
                kind: "treats".to_string(),
                confidence: 0.9,
                description: String::new(),
            });
        }

        let stats = graph_stats(&graph);
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.total_relations, 2);
        assert_eq!(stats.categories.get("drug"), Some(&2));
        assert_eq!(stats.relation_kinds.get("treats"), Some(&2));
        assert!((stats.average_degree - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.top_entities[0].id, "disease_1");
        assert_eq!(stats.top_entities[0].degree, 2);
    }

    #[test]
    fn test_stats_empty_graph() {
        let stats = graph_stats(&MedGraph::new());
        assert_eq!(stats.total_entities, 0);
        assert_eq!(stats.average_degree, 0.0);
        assert!(stats.top_entities.is_empty());
    }
}
