//! Core types and storage for the medical knowledge graph.
//!
//! Provides the graph data model ([`graph::MedGraph`]), entity and relation
//! types, JSON persistence, and configuration loading.

pub mod config;
pub mod graph;
pub mod schema;
pub mod storage;
