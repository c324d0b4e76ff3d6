//! LLM-backed entity/relation extraction for the medical knowledge graph.
//!
//! The remote model does all the actual information extraction; this crate
//! builds the prompts, parses the (frequently messy) JSON the model returns,
//! and assembles the deduplicated graph.

pub mod builder;
pub mod corpus;
pub mod extract;
pub mod llm;
pub mod prompts;

pub use builder::GraphBuilder;
pub use llm::{ChatModel, GenerationOptions, LlmClient, ModelProvider};
