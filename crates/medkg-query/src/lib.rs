//! Question answering over the medical knowledge graph.
//!
//! A question is analyzed by the model into entity mentions and relation
//! kinds, matched against the graph to retrieve a small context, and the
//! context plus question is sent back to the model for the final answer.

pub mod analyze;
pub mod answer;
pub mod retrieve;

pub use analyze::{QuestionAnalysis, QuestionMention};
pub use answer::{QaResponse, QaService};
pub use retrieve::{EntityView, RelationView, RetrievedContext};
