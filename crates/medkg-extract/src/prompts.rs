//! Prompt templates and the extraction vocabularies.

use medkg_core::graph::Entity;

/// Entity categories the extractor asks the model to use.
pub const ENTITY_CATEGORIES: [&str; 10] = [
    "disease",
    "symptom",
    "drug",
    "treatment",
    "test",
    "anatomy",
    "cause",
    "complication",
    "hospital",
    "department",
];

/// Relation kinds the extractor asks the model to use.
pub const RELATION_KINDS: [&str; 11] = [
    "treats",
    "prevents",
    "causes",
    "examines",
    "diagnoses",
    "belongs_to",
    "complicates",
    "used_for",
    "located_in",
    "has_symptom",
    "side_effect",
];

/// Appended to every structured prompt. Models still ignore it often enough
/// that the response parser stays lenient.
pub const JSON_ONLY_SUFFIX: &str =
    "Return only valid JSON with matched quotes and correct commas. No other text.";

/// Prompt asking the model to list all medical entities in a text chunk.
pub fn entity_extraction(text: &str) -> String {
    format!(
        r#"Extract all medical entities from the following text and classify each one.
Entity types: {types}.

Text:
{text}

Output format (JSON):
{{
    "entities": [
        {{"name": "entity name", "type": "entity type"}}
    ]
}}"#,
        types = ENTITY_CATEGORIES.join(", "),
        text = text,
    )
}

/// Prompt asking whether a relation holds between two specific entities.
pub fn relation_extraction(source: &Entity, target: &Entity, candidate_kinds: &[&str]) -> String {
    format!(
        r#"From a medical standpoint, analyze the relationship between these two entities:
Source entity: {src} (type: {src_cat})
Target entity: {tgt} (type: {tgt_cat})

Determine whether a relationship exists. If it does, give its type, a short
description, and a confidence between 0.0 and 1.0.
Possible relation types: {kinds}.

Answer in JSON:
[
  {{"type": "relation type", "description": "short description", "confidence": 0.9}}
]

If no relationship exists, return an empty array []."#,
        src = source.name,
        src_cat = source.category,
        tgt = target.name,
        tgt_cat = target.category,
        kinds = candidate_kinds.join(", "),
    )
}

/// Candidate relation kinds for a (source category, target category) pair.
/// Returns the kinds plus whether source/target should be swapped to match
/// the canonical direction. Unknown pairs get the full vocabulary.
pub fn candidate_kinds(source_cat: &str, target_cat: &str) -> (Vec<&'static str>, bool) {
    if let Some(kinds) = directed_kinds(source_cat, target_cat) {
        return (kinds, false);
    }
    if let Some(kinds) = directed_kinds(target_cat, source_cat) {
        return (kinds, true);
    }
    (RELATION_KINDS.to_vec(), false)
}

fn directed_kinds(source_cat: &str, target_cat: &str) -> Option<Vec<&'static str>> {
    let kinds: Vec<&'static str> = match (source_cat, target_cat) {
        ("disease", "symptom") => vec!["has_symptom"],
        ("drug", "disease") => vec!["treats", "prevents"],
        ("treatment", "disease") => vec!["treats", "used_for"],
        ("test", "disease") => vec!["diagnoses", "examines"],
        ("disease", "complication") => vec!["causes", "complicates"],
        ("cause", "disease") => vec!["causes"],
        ("disease", "anatomy") => vec!["located_in"],
        ("drug", "symptom") => vec!["side_effect", "treats"],
        ("department", "hospital") => vec!["belongs_to"],
        ("disease", "department") => vec!["belongs_to"],
        _ => return None,
    };
    Some(kinds)
}
