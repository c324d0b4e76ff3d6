//! Raw corpus loading, preprocessing, and chunking.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

/// One document from the raw corpus.
#[derive(Debug, Clone)]
pub struct Document {
    /// Relative path of the source file (plus `#n` for JSON array members).
    pub id: String,
    pub text: String,
}

#[derive(Deserialize)]
struct JsonDocument {
    text: String,
}

/// Read all `.txt` and `.json` documents under a data directory. A `.txt`
/// file is one document; a `.json` file holds either `{"text": ...}` or an
/// array of such objects. Files that fail to read or parse are skipped with
/// a warning.
pub fn read_documents(data_dir: &Path) -> Result<Vec<Document>> {
    if !data_dir.exists() {
        anyhow::bail!("data directory does not exist: {}", data_dir.display());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(data_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let rel = path
            .strip_prefix(data_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        match path.extension().and_then(|e| e.to_str()) {
            Some("txt") => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()));
                match text {
                    Ok(text) => documents.push(Document { id: rel, text }),
                    Err(e) => tracing::warn!("skipping {}: {:#}", rel, e),
                }
            }
            Some("json") => match read_json_documents(path, &rel) {
                Ok(mut docs) => documents.append(&mut docs),
                Err(e) => tracing::warn!("skipping {}: {:#}", rel, e),
            },
            _ => {}
        }
    }

    tracing::info!(count = documents.len(), "loaded corpus documents");
    Ok(documents)
}

fn read_json_documents(path: &Path, rel: &str) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", rel))?;

    let mut docs = Vec::new();
    match value {
        serde_json::Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                if let Ok(doc) = serde_json::from_value::<JsonDocument>(item) {
                    docs.push(Document { id: format!("{}#{}", rel, i), text: doc.text });
                }
            }
        }
        other => {
            let doc: JsonDocument = serde_json::from_value(other)
                .with_context(|| format!("no \"text\" field in {}", rel))?;
            docs.push(Document { id: rel.to_string(), text: doc.text });
        }
    }
    Ok(docs)
}

/// Normalize raw text before sending it to the model: collapse whitespace,
/// strip HTML tags and URLs, and map full-width CJK punctuation to ASCII.
pub fn preprocess_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        if in_tag {
            if c == '>' {
                in_tag = false;
            }
            continue;
        }
        if c == '<' {
            in_tag = true;
            continue;
        }
        cleaned.push(match c {
            '，' => ',',
            '。' => '.',
            '：' => ':',
            '；' => ';',
            '？' => '?',
            '！' => '!',
            '“' | '”' => '"',
            '‘' | '’' => '\'',
            other => other,
        });
    }

    let cleaned = strip_urls(&cleaned);
    let mut out = String::with_capacity(cleaned.len());
    let mut last_was_space = true;
    for c in cleaned.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

fn strip_urls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let hit = ["http://", "https://"]
            .iter()
            .filter_map(|p| rest.find(p))
            .min();
        match hit {
            Some(start) => {
                out.push_str(&rest[..start]);
                let tail = &rest[start..];
                let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
                rest = &tail[end..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Split text into chunks of at most `max_chunk_size` characters, breaking
/// on sentence boundaries where possible. Oversized sentences are split
/// hard at the limit.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= max_chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut sentence = String::new();
    let mut sentence_len = 0usize;

    let mut flush_sentence =
        |sentence: &mut String, sentence_len: &mut usize, current: &mut String, current_len: &mut usize, chunks: &mut Vec<String>| {
            if *sentence_len == 0 {
                return;
            }
            if *current_len + *sentence_len > max_chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(current));
                    *current_len = 0;
                }
                if *sentence_len > max_chunk_size {
                    // Hard split a single oversized sentence
                    let chars: Vec<char> = sentence.chars().collect();
                    for piece in chars.chunks(max_chunk_size) {
                        chunks.push(piece.iter().collect());
                    }
                    sentence.clear();
                    *sentence_len = 0;
                    return;
                }
            }
            current.push_str(sentence);
            *current_len += *sentence_len;
            sentence.clear();
            *sentence_len = 0;
        };

    for c in text.chars() {
        sentence.push(c);
        sentence_len += 1;
        if matches!(c, '.' | '!' | '?') {
            flush_sentence(&mut sentence, &mut sentence_len, &mut current, &mut current_len, &mut chunks);
        }
    }
    flush_sentence(&mut sentence, &mut sentence_len, &mut current, &mut current_len, &mut chunks);
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_collapses_whitespace() {
        assert_eq!(preprocess_text("a  b\n\tc"), "a b c");
    }

    #[test]
    fn test_preprocess_strips_html() {
        assert_eq!(preprocess_text("<p>diabetes</p> mellitus"), "diabetes mellitus");
    }

    #[test]
    fn test_preprocess_strips_urls() {
        assert_eq!(
            preprocess_text("see https://example.com/page for details"),
            "see for details"
        );
    }

    #[test]
    fn test_preprocess_normalizes_cjk_punctuation() {
        assert_eq!(preprocess_text("糖尿病，多尿。"), "糖尿病,多尿.");
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_into_chunks("short text.", 100);
        assert_eq!(chunks, vec!["short text."]);
    }

    #[test]
    fn test_chunks_break_on_sentences() {
        let text = "First sentence. Second sentence. Third sentence.";
        let chunks = split_into_chunks(text, 20);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_oversized_sentence_hard_split() {
        let text = "x".repeat(50);
        let chunks = split_into_chunks(&text, 20);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_read_documents_txt_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "plain text doc").unwrap();
        std::fs::write(
            tmp.path().join("b.json"),
            r#"[{"text": "first"}, {"text": "second"}]"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join("c.json"), r#"{"text": "single"}"#).unwrap();
        std::fs::write(tmp.path().join("ignored.csv"), "x,y").unwrap();

        let mut docs = read_documents(tmp.path()).unwrap();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.json#0", "b.json#1", "c.json"]);
    }

    #[test]
    fn test_read_documents_missing_dir_is_error() {
        assert!(read_documents(std::path::Path::new("/nonexistent/corpus")).is_err());
    }
}
