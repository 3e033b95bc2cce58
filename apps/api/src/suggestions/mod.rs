//! Tech-stack suggestions for a project description.
//!
//! Two backends sit behind `TechStackSuggester`: a deterministic keyword
//! scan over the catalog, and an LLM backend that falls back to the scan
//! whenever the model call fails or returns nothing usable.

pub mod handlers;
pub mod prompts;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;
use crate::matching::catalog::{canonical_tech, TECH_CHOICES};
use crate::suggestions::prompts::build_suggest_prompt;

pub const MAX_SUGGESTIONS: usize = 8;

/// Common spellings that are not catalog entries themselves.
const ALIASES: &[(&str, &str)] = &[
    ("golang", "Go"),
    ("postgres", "PostgreSQL"),
    ("mongo", "MongoDB"),
    ("k8s", "Kubernetes"),
    ("nodejs", "Node.js"),
    ("node", "Node.js"),
    ("rails", "Ruby on Rails"),
    ("tailwind", "Tailwind CSS"),
    ("dotnet", ".NET"),
    ("gcp", "Google Cloud"),
    ("websocket", "WebSockets"),
    ("rest", "REST API"),
    ("ml", "Machine Learning"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Llm,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestions {
    pub suggestions: Vec<&'static str>,
    pub source: SuggestionSource,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Carried in `AppState` as `Arc<dyn TechStackSuggester>`.
///
/// Suggesting never fails: backends degrade to the keyword scan.
#[async_trait]
pub trait TechStackSuggester: Send + Sync {
    async fn suggest(&self, description: &str) -> Suggestions;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordSuggester
// ────────────────────────────────────────────────────────────────────────────

/// Catalog entries (and aliases) that appear as whole words in the
/// description, case-insensitive, in catalog order.
pub struct KeywordSuggester;

#[async_trait]
impl TechStackSuggester for KeywordSuggester {
    async fn suggest(&self, description: &str) -> Suggestions {
        Suggestions {
            suggestions: keyword_suggestions(description),
            source: SuggestionSource::Keyword,
        }
    }
}

pub fn keyword_suggestions(description: &str) -> Vec<&'static str> {
    let haystack = description.to_lowercase();
    let mut found: HashSet<&'static str> = TECH_CHOICES
        .iter()
        .copied()
        .filter(|tech| contains_word(&haystack, &tech.to_lowercase()))
        .collect();
    for &(alias, tech) in ALIASES {
        if contains_word(&haystack, alias) {
            found.insert(tech);
        }
    }

    TECH_CHOICES
        .iter()
        .copied()
        .filter(|tech| found.contains(tech))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// True when `needle` occurs in `haystack` with no alphanumeric character
/// directly on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// LlmSuggester
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmSuggester {
    llm: LlmClient,
}

impl LlmSuggester {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl TechStackSuggester for LlmSuggester {
    async fn suggest(&self, description: &str) -> Suggestions {
        let prompt = build_suggest_prompt(description, MAX_SUGGESTIONS);
        match self.llm.call_json::<Vec<String>>(&prompt, JSON_ONLY_SYSTEM).await {
            Ok(raw) => {
                let suggestions = keep_catalog_entries(&raw);
                if !suggestions.is_empty() {
                    return Suggestions {
                        suggestions,
                        source: SuggestionSource::Llm,
                    };
                }
                warn!("LLM suggested no catalog technologies; using keyword scan");
            }
            Err(e) => warn!("LLM tech-stack suggestion failed, using keyword scan: {e}"),
        }
        KeywordSuggester.suggest(description).await
    }
}

/// Canonicalizes model output, dropping unknown and repeated entries.
fn keep_catalog_entries(raw: &[String]) -> Vec<&'static str> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|entry| canonical_tech(entry))
        .filter(|tech| seen.insert(*tech))
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_scan_returns_catalog_order() {
        let found = keyword_suggestions("Docker deploys of a React app with a python backend");
        assert_eq!(found, vec!["Python", "React", "Docker"]);
    }

    #[test]
    fn test_keyword_scan_needs_whole_words() {
        assert_eq!(keyword_suggestions("JavaScript frontend"), vec!["JavaScript"]);
        assert!(keyword_suggestions("gopher rusty").is_empty());
    }

    #[test]
    fn test_keyword_scan_handles_punctuated_entries() {
        let found = keyword_suggestions("Backend in C# on .NET, UI in HTML/CSS.");
        assert_eq!(found, vec!["HTML/CSS", "C#", ".NET"]);
    }

    #[test]
    fn test_aliases_map_to_catalog() {
        let found = keyword_suggestions("golang service on k8s with postgres");
        assert_eq!(found, vec!["Go", "PostgreSQL", "Kubernetes"]);
    }

    #[test]
    fn test_keyword_scan_caps_results() {
        let text = TECH_CHOICES.join(" ; ");
        assert_eq!(keyword_suggestions(&text).len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_keep_catalog_entries_filters_model_output() {
        let raw = vec![
            "rust".to_string(),
            "Elixir".to_string(),
            "Rust".to_string(),
            "docker".to_string(),
        ];
        assert_eq!(keep_catalog_entries(&raw), vec!["Rust", "Docker"]);
    }

    #[tokio::test]
    async fn test_keyword_suggester_reports_source() {
        let result = KeywordSuggester.suggest("A Flask API").await;
        assert_eq!(result.source, SuggestionSource::Keyword);
        assert_eq!(result.suggestions, vec!["Flask"]);
    }

    #[tokio::test]
    async fn test_llm_suggester_falls_back_when_unreachable() {
        // Port 9 (discard) refuses connections, so every attempt errors out.
        let llm = LlmClient::with_base_url("key".to_string(), "http://127.0.0.1:9/v1/messages")
            .unwrap();
        let result = LlmSuggester::new(llm).suggest("Rust and Redis").await;
        assert_eq!(result.source, SuggestionSource::Keyword);
        assert_eq!(result.suggestions, vec!["Rust", "Redis"]);
    }
}
