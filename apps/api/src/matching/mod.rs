//! Skill matching: compares two comma-separated tech stacks.
//!
//! Stacks are stored as a single `TEXT` column joined with `,`. Matching is a
//! case-insensitive set intersection; the percentage base depends on who is
//! being ranked:
//! - projects for a user: base = the user's stack size
//! - contributors for a project: base = the project's skill count

pub mod catalog;

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::AppError;
use crate::matching::catalog::canonical_tech;

// ────────────────────────────────────────────────────────────────────────────
// Storage format
// ────────────────────────────────────────────────────────────────────────────

/// Splits a stored stack on `,`, trimming entries and dropping empties.
pub fn parse_tech_stack(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Validates submitted entries against the catalog and builds the stored form.
///
/// Entries are canonicalized, deduplicated in submission order and joined
/// with `,`. An empty submission stores `NULL`.
pub fn normalize_tech_stack(entries: &[String]) -> Result<Option<String>, AppError> {
    let mut seen = HashSet::new();
    let mut canonical = Vec::new();
    let mut unknown = Vec::new();

    for entry in entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        match canonical_tech(entry) {
            Some(tech) => {
                if seen.insert(tech) {
                    canonical.push(tech);
                }
            }
            None => unknown.push(entry.to_string()),
        }
    }

    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Unknown technologies: {}",
            unknown.join(", ")
        )));
    }

    if canonical.is_empty() {
        Ok(None)
    } else {
        Ok(Some(canonical.join(",")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchScore {
    pub match_score: usize,
    pub match_percentage: u32,
}

/// Size of the case-insensitive intersection of two stacks.
pub fn match_count(a: &[String], b: &[String]) -> usize {
    let left: HashSet<String> = a.iter().map(|t| t.to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|t| t.to_lowercase()).collect();
    left.intersection(&right).count()
}

/// `floor(count * 100 / base)`, or 0 for an empty base.
pub fn match_percentage(count: usize, base: usize) -> u32 {
    if base == 0 {
        return 0;
    }
    ((count * 100) / base) as u32
}

/// How well a project fits a user, relative to the user's own stack.
pub fn score_project_for_user(user_stack: &[String], project_skills: &[String]) -> MatchScore {
    let count = match_count(user_stack, project_skills);
    MatchScore {
        match_score: count,
        match_percentage: match_percentage(count, user_stack.len()),
    }
}

/// How well a user covers a project's required skills.
pub fn score_contributor_for_project(
    project_skills: &[String],
    user_stack: &[String],
) -> MatchScore {
    let count = match_count(user_stack, project_skills);
    MatchScore {
        match_score: count,
        match_percentage: match_percentage(count, project_skills.len()),
    }
}

/// Stable sort, highest score first. Equal scores keep their incoming order,
/// so callers pass items already ordered newest-first.
pub fn rank_by<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
