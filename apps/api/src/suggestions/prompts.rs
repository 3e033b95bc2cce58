// Prompts for tech-stack suggestions.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::CLOSED_LIST_INSTRUCTION;
use crate::matching::catalog::TECH_CHOICES;

/// Suggestion prompt template. Replace `{choices}`, `{limit}` and
/// `{description}` before sending.
pub const SUGGEST_PROMPT_TEMPLATE: &str = r#"A team is writing a project posting. Suggest the technologies the project will need.

Allowed technologies (one per line):
{choices}

Return a JSON array of at most {limit} strings, most relevant first, e.g.
["Python", "Django", "PostgreSQL"]

{closed_list}

Project description:
---
{description}
---"#;

pub fn build_suggest_prompt(description: &str, limit: usize) -> String {
    SUGGEST_PROMPT_TEMPLATE
        .replace("{choices}", &TECH_CHOICES.join("\n"))
        .replace("{limit}", &limit.to_string())
        .replace("{closed_list}", CLOSED_LIST_INSTRUCTION)
        .replace("{description}", description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_catalog_and_description() {
        let prompt = build_suggest_prompt("A Django shop", 8);
        assert!(prompt.contains("Ruby on Rails\n"));
        assert!(prompt.contains("at most 8 strings"));
        assert!(prompt.contains("A Django shop"));
        assert!(!prompt.contains("{description}"));
    }
}
