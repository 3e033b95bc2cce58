// Cross-cutting prompt fragments. Each feature that calls the LLM keeps its
// own prompt builders in a prompts.rs alongside it.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to prompts whose answer must come from a fixed list.
pub const CLOSED_LIST_INSTRUCTION: &str = "\
    CRITICAL: Only answer with values copied exactly from the allowed list. \
    Do NOT invent, rename, or abbreviate values. \
    If nothing in the list applies, answer with an empty array [].";
