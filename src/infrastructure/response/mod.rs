use once_cell::sync::Lazy;
use regex::Regex;

static REASONING_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>|<reasoning>[\s\S]*?</reasoning>").unwrap()
});

// A fence, plus its language tag when the tag sits alone on the line (```sql).
static CODE_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:[A-Za-z]+\n)?").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips model artifacts from a completion: reasoning blocks and markdown
/// code fences. Text inside a fence is kept.
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = REASONING_BLOCK_PATTERN.replace_all(response, "");
    let cleaned = CODE_FENCE_PATTERN.replace_all(&cleaned, "");
    let cleaned = MULTIPLE_NEWLINES_PATTERN.replace_all(cleaned.trim(), "\n\n");
    cleaned.trim().to_string()
}
