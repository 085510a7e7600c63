//! Prompt templates sent to the language model.
//!
//! Prompts are bounded here, before submission, so an oversized input is
//! truncated rather than rejected.

use super::generator::CONTEXT_TOKENS;

/// Only this much extracted report text goes into the analysis prompt.
pub const REPORT_EXCERPT_CHARS: usize = 1500;
/// Rough chars-per-token ratio used to bound prompts without a tokenizer.
const CHARS_PER_TOKEN: usize = 4;

/// Prompt asking for a three-part analysis separated by `---`.
pub fn analysis_prompt(report_text: &str) -> String {
    let excerpt = truncate_chars(report_text, REPORT_EXCERPT_CHARS);
    bound(format!(
        "Analyze this medical report: {excerpt}\n\
         1. Summary: (2 sentences)\n\
         2. Risks: (bullet points)\n\
         3. Recommendations: (bullet points)\n\
         IMPORTANT: Wrap complex terms in [[Term]]. Separate sections with '---'"
    ))
}

/// Prompt asking for a plain-language definition of a medical term.
pub fn definition_prompt(term: &str) -> String {
    bound(format!(
        "Define the medical term '{term}' in one simple sentence for a patient. Avoid jargon."
    ))
}

/// Prompt answering a free-form patient question.
pub fn chat_prompt(message: &str) -> String {
    bound(format!(
        "Patient asks: {message}\nRespond as a helpful, clear doctor:"
    ))
}

/// Truncate a prompt to the model's context budget.
fn bound(prompt: String) -> String {
    let max_chars = CONTEXT_TOKENS as usize * CHARS_PER_TOKEN;
    if prompt.chars().count() <= max_chars {
        return prompt;
    }

    tracing::debug!(max_chars, "Truncating oversized prompt");
    truncate_chars(&prompt, max_chars).to_string()
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
