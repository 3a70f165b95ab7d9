//! Prompt construction for task extraction

use tracing::debug;

use crate::llm::{CompletionRequest, Message};

/// System instruction framing the model as a task organizer
pub const SYSTEM_PROMPT: &str = "You are an expert task organizer and productivity coach. \
Your job is to help people break down their scattered thoughts into organized, actionable tasks. \
Be practical and specific in your suggestions.";

/// Build the user prompt for one brain dump
///
/// `categories` is the seed list; the model is free to invent others.
pub fn build_prompt(text: &str, categories: &[String]) -> String {
    debug!(text_len = text.len(), categories = categories.len(), "build_prompt: called");
    let seeds = if categories.is_empty() {
        "create a relevant category".to_string()
    } else {
        format!("{}, or create a new relevant category", categories.join(", "))
    };

    format!(
        r#"Analyze the following brain dump text and extract individual tasks. For each task, provide:
1. Task title (clear and actionable)
2. Category ({seeds})
3. Priority (alta, media, baja)
4. Estimated effort (1-5 scale where 1=very easy, 5=very complex)
5. Any relevant notes or context

Text to analyze: "{text}"

Respond in the same language as the text. Format the response strictly as a JSON array of tasks:
[
  {{
    "title": "Task title",
    "category": "category",
    "priority": "alta|media|baja",
    "effort": 1-5,
    "notes": "Any relevant context or steps"
  }}
]"#
    )
}

/// Build the completion request for one brain dump
pub fn build_request(text: &str, categories: &[String], max_tokens: u32) -> CompletionRequest {
    CompletionRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(build_prompt(text, categories))],
        max_tokens,
    }
}
