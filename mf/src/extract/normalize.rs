//! Response normalization
//!
//! Model output is untrusted text. The first `[` through the last `]` is
//! taken as the candidate array; each element becomes a normalized Task.
//! Elements that are not objects carry no fields and get every default.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Priority, Task};

/// Title used when an element carries neither `title` nor `text`
pub const UNTITLED: &str = "Untitled task";

static ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// Why model output could not be turned into tasks
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no JSON array found in model output")]
    NoArray,

    #[error("malformed JSON array: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("array element {index} is null")]
    NullElement { index: usize },
}

/// Extract and normalize every task in `raw`
///
/// An empty array yields no tasks and is not an error.
pub fn normalize(raw: &str) -> Result<Vec<Task>, NormalizeError> {
    debug!(raw_len = raw.len(), "normalize: called");
    let candidate = ARRAY_RE.find(raw).ok_or(NormalizeError::NoArray)?;
    let elements: Vec<Value> = serde_json::from_str(candidate.as_str())?;

    let tasks = elements
        .iter()
        .enumerate()
        .map(|(index, element)| match element {
            Value::Null => Err(NormalizeError::NullElement { index }),
            Value::Object(fields) => Ok(normalize_element(fields)),
            _ => Ok(normalize_element(&Map::new())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = tasks.len(), "normalize: done");
    Ok(tasks)
}

fn normalize_element(element: &Map<String, Value>) -> Task {
    let title = text_field(element, "title")
        .or_else(|| text_field(element, "text"))
        .unwrap_or(UNTITLED);
    let notes = text_field(element, "notes");
    let priority = Priority::from_model_label(element.get("priority").and_then(Value::as_str));

    let mut task = Task::new(title.trim())
        .with_category(text_field(element, "category").unwrap_or_default())
        .with_priority(priority);

    match notes {
        Some(notes) => {
            task.notes = Some(notes.to_string());
            task.description = Some(notes.to_string());
        }
        None => {
            task.notes = Some(format!("Estimated effort: {}", effort_label(element.get("effort"))));
        }
    }

    task
}

/// A string field that is present and not blank
fn text_field<'a>(element: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    element
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn effort_label(effort: Option<&Value>) -> String {
    match effort {
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => "unspecified".to_string(),
    }
}
