//! The single safety-net task
//!
//! Every boundary that observes an extraction failure goes through
//! [`fallback_task`], so the wording and defaults cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Priority, Task};

/// Note attached when the model could not be reached
pub const TRANSPORT_NOTE: &str = "AI processing error - created manually";

/// Note attached when the model answered but nothing could be parsed
pub const UNCLASSIFIED_NOTE: &str = "Processed manually - AI could not classify automatically";

/// Which stage of extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// The model call failed, timed out or was refused
    Transport,
    /// The model answered with no usable JSON array
    Unclassified,
}

impl FallbackReason {
    pub fn note(self) -> &'static str {
        match self {
            FallbackReason::Transport => TRANSPORT_NOTE,
            FallbackReason::Unclassified => UNCLASSIFIED_NOTE,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Transport => write!(f, "transport"),
            FallbackReason::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Wrap the original input, unmodified, as one task
pub fn fallback_task(input: &str, reason: FallbackReason) -> Task {
    Task::new(input).with_priority(Priority::Medium).with_notes(reason.note())
}
