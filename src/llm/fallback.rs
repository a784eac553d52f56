// Keyword fallback classifier
// Used whenever the model can't produce a usable analysis

use crate::models::{ComplaintAnalysis, Priority};

/// Suffix appended to every fallback reason
pub const FALLBACK_MARKER: &str = " (AI fallback)";

const SUMMARY_CHARS: usize = 100;

/// Ordered rules, first match wins. Order matters: "critical issue" must be
/// Critical, not Medium.
const RULES: &[(&[&str], Priority, &str)] = &[
    (
        &[
            "emergency",
            "urgent",
            "critical",
            "life threatening",
            "death",
            "danger",
            "fire",
            "explosion",
        ],
        Priority::Critical,
        "Emergency keywords detected",
    ),
    (
        &["broken", "damage", "leak", "flood", "burst", "collapse"],
        Priority::High,
        "Urgent repair needed",
    ),
    (
        &["repair", "fix", "issue", "problem", "not working"],
        Priority::Medium,
        "Standard repair request",
    ),
];

const DEFAULT_REASON: &str = "General complaint";

pub fn classify(text: &str) -> ComplaintAnalysis {
    let lowered = text.to_lowercase();

    let (priority, reason) = RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, priority, reason)| (*priority, *reason))
        .unwrap_or((Priority::Low, DEFAULT_REASON));

    ComplaintAnalysis {
        summary: summarize(text),
        priority,
        reason: format!("{}{}", reason, FALLBACK_MARKER),
    }
}

/// First 100 characters, with "..." when cut
fn summarize(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SUMMARY_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
