// Complaint analyzer
// Asks the model for a summary and priority; any failure falls back to keywords

use serde::Deserialize;
use std::sync::Arc;

use super::client::TextGenerator;
use super::fallback;
use super::prompts::complaint_analysis_prompt;
use crate::models::{ComplaintAnalysis, Priority};

/// Shape the model is asked to return
#[derive(Debug, Deserialize)]
struct ModelAnalysis {
    summary: String,
    priority: String,
    reason: String,
}

pub struct ComplaintAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl ComplaintAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Analyze complaint text. Never fails: model errors, timeouts and
    /// unparseable output all produce the keyword fallback.
    pub async fn analyze(&self, text: &str) -> ComplaintAnalysis {
        let prompt = complaint_analysis_prompt(text);

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("AI analysis failed, using keyword fallback: {}", e);
                return fallback::classify(text);
            }
        };

        tracing::debug!("Raw AI analysis: {}", raw);

        match parse_analysis(&raw) {
            Some(analysis) => {
                tracing::info!(
                    "AI analysis complete: priority={}, reason={}",
                    analysis.priority,
                    analysis.reason
                );
                analysis
            }
            None => {
                tracing::warn!("AI returned unparseable analysis, using keyword fallback");
                fallback::classify(text)
            }
        }
    }
}

/// Parse model output into an analysis with a normalized priority
fn parse_analysis(raw: &str) -> Option<ComplaintAnalysis> {
    let cleaned = strip_code_fences(raw);
    let parsed: ModelAnalysis = match serde_json::from_str(cleaned) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Failed to parse AI analysis JSON: {}", e);
            return None;
        }
    };

    Some(ComplaintAnalysis {
        summary: parsed.summary,
        priority: Priority::normalize(&parsed.priority),
        reason: parsed.reason,
    })
}

/// Remove a leading ```json / ``` fence, a trailing ``` fence, and
/// surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
