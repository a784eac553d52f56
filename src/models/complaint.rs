// Complaint models
// Stored in the complaints collection, one document per complaint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage label every complaint starts in
pub const STATUS_SUBMITTED: &str = "Submitted";
/// Stage label set by a resolution
pub const STATUS_RESOLVED: &str = "Resolved";
/// Resolution type used when the caller gives none
pub const DEFAULT_RESOLUTION_TYPE: &str = "Permanent";
/// Actor recorded on updates that don't name one
pub const DEFAULT_UPDATED_BY: &str = "authority";

/// Triage severity of a complaint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Map any label to a canonical priority.
    ///
    /// Exact canonical labels pass through. Anything else is matched by
    /// lower-cased substring in the order critical, high, low; whatever is
    /// left (including empty input) lands on Medium.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(exact) = Self::ALL.iter().find(|p| p.as_str() == trimmed) {
            return *exact;
        }

        let lowered = trimmed.to_lowercase();
        if lowered.contains("critical") {
            Priority::Critical
        } else if lowered.contains("high") {
            Priority::High
        } else if lowered.contains("low") {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status change in a complaint's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub stage: String,
    pub message: String,
    pub updated_by: String,
    pub timestamp: DateTime<Utc>,
}

/// A citizen complaint as returned by the API.
/// The storage document ID is not part of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub complaint_id: String,
    pub citizen_text: String,
    pub ai_summary: String,
    pub priority: Priority,
    pub ai_priority_reason: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_type: Option<String>,
    #[serde(default)]
    pub progress_timeline: Vec<TimelineEntry>,
}

/// Result of analyzing complaint text
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintAnalysis {
    pub summary: String,
    pub priority: Priority,
    pub reason: String,
}

/// A single atomic change to an existing complaint: the scalar fields to set
/// plus the timeline entry to append.
#[derive(Debug, Clone)]
pub struct ComplaintUpdate {
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_type: Option<String>,
    pub entry: TimelineEntry,
}

impl ComplaintUpdate {
    /// Apply to an in-memory record
    pub fn apply_to(&self, complaint: &mut Complaint) {
        complaint.status = self.status.clone();
        if let Some(ts) = self.updated_at {
            complaint.updated_at = Some(ts);
        }
        if let Some(ts) = self.resolved_at {
            complaint.resolved_at = Some(ts);
        }
        if let Some(rt) = &self.resolution_type {
            complaint.resolution_type = Some(rt.clone());
        }
        complaint.progress_timeline.push(self.entry.clone());
    }
}

/// Request body for POST /api/complaints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub citizen_text: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
}

/// Request body for PATCH /api/complaints/:id/progress
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub status: Option<String>,
    pub note: Option<String>,
    pub updated_by: Option<String>,
}

/// Request body for PATCH /api/complaints/:id/resolve
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveComplaintRequest {
    pub resolution_type: Option<String>,
}

/// Response for update operations
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintStatusResponse {
    pub success: bool,
}
