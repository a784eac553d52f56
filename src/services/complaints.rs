// Complaint lifecycle: intake, progress updates, resolution

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::store::{ComplaintStore, StoreResult};
use crate::llm::ComplaintAnalyzer;
use crate::models::{
    Complaint, ComplaintUpdate, TimelineEntry, DEFAULT_RESOLUTION_TYPE, DEFAULT_UPDATED_BY,
    STATUS_RESOLVED, STATUS_SUBMITTED,
};

/// Issues `CPA-<unix seconds>` IDs. Two complaints created in the same
/// second get consecutive seconds instead of the same ID.
#[derive(Debug, Default)]
pub struct ComplaintIdGenerator {
    last_issued: AtomicI64,
}

impl ComplaintIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, now: DateTime<Utc>) -> String {
        let now_secs = now.timestamp();
        let mut last = self.last_issued.load(Ordering::Relaxed);
        loop {
            let candidate = now_secs.max(last + 1);
            match self.last_issued.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("CPA-{}", candidate),
                Err(actual) => last = actual,
            }
        }
    }
}

/// Complaint operations over an injected store and analyzer
pub struct ComplaintService {
    store: Arc<dyn ComplaintStore>,
    analyzer: Arc<ComplaintAnalyzer>,
    ids: ComplaintIdGenerator,
}

impl ComplaintService {
    pub fn new(store: Arc<dyn ComplaintStore>, analyzer: Arc<ComplaintAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            ids: ComplaintIdGenerator::new(),
        }
    }

    /// Analyze and store a new complaint
    pub async fn create(
        &self,
        citizen_text: &str,
        department: Option<String>,
        location: Option<String>,
    ) -> StoreResult<Complaint> {
        let analysis = self.analyzer.analyze(citizen_text).await;
        let now = Utc::now();

        let complaint = Complaint {
            complaint_id: self.ids.next_id(now),
            citizen_text: citizen_text.to_string(),
            ai_summary: analysis.summary,
            priority: analysis.priority,
            ai_priority_reason: analysis.reason,
            department,
            location,
            status: STATUS_SUBMITTED.to_string(),
            created_at: now,
            updated_at: None,
            resolved_at: None,
            resolution_type: None,
            progress_timeline: vec![TimelineEntry {
                stage: STATUS_SUBMITTED.to_string(),
                message: "Complaint analyzed".to_string(),
                updated_by: "system".to_string(),
                timestamp: now,
            }],
        };

        self.store.insert(&complaint).await?;

        tracing::info!(
            "Created complaint {} with priority {}",
            complaint.complaint_id,
            complaint.priority
        );
        Ok(complaint)
    }

    pub async fn list(&self) -> StoreResult<Vec<Complaint>> {
        self.store.list().await
    }

    pub async fn get(&self, complaint_id: &str) -> StoreResult<Option<Complaint>> {
        self.store.find(complaint_id).await
    }

    /// Move a complaint to a new stage. Returns false if no complaint matched.
    pub async fn update_progress(
        &self,
        complaint_id: &str,
        status: &str,
        note: &str,
        updated_by: Option<&str>,
    ) -> StoreResult<bool> {
        let now = Utc::now();
        let update = ComplaintUpdate {
            status: status.to_string(),
            updated_at: Some(now),
            resolved_at: None,
            resolution_type: None,
            entry: TimelineEntry {
                stage: status.to_string(),
                message: note.to_string(),
                updated_by: updated_by.unwrap_or(DEFAULT_UPDATED_BY).to_string(),
                timestamp: now,
            },
        };

        self.store.apply_update(complaint_id, &update).await
    }

    /// Mark a complaint resolved. Returns false if no complaint matched.
    pub async fn resolve(&self, complaint_id: &str, resolution_type: Option<&str>) -> StoreResult<bool> {
        let now = Utc::now();
        let resolution_type = resolution_type.unwrap_or(DEFAULT_RESOLUTION_TYPE);
        let update = ComplaintUpdate {
            status: STATUS_RESOLVED.to_string(),
            updated_at: None,
            resolved_at: Some(now),
            resolution_type: Some(resolution_type.to_string()),
            entry: TimelineEntry {
                stage: STATUS_RESOLVED.to_string(),
                message: format!("Complaint resolved ({} resolution)", resolution_type),
                updated_by: DEFAULT_UPDATED_BY.to_string(),
                timestamp: now,
            },
        };

        self.store.apply_update(complaint_id, &update).await
    }

    pub async fn ping_store(&self) -> StoreResult<()> {
        self.store.ping().await
    }
}
