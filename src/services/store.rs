// Complaint persistence seam

use async_trait::async_trait;

use crate::models::{Complaint, ComplaintUpdate};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store holding complaint records.
///
/// `apply_update` must be a single atomic write per record: set the scalar
/// fields and append the timeline entry together, or do nothing. It returns
/// `false` when no record has the given complaint ID.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn insert(&self, complaint: &Complaint) -> StoreResult<()>;

    /// All complaints, newest `created_at` first, ties by complaint ID descending
    async fn list(&self) -> StoreResult<Vec<Complaint>>;

    async fn find(&self, complaint_id: &str) -> StoreResult<Option<Complaint>>;

    async fn apply_update(&self, complaint_id: &str, update: &ComplaintUpdate) -> StoreResult<bool>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// Newest `created_at` first; equal timestamps fall back to complaint ID descending
pub fn sort_newest_first(complaints: &mut [Complaint]) {
    complaints.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.complaint_id.cmp(&a.complaint_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::complaint;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let later = t + chrono::Duration::seconds(1);
        let mut complaints = vec![
            complaint("CPA-100", t),
            complaint("CPA-102", t),
            complaint("CPA-050", later),
            complaint("CPA-101", t),
        ];

        sort_newest_first(&mut complaints);

        let ids: Vec<&str> = complaints.iter().map(|c| c.complaint_id.as_str()).collect();
        assert_eq!(ids, ["CPA-050", "CPA-102", "CPA-101", "CPA-100"]);
    }
}
