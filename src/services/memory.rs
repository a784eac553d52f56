// In-memory complaint store
// Used for local runs without Firestore (STORE_BACKEND=memory) and in tests

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{sort_newest_first, ComplaintStore, StoreResult};
use crate::models::{Complaint, ComplaintUpdate};

/// Complaints keyed by an internal document ID, like the Firestore layout
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<String, Complaint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComplaintStore for InMemoryStore {
    async fn insert(&self, complaint: &Complaint) -> StoreResult<()> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        self.documents.write().await.insert(doc_id, complaint.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Complaint>> {
        let mut complaints: Vec<Complaint> =
            self.documents.read().await.values().cloned().collect();
        sort_newest_first(&mut complaints);
        Ok(complaints)
    }

    async fn find(&self, complaint_id: &str) -> StoreResult<Option<Complaint>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|c| c.complaint_id == complaint_id)
            .cloned())
    }

    async fn apply_update(&self, complaint_id: &str, update: &ComplaintUpdate) -> StoreResult<bool> {
        // Write lock held across find + mutate keeps the update atomic
        let mut documents = self.documents.write().await;
        match documents.values_mut().find(|c| c.complaint_id == complaint_id) {
            Some(complaint) => {
                update.apply_to(complaint);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
