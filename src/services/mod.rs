// Services module

pub mod complaints;
pub mod firestore;
pub mod memory;
pub mod store;

pub use complaints::ComplaintService;
pub use firestore::{FirestoreService, FirestoreSettings};
pub use memory::InMemoryStore;
pub use store::{ComplaintStore, StoreError};
