// Models module

pub mod complaint;

pub use complaint::{
    Complaint, ComplaintAnalysis, ComplaintStatusResponse, ComplaintUpdate,
    CreateComplaintRequest, Priority, ResolveComplaintRequest, TimelineEntry,
    UpdateProgressRequest, DEFAULT_RESOLUTION_TYPE, DEFAULT_UPDATED_BY, STATUS_RESOLVED,
    STATUS_SUBMITTED,
};
