pub mod client;
pub mod dates;
pub mod repository;
pub mod types;

pub use client::Dhis2Client;
pub use repository::TrackerRepository;
pub use types::{
    ClosurePayload, DataElementValue, DataValue, Enrollment, EnrollmentRef, EnrollmentStatus, Event,
    EventStatus, ImportStats, ReconciledFragment, TrackedEntity, TrackedEntityQuery,
};
