//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod appointment_repo;
pub mod connection_repo;
pub mod event_repo;
pub mod followup_repo;
pub mod hold_repo;
pub mod lead_repo;
pub mod message_repo;
pub mod org_repo;
pub mod payment_repo;
pub mod task_repo;

pub use appointment_repo::AppointmentRepo;
pub use connection_repo::ConnectionRepo;
pub use event_repo::EventRepo;
pub use followup_repo::FollowupRepo;
pub use hold_repo::HoldRepo;
pub use lead_repo::LeadRepo;
pub use message_repo::MessageRepo;
pub use org_repo::OrgRepo;
pub use payment_repo::PaymentRepo;
pub use task_repo::TaskRepo;
