//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where callers build rows

pub mod appointment;
pub mod connection;
pub mod event;
pub mod followup;
pub mod hold;
pub mod lead;
pub mod message;
pub mod org;
pub mod payment;
pub mod status;
pub mod task;
