//! Shared response envelope types for API handlers.
//!
//! Internal/administrative listings use a `{ "data": ... }` envelope. The
//! public booking endpoints return the fixed shapes their clients expect
//! (`{ "slots": [...] }`, `{ "hold_id": ... }`) and do not use it.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
