//! Hold lifetime and the appointment state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the API/repository layer and the task queue handlers.

use chrono::Duration;

/// How long a hold reserves its slot during checkout. Expiry is a
/// query-time predicate (`expires_at < now`), never a delete.
pub const HOLD_TTL_MINUTES: i64 = 10;

/// The hold TTL as a `chrono::Duration`.
pub fn hold_ttl() -> Duration {
    Duration::minutes(HOLD_TTL_MINUTES)
}

/// Appointment status IDs matching the `appointment_statuses` seed data
/// (1-based SMALLSERIAL).
///
/// The state machine is intentionally duplicated from the `db` crate's
/// `AppointmentStatus` enum because `core` must have zero internal deps.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Transitions are strictly forward; the terminal states (Confirmed=3,
    /// Cancelled=4) return an empty slice.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // PendingHold -> PendingPayment, Cancelled (hold-expiry cleanup)
            1 => &[2, 4],
            // PendingPayment -> Confirmed, Cancelled
            2 => &[3, 4],
            // Terminal states: Confirmed, Cancelled
            3 | 4 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Human-readable name for a status ID (for error messages).
    fn status_name(id: i16) -> &'static str {
        match id {
            1 => "PendingHold",
            2 => "PendingPayment",
            3 => "Confirmed",
            4 => "Cancelled",
            _ => "Unknown",
        }
    }
}
