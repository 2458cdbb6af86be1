use chrono::NaiveDateTime;

use crate::model::{ActorRole, Appointment};

use super::EngineError;

/// Decide whether `actor` may cancel `appointment` at `now`.
///
/// Customers may self-cancel only up to `cutoff_hours` before the start;
/// the cutoff is per-shop configuration, deliberately without a crate-level
/// default. Provider, staff, and system cancellations are always permitted
/// here; the transition layer additionally requires them to carry a reason.
pub fn can_cancel(
    appointment: &Appointment,
    actor: ActorRole,
    now: NaiveDateTime,
    cutoff_hours: i64,
) -> Result<(), EngineError> {
    match actor {
        ActorRole::Customer => {
            let deadline = appointment.start_instant() - chrono::Duration::hours(cutoff_hours);
            if now <= deadline {
                Ok(())
            } else {
                Err(EngineError::PolicyViolation { cutoff_hours })
            }
        }
        ActorRole::Provider | ActorRole::Staff | ActorRole::System => Ok(()),
    }
}
