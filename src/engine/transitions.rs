use chrono::NaiveDateTime;

use crate::model::{ActorRole, Appointment, AppointmentStatus, BookingAction};

use super::EngineError;

/// The lifecycle transition table. Every status change goes through here;
/// any (status, action) pair without a row fails with
/// `InvalidStateTransition` naming both.
///
/// | from               | action       | to        |
/// |--------------------|--------------|-----------|
/// | pending            | confirm      | confirmed |
/// | confirmed          | complete     | completed |
/// | confirmed          | mark_no_show | no_show   |
/// | pending, confirmed | cancel       | cancelled |
/// | pending, confirmed | reschedule   | pending   |
pub fn next_status(
    current: AppointmentStatus,
    action: BookingAction,
) -> Result<AppointmentStatus, EngineError> {
    use AppointmentStatus::*;
    use BookingAction::*;
    match (current, action) {
        (Pending, Confirm) => Ok(Confirmed),
        (Confirmed, Complete) => Ok(Completed),
        (Confirmed, MarkNoShow) => Ok(NoShow),
        (Pending, Cancel) | (Confirmed, Cancel) => Ok(Cancelled),
        (Pending, Reschedule) | (Confirmed, Reschedule) => Ok(Pending),
        (status, action) => Err(EngineError::InvalidStateTransition { status, action }),
    }
}

/// Role and clock guards for a transition, checked after the table lookup.
pub fn check_guards(
    appointment: &Appointment,
    action: BookingAction,
    actor: ActorRole,
    now: NaiveDateTime,
) -> Result<(), EngineError> {
    match action {
        BookingAction::Confirm => match actor {
            ActorRole::Provider | ActorRole::Staff => Ok(()),
            role => Err(EngineError::NotAuthorized { action, role }),
        },
        BookingAction::Complete => {
            if !matches!(actor, ActorRole::Provider) {
                return Err(EngineError::NotAuthorized { action, role: actor });
            }
            if now < appointment.start_instant() {
                // Completing before the appointment has begun is not a
                // legal transition at this time.
                return Err(EngineError::InvalidStateTransition {
                    status: appointment.status,
                    action,
                });
            }
            Ok(())
        }
        BookingAction::MarkNoShow => {
            if !matches!(actor, ActorRole::Provider) {
                return Err(EngineError::NotAuthorized { action, role: actor });
            }
            if now < appointment.end_instant() {
                return Err(EngineError::InvalidStateTransition {
                    status: appointment.status,
                    action,
                });
            }
            Ok(())
        }
        // Cancel guards live in the policy module; mutations wires them in
        // together with the reason requirement.
        BookingAction::Cancel => Ok(()),
        // Reschedule re-validates hours and conflicts instead; no
        // role or clock guard here.
        BookingAction::Reschedule => Ok(()),
    }
}
