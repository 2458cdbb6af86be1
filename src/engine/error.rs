use ulid::Ulid;

use crate::model::{AppointmentStatus, BookingAction, ActorRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed input (bad minute range, empty reason, zero duration).
    Validation(&'static str),
    /// Slot conflicts with an active appointment, or a concurrent writer
    /// won the race. Carries the conflicting appointment when known.
    SlotUnavailable(Option<Ulid>),
    /// Requested interval falls outside shop or provider working hours.
    OutOfHours,
    /// Requested date falls inside a leave range of the provider.
    ProviderOnLeave,
    /// Customer cancellation inside the shop's cutoff window.
    PolicyViolation { cutoff_hours: i64 },
    /// No row in the transition table for (current status, action).
    InvalidStateTransition {
        status: AppointmentStatus,
        action: BookingAction,
    },
    /// Actor role may not perform this action.
    NotAuthorized {
        action: BookingAction,
        role: ActorRole,
    },
    NotFound(Ulid),
    /// Storage collaborator failed outside the retried-race path.
    Store(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::SlotUnavailable(Some(id)) => {
                write!(f, "slot unavailable: conflicts with appointment {id}")
            }
            EngineError::SlotUnavailable(None) => write!(f, "slot unavailable"),
            EngineError::OutOfHours => write!(f, "requested time is outside working hours"),
            EngineError::ProviderOnLeave => write!(f, "provider is on leave for that date"),
            EngineError::PolicyViolation { cutoff_hours } => {
                write!(
                    f,
                    "cancellation refused: inside the {cutoff_hours}h cutoff window"
                )
            }
            EngineError::InvalidStateTransition { status, action } => {
                write!(
                    f,
                    "invalid transition: cannot {} an appointment in state {}",
                    action.label(),
                    status.label()
                )
            }
            EngineError::NotAuthorized { action, role } => {
                write!(f, "role {} may not {}", role.label(), action.label())
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::SlotUnavailable(_) => "slot_unavailable",
            EngineError::OutOfHours => "out_of_hours",
            EngineError::ProviderOnLeave => "provider_on_leave",
            EngineError::PolicyViolation { .. } => "policy_violation",
            EngineError::InvalidStateTransition { .. } => "invalid_state_transition",
            EngineError::NotAuthorized { .. } => "not_authorized",
            EngineError::NotFound(_) => "not_found",
            EngineError::Store(_) => "store",
        }
    }
}
