//! chairtime — availability and conflict-free booking engine.
//!
//! Computes bookable time slots from shop and provider working hours,
//! drives the appointment lifecycle through an explicit transition table,
//! and guarantees that no provider is ever double-booked: the conflict
//! check and the write commit as a single unit per provider, with an
//! optimistic version stamp guarding individual appointments.
//!
//! Persistence, authentication, and the HTTP surface are collaborators
//! behind seams ([`engine::AppointmentStore`], [`directory::Directory`]);
//! this crate owns the scheduling invariants only.

pub mod directory;
pub mod engine;
pub mod model;
pub mod notify;
pub mod observability;
pub mod timeutil;

pub use engine::{
    AppointmentStore, ClosedReason, DayAvailability, Engine, EngineConfig, EngineError,
    InMemoryStore, StoreError,
};
pub use model::{
    ActorRole, Appointment, AppointmentStatus, BookingAction, BookingEvent, BusinessHours,
    LeaveRange, Minutes, Provider, Service, Shop, Slot,
};
pub use notify::NotifyHub;
