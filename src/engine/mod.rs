mod availability;
mod conflict;
mod error;
mod mutations;
mod policy;
mod queries;
mod store;
mod transitions;

pub use availability::{
    day_window, slots, ClosedReason, DayAvailability, SlotIter, DEFAULT_SLOT_STEP,
};
pub use conflict::{find_conflict, has_conflict};
pub use error::EngineError;
pub use policy::can_cancel;
pub use store::{AppointmentStore, InMemoryStore, StoreError};
pub use transitions::next_status;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::directory::Directory;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedCalendar = Arc<RwLock<ProviderCalendar>>;

/// Tunables the engine reads but never hardcodes into the algorithms.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Walk step between candidate slot starts.
    pub slot_step_minutes: Minutes,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_step_minutes: DEFAULT_SLOT_STEP,
        }
    }
}

/// The booking engine. Owns one in-memory calendar per provider, guarded by
/// a `RwLock`: reads (availability) take shared snapshots, mutations hold
/// the write lock across the whole check-then-write step so two concurrent
/// creates for the same provider cannot both pass the conflict check.
///
/// Persistence goes through the [`AppointmentStore`] contract; a calendar
/// is only updated after the store accepts the write, so no operation can
/// partially commit.
pub struct Engine {
    pub(super) directory: Arc<dyn Directory>,
    pub(super) store: Arc<dyn AppointmentStore>,
    pub(super) calendars: DashMap<Ulid, SharedCalendar>,
    /// Reverse lookup: appointment id → provider id.
    pub(super) appointment_index: DashMap<Ulid, Ulid>,
    pub notify: Arc<NotifyHub>,
    pub(super) config: EngineConfig,
}

impl Engine {
    pub async fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn AppointmentStore>,
        notify: Arc<NotifyHub>,
    ) -> Result<Self, EngineError> {
        Self::with_config(directory, store, notify, EngineConfig::default()).await
    }

    /// Build the engine and replay the store into per-provider calendars.
    pub async fn with_config(
        directory: Arc<dyn Directory>,
        store: Arc<dyn AppointmentStore>,
        notify: Arc<NotifyHub>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let engine = Self {
            directory,
            store,
            calendars: DashMap::new(),
            appointment_index: DashMap::new(),
            notify,
            config,
        };

        let existing = engine
            .store
            .load_all()
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        for appt in existing {
            let calendar = engine.calendar(appt.provider_id);
            // Sole owner during startup — try_write always succeeds.
            let mut guard = calendar.try_write().expect("replay: uncontended write");
            engine.appointment_index.insert(appt.id, appt.provider_id);
            guard.insert(appt);
        }

        Ok(engine)
    }

    /// Get or lazily create the calendar for a provider.
    pub(super) fn calendar(&self, provider_id: Ulid) -> SharedCalendar {
        self.calendars
            .entry(provider_id)
            .or_insert_with(|| Arc::new(RwLock::new(ProviderCalendar::new(provider_id))))
            .value()
            .clone()
    }

    pub(super) fn provider_for_appointment(&self, id: Ulid) -> Option<Ulid> {
        self.appointment_index.get(&id).map(|e| *e.value())
    }

    /// Upsert a committed appointment into its calendar and the index.
    /// Caller holds the calendar write lock and has already persisted.
    pub(super) fn apply(&self, calendar: &mut ProviderCalendar, appt: Appointment) {
        self.appointment_index.insert(appt.id, appt.provider_id);
        calendar.remove(appt.id);
        calendar.insert(appt);
    }

    /// Reload this provider's rows from the store after a lost race, so the
    /// retried conflict check sees what the concurrent writer committed.
    pub(super) async fn resync_calendar(
        &self,
        calendar: &mut ProviderCalendar,
    ) -> Result<(), EngineError> {
        let provider_id = calendar.provider_id;
        let all = self
            .store
            .load_all()
            .await
            .map_err(|e| EngineError::Store(e.to_string()))?;
        calendar.appointments.clear();
        for appt in all.into_iter().filter(|a| a.provider_id == provider_id) {
            self.appointment_index.insert(appt.id, provider_id);
            calendar.insert(appt);
        }
        Ok(())
    }
}
