use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::Appointment;

/// Failures from the storage collaborator. `Conflict` and `VersionMismatch`
/// are the lost-race signals the engine retries once before surfacing
/// `SlotUnavailable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Insert would violate the uniqueness constraint over
    /// `(provider, date, overlapping slot)`.
    Conflict(Ulid),
    /// Compare-and-swap found a different version than expected.
    VersionMismatch { expected: u64, actual: u64 },
    NotFound(Ulid),
    /// Anything else the backing store can fail with.
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(id) => write!(f, "insert conflicts with appointment {id}"),
            StoreError::VersionMismatch { expected, actual } => {
                write!(f, "version mismatch: expected {expected}, found {actual}")
            }
            StoreError::NotFound(id) => write!(f, "appointment not found: {id}"),
            StoreError::Backend(e) => write!(f, "backend error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The persistence contract the engine requires. The engine itself never
/// persists anything; it commits through this seam and only updates its
/// in-memory calendars after the store accepts the write.
///
/// Implementations must make `insert` atomic with respect to the uniqueness
/// constraint over `(provider, date, overlapping active slot)` and
/// `compare_and_swap` atomic with respect to the version check, typically
/// via a transaction or a conditional write.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Atomically insert a new appointment. Fails with `Conflict` when an
    /// active appointment for the same provider and date overlaps.
    async fn insert(&self, appt: &Appointment) -> Result<(), StoreError>;

    /// Atomically replace the stored appointment iff its version equals
    /// `expected_version`. `updated.version` must already be bumped.
    async fn compare_and_swap(
        &self,
        id: Ulid,
        expected_version: u64,
        updated: &Appointment,
    ) -> Result<(), StoreError>;

    async fn get(&self, id: Ulid) -> Result<Appointment, StoreError>;

    /// Everything ever stored, for engine startup replay.
    async fn load_all(&self) -> Result<Vec<Appointment>, StoreError>;
}

/// Reference store. A `DashMap` keyed by appointment id plus a sweep over
/// the provider's rows on insert stands in for the database uniqueness
/// constraint; good enough for tests and single-process embedding.
#[derive(Default)]
pub struct InMemoryStore {
    rows: DashMap<Ulid, Appointment>,
    /// Serializes insert sweeps so two overlapping inserts cannot both pass
    /// the scan. Plays the role of the storage transaction.
    write_gate: tokio::sync::Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Seed a row directly, bypassing the conflict sweep. Startup/test use.
    pub fn seed(&self, appt: Appointment) {
        self.rows.insert(appt.id, appt);
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn insert(&self, appt: &Appointment) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        for row in self.rows.iter() {
            let existing = row.value();
            if existing.provider_id == appt.provider_id
                && existing.date == appt.date
                && existing.status.is_active()
                && existing.slot.overlaps(&appt.slot)
            {
                return Err(StoreError::Conflict(existing.id));
            }
        }
        self.rows.insert(appt.id, appt.clone());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        id: Ulid,
        expected_version: u64,
        updated: &Appointment,
    ) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock().await;
        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if row.version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual: row.version,
            });
        }
        *row = updated.clone();
        Ok(())
    }

    async fn get(&self, id: Ulid) -> Result<Appointment, StoreError> {
        self.rows
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn load_all(&self) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.rows.iter().map(|r| r.value().clone()).collect())
    }
}
