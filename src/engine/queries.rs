use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::{day_window, slots, DayAvailability};
use super::{Engine, EngineError};

impl Engine {
    /// Candidate open slots for a date, ascending. Read-only: operates on a
    /// snapshot of the provider's calendar taken under the read lock, so
    /// any number of callers may query concurrently. Two calls with no
    /// intervening mutation return identical sequences.
    ///
    /// A closed day (shop closed, provider on leave, disjoint hours) is a
    /// normal empty result carrying the reason, not an error.
    pub async fn compute_availability(
        &self,
        shop_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
        provider_id: Option<Ulid>,
    ) -> Result<DayAvailability, EngineError> {
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL).increment(1);

        let shop = self
            .directory
            .shop(shop_id)
            .ok_or(EngineError::NotFound(shop_id))?;
        let service = self
            .directory
            .service(service_id)
            .ok_or(EngineError::NotFound(service_id))?;

        let provider = match provider_id {
            Some(pid) => Some(
                self.directory
                    .provider(pid)
                    .ok_or(EngineError::NotFound(pid))?,
            ),
            None => None,
        };

        let window = match day_window(&shop.hours, provider.as_ref(), date) {
            Ok(w) => w,
            Err(reason) => return Ok(DayAvailability::closed(reason)),
        };

        // Snapshot under the read lock; conflicts are provider-scoped, so a
        // shop-wide query (no provider) checks none.
        let existing: Vec<Appointment> = match provider_id {
            Some(pid) => {
                let calendar = self.calendar(pid);
                let guard = calendar.read().await;
                guard.on_date(date).to_vec()
            }
            None => Vec::new(),
        };

        let open = slots(
            window,
            service.duration_minutes,
            self.config.slot_step_minutes,
            date,
            &existing,
        )
        .collect();

        Ok(DayAvailability {
            slots: open,
            closed: None,
        })
    }

    pub async fn get_appointment(&self, id: Ulid) -> Result<Appointment, EngineError> {
        let provider_id = self
            .provider_for_appointment(id)
            .ok_or(EngineError::NotFound(id))?;
        let calendar = self.calendar(provider_id);
        let guard = calendar.read().await;
        guard
            .get(id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// All appointments (any status) for a provider on a date, start order.
    pub async fn appointments_for_day(
        &self,
        provider_id: Ulid,
        date: NaiveDate,
    ) -> Vec<Appointment> {
        let calendar = self.calendar(provider_id);
        let guard = calendar.read().await;
        guard.on_date(date).to_vec()
    }
}
