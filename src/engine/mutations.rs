use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;

use super::availability::{day_window, ClosedReason};
use super::conflict::{check_no_conflict, validate_slot};
use super::policy::can_cancel;
use super::store::StoreError;
use super::transitions::{check_guards, next_status};
use super::{Engine, EngineError};

fn window_error(reason: ClosedReason) -> EngineError {
    match reason {
        ClosedReason::ProviderOnLeave => EngineError::ProviderOnLeave,
        ClosedReason::ShopClosed | ClosedReason::OutsideProviderHours => EngineError::OutOfHours,
    }
}

fn reject(err: EngineError) -> EngineError {
    metrics::counter!(
        crate::observability::MUTATIONS_REJECTED_TOTAL,
        "reason" => err.label()
    )
    .increment(1);
    debug!("mutation rejected: {err}");
    err
}

impl Engine {
    /// Book a slot for a customer. Validates hours/leave, then holds the
    /// provider's write lock across conflict check + store insert so a
    /// concurrent create for an overlapping interval cannot also succeed.
    ///
    /// A lost race against another process (store-level conflict) is retried
    /// exactly once after resyncing from the store; a second loss surfaces
    /// as `SlotUnavailable`.
    pub async fn create_booking(
        &self,
        customer_id: Ulid,
        shop_id: Ulid,
        provider_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
        start: Minutes,
        notes: Option<String>,
    ) -> Result<Appointment, EngineError> {
        let shop = self
            .directory
            .shop(shop_id)
            .ok_or(EngineError::NotFound(shop_id))
            .map_err(reject)?;
        let provider = self
            .directory
            .provider(provider_id)
            .ok_or(EngineError::NotFound(provider_id))
            .map_err(reject)?;
        let service = self
            .directory
            .service(service_id)
            .ok_or(EngineError::NotFound(service_id))
            .map_err(reject)?;

        if provider.shop_id != shop_id {
            return Err(reject(EngineError::Validation(
                "provider does not work at this shop",
            )));
        }
        if service.duration_minutes == 0 {
            return Err(reject(EngineError::Validation("service duration is zero")));
        }

        let end = start
            .checked_add(service.duration_minutes)
            .ok_or(EngineError::Validation("slot end overflows the day"))
            .map_err(reject)?;
        let slot = Slot { start, end };
        validate_slot(&slot).map_err(reject)?;

        let window = day_window(&shop.hours, Some(&provider), date)
            .map_err(window_error)
            .map_err(reject)?;
        if !window.contains(&slot) {
            return Err(reject(EngineError::OutOfHours));
        }

        let calendar = self.calendar(provider_id);
        let mut guard = calendar.write().await;
        check_no_conflict(&guard, date, &slot, None).map_err(reject)?;

        let appt = Appointment {
            id: Ulid::new(),
            customer_id,
            provider_id,
            shop_id,
            service_id,
            date,
            slot,
            status: AppointmentStatus::Pending,
            notes,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
        };

        // First attempt, then one retry after resync if another writer won.
        match self.store.insert(&appt).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                metrics::counter!(crate::observability::STORE_RACES_TOTAL).increment(1);
                self.resync_calendar(&mut guard).await?;
                check_no_conflict(&guard, date, &slot, None).map_err(reject)?;
                match self.store.insert(&appt).await {
                    Ok(()) => {}
                    Err(StoreError::Conflict(winner)) => {
                        return Err(reject(EngineError::SlotUnavailable(Some(winner))));
                    }
                    Err(e) => return Err(reject(EngineError::Store(e.to_string()))),
                }
            }
            Err(e) => return Err(reject(EngineError::Store(e.to_string()))),
        }

        self.apply(&mut guard, appt.clone());
        drop(guard);

        self.notify.send(
            provider_id,
            &BookingEvent::Created {
                appointment: appt.clone(),
            },
        );
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(
            appointment = %appt.id,
            provider = %provider_id,
            date = %date,
            slot = %crate::timeutil::format_hhmm(slot.start),
            "booking created"
        );
        Ok(appt)
    }

    /// Move an active appointment to a new date/start. The appointment
    /// returns to `pending` and must be re-confirmed. Atomic: on any
    /// failure the appointment keeps its previous interval.
    pub async fn reschedule_booking(
        &self,
        appointment_id: Ulid,
        new_date: NaiveDate,
        new_start: Minutes,
    ) -> Result<Appointment, EngineError> {
        let provider_id = self
            .provider_for_appointment(appointment_id)
            .ok_or(EngineError::NotFound(appointment_id))
            .map_err(reject)?;
        let calendar = self.calendar(provider_id);
        let mut guard = calendar.write().await;

        for attempt in 0..2 {
            let current = guard
                .get(appointment_id)
                .ok_or(EngineError::NotFound(appointment_id))
                .map_err(reject)?
                .clone();

            let next = next_status(current.status, BookingAction::Reschedule).map_err(reject)?;

            let shop = self
                .directory
                .shop(current.shop_id)
                .ok_or(EngineError::NotFound(current.shop_id))
                .map_err(reject)?;
            let provider = self
                .directory
                .provider(provider_id)
                .ok_or(EngineError::NotFound(provider_id))
                .map_err(reject)?;
            let service = self
                .directory
                .service(current.service_id)
                .ok_or(EngineError::NotFound(current.service_id))
                .map_err(reject)?;

            let end = new_start
                .checked_add(service.duration_minutes)
                .ok_or(EngineError::Validation("slot end overflows the day"))
                .map_err(reject)?;
            let slot = Slot {
                start: new_start,
                end,
            };
            validate_slot(&slot).map_err(reject)?;

            let window = day_window(&shop.hours, Some(&provider), new_date)
                .map_err(window_error)
                .map_err(reject)?;
            if !window.contains(&slot) {
                return Err(reject(EngineError::OutOfHours));
            }

            // Conflict check excludes the appointment being moved.
            check_no_conflict(&guard, new_date, &slot, Some(appointment_id)).map_err(reject)?;

            let mut updated = current.clone();
            updated.date = new_date;
            updated.slot = slot;
            updated.status = next;
            updated.version = current.version + 1;

            match self
                .store
                .compare_and_swap(appointment_id, current.version, &updated)
                .await
            {
                Ok(()) => {
                    self.apply(&mut guard, updated.clone());
                    drop(guard);
                    self.notify.send(
                        provider_id,
                        &BookingEvent::Rescheduled {
                            appointment: updated.clone(),
                            previous_date: current.date,
                            previous_slot: current.slot,
                        },
                    );
                    metrics::counter!(crate::observability::BOOKINGS_RESCHEDULED_TOTAL)
                        .increment(1);
                    info!(
                        appointment = %appointment_id,
                        provider = %provider_id,
                        date = %new_date,
                        slot = %crate::timeutil::format_hhmm(slot.start),
                        "booking rescheduled"
                    );
                    return Ok(updated);
                }
                Err(StoreError::VersionMismatch { .. }) | Err(StoreError::Conflict(_))
                    if attempt == 0 =>
                {
                    // Another process moved first. Resync and re-run the
                    // checks once against what it committed.
                    metrics::counter!(crate::observability::STORE_RACES_TOTAL).increment(1);
                    self.resync_calendar(&mut guard).await?;
                }
                Err(StoreError::VersionMismatch { .. }) | Err(StoreError::Conflict(_)) => {
                    return Err(reject(EngineError::SlotUnavailable(None)));
                }
                Err(e) => return Err(reject(EngineError::Store(e.to_string()))),
            }
        }
        unreachable!("reschedule loop exits by return");
    }

    /// Apply a lifecycle action. All status changes go through the
    /// transition table; the per-appointment version stamp makes the commit
    /// optimistic against concurrent transitions.
    pub async fn transition(
        &self,
        appointment_id: Ulid,
        action: BookingAction,
        actor: ActorRole,
        now: NaiveDateTime,
        reason: Option<String>,
    ) -> Result<Appointment, EngineError> {
        if matches!(action, BookingAction::Reschedule) {
            return Err(reject(EngineError::Validation(
                "reschedule requires a new interval; use reschedule_booking",
            )));
        }

        let provider_id = self
            .provider_for_appointment(appointment_id)
            .ok_or(EngineError::NotFound(appointment_id))
            .map_err(reject)?;
        let calendar = self.calendar(provider_id);
        let mut guard = calendar.write().await;

        for attempt in 0..2 {
            let current = guard
                .get(appointment_id)
                .ok_or(EngineError::NotFound(appointment_id))
                .map_err(reject)?
                .clone();

            let from = current.status;
            let next = next_status(from, action).map_err(reject)?;
            check_guards(&current, action, actor, now).map_err(reject)?;

            let mut updated = current.clone();
            updated.status = next;
            updated.version = current.version + 1;

            if matches!(action, BookingAction::Cancel) {
                let shop = self
                    .directory
                    .shop(current.shop_id)
                    .ok_or(EngineError::NotFound(current.shop_id))
                    .map_err(reject)?;
                can_cancel(&current, actor, now, shop.cancellation_cutoff_hours)
                    .map_err(reject)?;
                // Staff-side cancellations must say why; the reason lands on
                // the appointment either way.
                if !matches!(actor, ActorRole::Customer)
                    && reason.as_deref().map_or(true, |r| r.trim().is_empty())
                {
                    return Err(reject(EngineError::Validation(
                        "cancellation reason required",
                    )));
                }
                updated.cancelled_by = Some(actor);
                updated.cancel_reason = reason.clone();
            }

            match self
                .store
                .compare_and_swap(appointment_id, current.version, &updated)
                .await
            {
                Ok(()) => {
                    self.apply(&mut guard, updated.clone());
                    drop(guard);
                    self.notify.send(
                        provider_id,
                        &BookingEvent::Transitioned {
                            appointment: updated.clone(),
                            from,
                            to: next,
                        },
                    );
                    metrics::counter!(
                        crate::observability::TRANSITIONS_TOTAL,
                        "action" => action.label()
                    )
                    .increment(1);
                    info!(
                        appointment = %appointment_id,
                        from = from.label(),
                        to = next.label(),
                        actor = actor.label(),
                        "transition committed"
                    );
                    return Ok(updated);
                }
                Err(StoreError::VersionMismatch { .. }) if attempt == 0 => {
                    metrics::counter!(crate::observability::STORE_RACES_TOTAL).increment(1);
                    self.resync_calendar(&mut guard).await?;
                }
                Err(StoreError::VersionMismatch { .. }) => {
                    return Err(reject(EngineError::SlotUnavailable(None)));
                }
                Err(e) => return Err(reject(EngineError::Store(e.to_string()))),
            }
        }
        unreachable!("transition loop exits by return");
    }
}
