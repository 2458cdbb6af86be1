use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// Reject slots a storage layer could not even represent: out-of-range
/// minutes or an empty interval.
pub(crate) fn validate_slot(slot: &Slot) -> Result<(), EngineError> {
    if slot.end > MINUTES_PER_DAY {
        return Err(EngineError::Validation("slot end past end of day"));
    }
    if slot.start >= slot.end {
        return Err(EngineError::Validation("slot start must precede end"));
    }
    Ok(())
}

/// Find an active appointment for the same date whose interval overlaps
/// `slot`. Two half-open intervals conflict iff `s1 < e2 && s2 < e1`;
/// adjacent intervals never conflict. `exclude` lets reschedule ignore the
/// appointment being moved. Terminal statuses are history and never block.
pub fn find_conflict<'a>(
    appointments: &'a [Appointment],
    date: NaiveDate,
    slot: &Slot,
    exclude: Option<Ulid>,
) -> Option<&'a Appointment> {
    appointments.iter().find(|a| {
        a.date == date
            && a.status.is_active()
            && Some(a.id) != exclude
            && a.slot.overlaps(slot)
    })
}

pub fn has_conflict(
    appointments: &[Appointment],
    date: NaiveDate,
    slot: &Slot,
    exclude: Option<Ulid>,
) -> bool {
    find_conflict(appointments, date, slot, exclude).is_some()
}

/// Conflict check against a provider calendar, windowed to the date via
/// binary search.
pub(crate) fn check_no_conflict(
    calendar: &ProviderCalendar,
    date: NaiveDate,
    slot: &Slot,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match find_conflict(calendar.on_date(date), date, slot, exclude) {
        Some(existing) => Err(EngineError::SlotUnavailable(Some(existing.id))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppointmentStatus, Slot};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn appt(date: &str, start: Minutes, end: Minutes, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Ulid::new(),
            customer_id: Ulid::new(),
            provider_id: Ulid::new(),
            shop_id: Ulid::new(),
            service_id: Ulid::new(),
            date: d(date),
            slot: Slot::new(start, end),
            status,
            notes: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
        }
    }

    #[test]
    fn adjacent_slots_do_not_conflict() {
        // [10:00, 10:30) then [10:30, 11:00)
        let existing = vec![appt("2026-03-02", 600, 630, AppointmentStatus::Confirmed)];
        assert!(!has_conflict(&existing, d("2026-03-02"), &Slot::new(630, 660), None));
    }

    #[test]
    fn overlapping_slot_conflicts() {
        let existing = vec![appt("2026-03-02", 600, 630, AppointmentStatus::Confirmed)];
        assert!(has_conflict(&existing, d("2026-03-02"), &Slot::new(615, 645), None));
        assert!(has_conflict(&existing, d("2026-03-02"), &Slot::new(600, 630), None));
        assert!(has_conflict(&existing, d("2026-03-02"), &Slot::new(570, 601), None));
    }

    #[test]
    fn other_date_never_conflicts() {
        let existing = vec![appt("2026-03-02", 600, 630, AppointmentStatus::Pending)];
        assert!(!has_conflict(&existing, d("2026-03-03"), &Slot::new(600, 630), None));
    }

    #[test]
    fn terminal_statuses_do_not_block() {
        let existing = vec![
            appt("2026-03-02", 600, 630, AppointmentStatus::Cancelled),
            appt("2026-03-02", 600, 630, AppointmentStatus::Completed),
            appt("2026-03-02", 600, 630, AppointmentStatus::NoShow),
        ];
        assert!(!has_conflict(&existing, d("2026-03-02"), &Slot::new(600, 630), None));
    }

    #[test]
    fn exclude_skips_self() {
        let a = appt("2026-03-02", 600, 630, AppointmentStatus::Confirmed);
        let id = a.id;
        let existing = vec![a];
        assert!(!has_conflict(&existing, d("2026-03-02"), &Slot::new(600, 630), Some(id)));
        assert!(has_conflict(&existing, d("2026-03-02"), &Slot::new(600, 630), Some(Ulid::new())));
    }

    #[test]
    fn find_conflict_returns_the_blocking_appointment() {
        let a = appt("2026-03-02", 600, 630, AppointmentStatus::Pending);
        let id = a.id;
        let existing = vec![a];
        let hit = find_conflict(&existing, d("2026-03-02"), &Slot::new(620, 650), None);
        assert_eq!(hit.map(|a| a.id), Some(id));
    }

    #[test]
    fn validate_slot_rejects_bad_input() {
        assert!(validate_slot(&Slot { start: 600, end: 600 }).is_err());
        assert!(validate_slot(&Slot { start: 630, end: 600 }).is_err());
        assert!(validate_slot(&Slot { start: 1400, end: 1441 }).is_err());
        assert!(validate_slot(&Slot::new(1410, 1440)).is_ok());
    }
}
