use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minute-of-day — the only intra-day time type. `0` is midnight, `1440`
/// the exclusive end of the day. Times are never compared as strings.
pub type Minutes = u16;

/// Exclusive upper bound for minute-of-day values.
pub const MINUTES_PER_DAY: Minutes = 1440;

/// Half-open booking interval `[start, end)` in minutes-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub start: Minutes,
    pub end: Minutes,
}

impl Slot {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &Slot) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Per-weekday open intervals, indexed Monday = 0. A `None` entry is a
/// closed day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours(pub [Option<Slot>; 7]);

impl BusinessHours {
    /// Same open interval every day of the week.
    pub fn uniform(open: Slot) -> Self {
        Self([Some(open); 7])
    }

    pub fn closed() -> Self {
        Self([None; 7])
    }

    pub fn open_on(&self, date: NaiveDate) -> Option<Slot> {
        self.0[crate::timeutil::weekday_index(date)]
    }

    pub fn with_day(mut self, weekday_index: usize, open: Option<Slot>) -> Self {
        self.0[weekday_index] = open;
        self
    }
}

/// Provider unavailability over whole days, `[start, end]` inclusive.
/// Overrides business hours for every covered date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LeaveRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "LeaveRange start must not follow end");
        Self { start, end }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A bookable service. Immutable for scheduling purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub category: Option<String>,
    /// Always > 0; enforced by the directory at registration.
    pub duration_minutes: Minutes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: Ulid,
    pub name: String,
    pub hours: BusinessHours,
    /// Minimum lead time before an appointment's start after which a
    /// customer may no longer self-cancel. Per-shop configuration with no
    /// universal default.
    pub cancellation_cutoff_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Ulid,
    pub shop_id: Ulid,
    pub name: String,
    /// `None` means the provider works the shop's hours unmodified.
    pub hours: Option<BusinessHours>,
    pub leaves: Vec<LeaveRange>,
}

impl Provider {
    pub fn on_leave(&self, date: NaiveDate) -> bool {
        self.leaves.iter().any(|l| l.covers(date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Active appointments count toward conflict checks.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Provider,
    Staff,
    System,
}

impl ActorRole {
    pub fn label(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Provider => "provider",
            ActorRole::Staff => "staff",
            ActorRole::System => "system",
        }
    }
}

/// Lifecycle actions accepted by `Engine::transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Confirm,
    Complete,
    MarkNoShow,
    Cancel,
    /// Moves the interval and resets the status to pending. Not accepted by
    /// `Engine::transition` — it needs the new interval, so it has its own
    /// operation (`reschedule_booking`) — but it shares the transition table.
    Reschedule,
}

impl BookingAction {
    pub fn label(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Complete => "complete",
            BookingAction::MarkNoShow => "mark_no_show",
            BookingAction::Cancel => "cancel",
            BookingAction::Reschedule => "reschedule",
        }
    }
}

/// One booked appointment. Never deleted — terminal statuses are history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub provider_id: Ulid,
    pub shop_id: Ulid,
    pub service_id: Ulid,
    pub date: NaiveDate,
    pub slot: Slot,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancelled_by: Option<ActorRole>,
    pub cancel_reason: Option<String>,
    /// Monotonically increasing stamp for optimistic concurrency. Bumped on
    /// every committed mutation.
    pub version: u64,
}

impl Appointment {
    /// The appointment's start as a wall-clock instant.
    pub fn start_instant(&self) -> NaiveDateTime {
        crate::timeutil::instant(self.date, self.slot.start)
    }

    pub fn end_instant(&self) -> NaiveDateTime {
        crate::timeutil::instant(self.date, self.slot.end)
    }
}

/// Notification record broadcast per provider. Fire-and-forget; the engine
/// never awaits listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    Created {
        appointment: Appointment,
    },
    Rescheduled {
        appointment: Appointment,
        previous_date: NaiveDate,
        previous_slot: Slot,
    },
    Transitioned {
        appointment: Appointment,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

impl BookingEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            BookingEvent::Created { appointment }
            | BookingEvent::Rescheduled { appointment, .. }
            | BookingEvent::Transitioned { appointment, .. } => appointment,
        }
    }
}

/// A provider's appointment book, sorted by `(date, slot.start)`.
#[derive(Debug, Clone)]
pub struct ProviderCalendar {
    pub provider_id: Ulid,
    pub appointments: Vec<Appointment>,
}

impl ProviderCalendar {
    pub fn new(provider_id: Ulid) -> Self {
        Self {
            provider_id,
            appointments: Vec::new(),
        }
    }

    /// Insert maintaining sort order by `(date, slot.start)`.
    pub fn insert(&mut self, appt: Appointment) {
        let key = (appt.date, appt.slot.start);
        let pos = self
            .appointments
            .binary_search_by_key(&key, |a| (a.date, a.slot.start))
            .unwrap_or_else(|e| e);
        self.appointments.insert(pos, appt);
    }

    /// Remove by id, returning the appointment if present. Used to re-insert
    /// at a new position (reschedule, resync) — appointments are never
    /// dropped from history.
    pub fn remove(&mut self, id: Ulid) -> Option<Appointment> {
        if let Some(pos) = self.appointments.iter().position(|a| a.id == id) {
            Some(self.appointments.remove(pos))
        } else {
            None
        }
    }

    pub fn get(&self, id: Ulid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Appointments on `date`, in start order. Binary search skips the
    /// other days entirely.
    pub fn on_date(&self, date: NaiveDate) -> &[Appointment] {
        let lo = self.appointments.partition_point(|a| a.date < date);
        let hi = self.appointments.partition_point(|a| a.date <= date);
        &self.appointments[lo..hi]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn appt(date: &str, start: Minutes, end: Minutes) -> Appointment {
        Appointment {
            id: Ulid::new(),
            customer_id: Ulid::new(),
            provider_id: Ulid::new(),
            shop_id: Ulid::new(),
            service_id: Ulid::new(),
            date: d(date),
            slot: Slot::new(start, end),
            status: AppointmentStatus::Pending,
            notes: None,
            cancelled_by: None,
            cancel_reason: None,
            version: 1,
        }
    }

    #[test]
    fn slot_overlap_half_open() {
        let a = Slot::new(600, 630);
        let b = Slot::new(630, 660);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Slot::new(629, 631)));
    }

    #[test]
    fn leave_range_inclusive_both_ends() {
        let leave = LeaveRange::new(d("2026-03-02"), d("2026-03-04"));
        assert!(leave.covers(d("2026-03-02")));
        assert!(leave.covers(d("2026-03-04")));
        assert!(!leave.covers(d("2026-03-05")));
    }

    #[test]
    fn calendar_on_date_windows_by_binary_search() {
        let mut cal = ProviderCalendar::new(Ulid::new());
        cal.insert(appt("2026-03-03", 600, 630));
        cal.insert(appt("2026-03-02", 540, 570));
        cal.insert(appt("2026-03-03", 540, 570));
        cal.insert(appt("2026-03-04", 540, 570));

        let day = cal.on_date(d("2026-03-03"));
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].slot.start, 540);
        assert_eq!(day[1].slot.start, 600);
    }

    #[test]
    fn calendar_insert_keeps_start_order_within_day() {
        let mut cal = ProviderCalendar::new(Ulid::new());
        cal.insert(appt("2026-03-03", 660, 690));
        cal.insert(appt("2026-03-03", 540, 570));
        cal.insert(appt("2026-03-03", 600, 630));
        let starts: Vec<_> = cal.on_date(d("2026-03-03")).iter().map(|a| a.slot.start).collect();
        assert_eq!(starts, vec![540, 600, 660]);
    }
}
