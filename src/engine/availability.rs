use chrono::NaiveDate;

use crate::model::*;
use crate::timeutil;

use super::conflict::has_conflict;

/// Default walk step between candidate slot starts, in minutes.
pub const DEFAULT_SLOT_STEP: Minutes = 30;

/// Why a day produced no candidates at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedReason {
    ShopClosed,
    ProviderOnLeave,
    /// Shop and provider hours exist but do not intersect on this weekday.
    OutsideProviderHours,
}

impl ClosedReason {
    pub fn label(&self) -> &'static str {
        match self {
            ClosedReason::ShopClosed => "shop_closed",
            ClosedReason::ProviderOnLeave => "provider_on_leave",
            ClosedReason::OutsideProviderHours => "outside_provider_hours",
        }
    }
}

/// Engine-level availability result: ordered open slots, plus the reason
/// when the whole day is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    pub slots: Vec<Slot>,
    pub closed: Option<ClosedReason>,
}

impl DayAvailability {
    pub fn closed(reason: ClosedReason) -> Self {
        Self {
            slots: Vec::new(),
            closed: Some(reason),
        }
    }
}

/// Resolve the bookable window for one date: shop hours, intersected with
/// provider hours when the provider declares their own, rejected outright
/// when the date falls in a leave range.
pub fn day_window(
    shop_hours: &BusinessHours,
    provider: Option<&Provider>,
    date: NaiveDate,
) -> Result<Slot, ClosedReason> {
    let shop_open = shop_hours.open_on(date).ok_or(ClosedReason::ShopClosed)?;

    let Some(provider) = provider else {
        return Ok(shop_open);
    };
    if provider.on_leave(date) {
        return Err(ClosedReason::ProviderOnLeave);
    }
    match &provider.hours {
        None => Ok(shop_open),
        Some(hours) => {
            let own = hours.open_on(date).ok_or(ClosedReason::OutsideProviderHours)?;
            timeutil::intersect(shop_open, own).ok_or(ClosedReason::OutsideProviderHours)
        }
    }
}

/// Lazy walk over candidate slots within a window. Finite, ascending, and
/// non-restartable; every call to [`slots`] recomputes from the snapshot it
/// is given, so there is no hidden state between invocations.
pub struct SlotIter<'a> {
    window: Slot,
    duration: Minutes,
    step: Minutes,
    cursor: Minutes,
    date: NaiveDate,
    existing: &'a [Appointment],
}

impl<'a> Iterator for SlotIter<'a> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        loop {
            let start = self.cursor;
            let end = start.checked_add(self.duration)?;
            // A slot may not spill past the window close.
            if end > self.window.end {
                return None;
            }
            self.cursor = start.checked_add(self.step)?;

            let candidate = Slot::new(start, end);
            if !has_conflict(self.existing, self.date, &candidate, None) {
                return Some(candidate);
            }
        }
    }
}

/// Candidate slots for `date` within `window`: starts every `step` minutes,
/// each `duration` long, skipping any that overlap an active appointment in
/// `existing`. `existing` is the caller's snapshot of current appointment
/// data for the provider.
pub fn slots<'a>(
    window: Slot,
    duration: Minutes,
    step: Minutes,
    date: NaiveDate,
    existing: &'a [Appointment],
) -> SlotIter<'a> {
    debug_assert!(duration > 0 && step > 0);
    SlotIter {
        window,
        duration,
        step,
        cursor: window.start,
        date,
        existing,
    }
}
