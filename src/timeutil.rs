//! Weekday and interval arithmetic on minute-of-day integers.
//!
//! All comparisons are integer comparisons. Clock strings are parsed once at
//! the configuration edge via [`parse_hhmm`] and never compared as text —
//! `"9:00" > "09:00"` lexicographically, which is exactly the bug class this
//! module exists to rule out.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::model::{Minutes, Slot};

/// Weekday index for `date`, Monday = 0 .. Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Combine a calendar day and a minute-of-day into a wall-clock instant.
pub fn instant(date: NaiveDate, minute: Minutes) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight always exists for a valid NaiveDate")
        + chrono::Duration::minutes(minute as i64)
}

/// Parse `"HH:MM"` into a minute-of-day. Accepts unpadded hours (`"9:00"`).
pub fn parse_hhmm(s: &str) -> Option<Minutes> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some((h * 60 + m) as Minutes)
}

/// Render a minute-of-day as zero-padded `"HH:MM"`. Display only.
pub fn format_hhmm(minute: Minutes) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Intersection of two slots, or `None` when they don't overlap.
pub fn intersect(a: Slot, b: Slot) -> Option<Slot> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    if start < end {
        Some(Slot::new(start, end))
    } else {
        None
    }
}

/// Merge sorted overlapping/adjacent slots into disjoint slots.
pub fn merge_overlapping(sorted: &[Slot]) -> Vec<Slot> {
    let mut merged: Vec<Slot> = Vec::new();
    for &slot in sorted {
        if let Some(last) = merged.last_mut() {
            if slot.start <= last.end {
                last.end = last.end.max(slot.end);
                continue;
            }
        }
        merged.push(slot);
    }
    merged
}

/// Subtract a sorted set of slots from a sorted base set.
pub fn subtract(base: &[Slot], to_remove: &[Slot]) -> Vec<Slot> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Slot::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Slot::new(current_start, current_end));
        }
    }

    result
}
