use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::model::*;

use super::catalog::Demand;
use super::ReservationError;

/// A reservation the sweep has accepted that may still overlap later ones.
pub(crate) struct ActiveEntry<'c> {
    pub id: ReservationId,
    pub stay: Stay,
    pub demand: Demand<'c>,
}

/// Check `stay`/`demand` against the active window.
///
/// `active` is ordered by end ascending; the walk goes latest-ending first.
/// Sharing the location is an immediate conflict. Otherwise each overlapping
/// entry adds one to the tally of every resource both consume, and the entry
/// that pushes a tally past its capacity is the conflict. Returns its index.
pub(crate) fn find_conflict(stay: &Stay, demand: &Demand<'_>, active: &[ActiveEntry<'_>]) -> Option<usize> {
    let mut tally: HashMap<&str, u32> = demand
        .resources
        .iter()
        .map(|r| (r.name.as_str(), 1))
        .collect();

    for (idx, entry) in active.iter().enumerate().rev() {
        if !entry.stay.overlaps(stay) {
            continue;
        }
        if entry.demand.location == demand.location {
            return Some(idx);
        }
        for resource in &entry.demand.resources {
            if let Some(count) = tally.get_mut(resource.name.as_str()) {
                *count += 1;
                if *count > resource.capacity {
                    return Some(idx);
                }
            }
        }
    }
    None
}

/// Validate a requested date range against today and the crate limits.
pub(crate) fn validate_stay(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Stay, ReservationError> {
    use crate::limits::*;
    if start > end {
        return Err(ReservationError::InvalidRange { start, end });
    }
    if start < today {
        return Err(ReservationError::PastStart { start, today });
    }
    if end.year() > LATEST_BOOKABLE_YEAR {
        return Err(ReservationError::LimitExceeded("end date too far in the future"));
    }
    let stay = Stay::new(start, end);
    if stay.days() > MAX_STAY_DAYS {
        return Err(ReservationError::LimitExceeded("stay too long"));
    }
    Ok(stay)
}
