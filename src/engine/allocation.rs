use std::time::Instant;

use tracing::{debug, warn};

use crate::model::*;

use super::catalog::Catalog;
use super::conflict::{find_conflict, ActiveEntry};
use super::store::ReservationStore;

// ── Refresh: sweep + displacement to a fixpoint ──────────────────

/// Re-establish the capacity invariant over the whole schedule.
///
/// Single left-to-right sweep over `store`. `active` holds accepted
/// reservations still overlapping the sweep position, ordered by end so
/// expired ones drop off the front. A reservation that conflicts with an
/// active entry is moved to start the day after that entry ends (same
/// length), re-inserted in sorted order, and the same position is evaluated
/// again. Every move strictly increases a start date, so the loop terminates.
///
/// Never shrinks or drops a reservation. Running it on its own output is a no-op.
pub fn refresh(store: &mut ReservationStore, catalog: &Catalog) -> RefreshReport {
    let started = Instant::now();
    let mut report = RefreshReport::default();
    let mut active: Vec<ActiveEntry<'_>> = Vec::new();
    let mut i = 0usize;

    while let Some(id) = store.id_at(i) {
        let Some(current) = store.get(id) else {
            i += 1;
            continue;
        };
        let stay = current.stay;
        let Some(demand) = catalog.demand(&current.location, &current.optionals) else {
            warn!(%id, location = %current.location, "reservation at unknown location left unchecked");
            i += 1;
            continue;
        };

        // Entries that ended before this start can't overlap it or anything after it.
        let expired = active.partition_point(|a| a.stay.end < stay.start);
        active.drain(..expired);

        let Some(blocker) = find_conflict(&stay, &demand, &active) else {
            let pos = active.partition_point(|a| a.stay.end <= stay.end);
            active.insert(pos, ActiveEntry { id, stay, demand });
            i += 1;
            continue;
        };

        let blocked_by = active[blocker].id;
        match stay.shifted_after(&active[blocker].stay) {
            Some(to) => {
                debug!(%id, from = %stay, %to, %blocked_by, "displacing reservation");
                store.reschedule(id, to);
                report.displacements.push(Displacement { id, from: stay, to, blocked_by });
            }
            None => {
                warn!(%id, %stay, %blocked_by, "no later date available; reservation left in place");
                let pos = active.partition_point(|a| a.stay.end <= stay.end);
                active.insert(pos, ActiveEntry { id, stay, demand });
                i += 1;
            }
        }
    }

    metrics::histogram!(crate::observability::REFRESH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    metrics::counter!(crate::observability::DISPLACEMENTS_TOTAL)
        .increment(report.displacements.len() as u64);
    report
}
