use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of whole calendar days `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stay {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Stay {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "Stay start must not be after end");
        Self { start, end }
    }

    /// Number of billable days; both endpoints count.
    pub fn days(&self) -> u64 {
        self.length() + 1
    }

    /// `end - start` in days. Displacement keeps this fixed.
    pub fn length(&self) -> u64 {
        (self.end - self.start).num_days().max(0) as u64
    }

    pub fn overlaps(&self, other: &Stay) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Same length, starting the day after `other` ends.
    /// `None` if that would run past the last representable date.
    pub fn shifted_after(&self, other: &Stay) -> Option<Stay> {
        let start = other.end.succ_opt()?;
        let end = start.checked_add_days(Days::new(self.length()))?;
        Some(Stay { start, end })
    }
}

impl fmt::Display for Stay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Reservation identifier, issued from a monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub u64);

impl ReservationId {
    pub const FIRST: ReservationId = ReservationId(1);

    /// `None` once the id space is used up.
    pub fn next(self) -> Option<ReservationId> {
        self.0.checked_add(1).map(ReservationId)
    }
}

/// Rendered as the human-facing code, e.g. `RES-007`.
impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RES-{:03}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid reservation id: {0}")]
pub struct InvalidReservationId(pub String);

/// Accepts both `RES-12` and a bare `12`.
impl FromStr for ReservationId {
    type Err = InvalidReservationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("RES-")
            .or_else(|| trimmed.strip_prefix("res-"))
            .unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(ReservationId)
            .map_err(|_| InvalidReservationId(s.to_string()))
    }
}

/// A shared, capacity-limited item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    /// Max reservations consuming one unit at the same time.
    pub capacity: u32,
    pub unit_price: u64,
}

/// A bookable place. Every reservation here consumes `required`;
/// `optional` is the menu a reservation may pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub base_price: u64,
    #[serde(default)]
    pub required: BTreeSet<String>,
    #[serde(default)]
    pub optional: BTreeSet<String>,
}

impl Location {
    pub fn offers(&self, resource: &str) -> bool {
        self.optional.contains(resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    #[serde(flatten)]
    pub stay: Stay,
    pub location: String,
    #[serde(default)]
    pub optionals: BTreeSet<String>,
}

/// What a caller asks for. Dates are unchecked until the manager validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub location: String,
    pub optionals: BTreeSet<String>,
}

impl ReservationRequest {
    pub fn new(start: NaiveDate, end: NaiveDate, location: impl Into<String>) -> Self {
        Self {
            start,
            end,
            location: location.into(),
            optionals: BTreeSet::new(),
        }
    }

    pub fn with_optional(mut self, resource: impl Into<String>) -> Self {
        self.optionals.insert(resource.into());
        self
    }
}

// ── Query result types ───────────────────────────────────────────

/// One forward move made by the allocation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displacement {
    pub id: ReservationId,
    pub from: Stay,
    pub to: Stay,
    /// The active reservation whose end the moved one now follows.
    pub blocked_by: ReservationId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub displacements: Vec<Displacement>,
}

impl RefreshReport {
    pub fn is_converged(&self) -> bool {
        self.displacements.is_empty()
    }

    /// Ids moved at least once, in first-move order.
    pub fn moved_ids(&self) -> Vec<ReservationId> {
        let mut ids = Vec::new();
        for d in &self.displacements {
            if !ids.contains(&d.id) {
                ids.push(d.id);
            }
        }
        ids
    }
}

/// Outcome of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: ReservationId,
    pub requested: Stay,
    pub placed: Stay,
    /// Other reservations the sweep had to move to make room.
    pub others_moved: Vec<ReservationId>,
}

impl Placement {
    pub fn was_shifted(&self) -> bool {
        self.requested != self.placed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub required: BTreeSet<String>,
    pub price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Required,
    Optional,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Required => f.write_str("required"),
            Relation::Optional => f.write_str("optional"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDetails {
    pub location: Location,
    pub relations: Vec<(String, Relation)>,
    pub reservations: usize,
}

/// Everything a catalog deletion took with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub removed_locations: Vec<String>,
    pub removed_reservations: Vec<ReservationId>,
    /// Reservations that lost a selected optional.
    pub stripped_reservations: Vec<ReservationId>,
}

impl CascadeReport {
    pub fn absorb(&mut self, other: CascadeReport) {
        self.removed_locations.extend(other.removed_locations);
        self.removed_reservations.extend(other.removed_reservations);
        self.stripped_reservations.extend(other.stripped_reservations);
    }
}
