//! Hard limits enforced at the manager boundary.

/// Longest accepted resource or location name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

pub const MAX_RESOURCES: usize = 10_000;

pub const MAX_LOCATIONS: usize = 10_000;

pub const MAX_RESERVATIONS: usize = 100_000;

/// Longest bookable stay, in days (both endpoints counted).
pub const MAX_STAY_DAYS: u64 = 3_660;

/// Bookings must end on or before the last day of this year.
pub const LATEST_BOOKABLE_YEAR: i32 = 9999;
