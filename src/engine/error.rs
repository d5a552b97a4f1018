use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("start date {start} is before today ({today})")]
    PastStart { start: NaiveDate, today: NaiveDate },
    #[error("optional resource {optional} is not offered by location {location}")]
    InvalidOptional { location: String, optional: String },
    #[error("unknown location: {0}")]
    UnknownLocation(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("name already registered: {0}")]
    DuplicateName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource {0} has no capacity; nothing can be booked with it")]
    Unsatisfiable(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("persistence failure: {0}")]
    Persistence(String),
}
