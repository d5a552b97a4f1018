pub mod clock;
pub mod command;
pub mod console;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod snapshot;
