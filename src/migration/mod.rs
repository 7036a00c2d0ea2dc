//! Migration module: reading a key from one store and writing it to another

pub mod engine;
pub mod record;

pub use engine::{CopyOutcome, CopyReport, MigrationEngine};
pub use record::{KeyRecord, Kind, Payload};
