// PostgreSQL event store for Phoenix
//
// Implements phoenix_core::EventStore on a `phoenix_events` table.
// Versions are assigned inside a transaction holding a per-stream advisory
// lock; UNIQUE (stream_id, version) and the event_id primary key back it up.

pub mod models;
pub mod postgres;

pub use models::EventRow;
pub use postgres::{PostgresEventStore, MIGRATOR};
