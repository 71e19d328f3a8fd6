pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod query;
pub mod repositories;
pub mod wiring;

pub use connection::{connect, connect_in_memory, connect_with_settings, DbPool};
pub use fixtures::{DemoCatalog, SeedResult, VerificationResult};
pub use wiring::{in_memory_ports, sqlite_ports};
