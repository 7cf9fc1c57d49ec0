//! Testing utilities.
//!
//! `MockDatabase` drives the applier without a server. `TestDatabase` gives
//! each test its own freshly created Postgres database.

mod db;
mod mock;

pub use db::{IsolatedTestDb, TestDatabase};
pub use mock::{MockCatalog, MockDatabase, MockSession, SessionCall};
