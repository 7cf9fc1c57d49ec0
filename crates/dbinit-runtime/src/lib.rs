pub mod db;
pub mod migrations;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use db::{connect, PgSession};
pub use migrations::{user_schema_plan, SchemaApplier, SchemaSession, SessionFuture};
