mod applier;
mod builtin;
mod session;

pub use applier::SchemaApplier;
pub use builtin::{user_schema_plan, USER_SCHEMA_SOURCES};
pub use session::{SchemaSession, SessionFuture};
