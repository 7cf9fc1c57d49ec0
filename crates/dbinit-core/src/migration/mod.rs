//! Migration step model.
//!
//! A plan is an ordered list of classified DDL statements. Each statement is
//! tagged with the kind of object it touches and whether it guards itself
//! against prior existence, so a plan can be checked for idempotency without
//! a database.

mod plan;
mod split;
mod step;

pub use plan::MigrationPlan;
pub use split::split_statements;
pub use step::{MigrationStep, StepKind};
