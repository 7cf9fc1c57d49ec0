pub mod config;
pub mod error;
pub mod migration;
pub mod result;

pub use config::{DatabaseConfig, SslMode};
pub use error::{DbInitError, Result};
pub use migration::{MigrationPlan, MigrationStep, StepKind};
pub use result::{ApplyFailure, ApplyStatus, FailureKind, ProvisionResponse, SchemaApplyResult};
