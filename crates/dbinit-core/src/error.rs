use thiserror::Error;

/// Core error type for schema provisioning.
#[derive(Error, Debug)]
pub enum DbInitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration step '{step}' failed: {message}")]
    DdlExecution { step: String, message: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Rollback error: {0}")]
    Rollback(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Release error: {0}")]
    Release(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

impl DbInitError {
    /// Build a step failure from the label of the step that failed.
    pub fn ddl(step: impl Into<String>, message: impl Into<String>) -> Self {
        DbInitError::DdlExecution {
            step: step.into(),
            message: message.into(),
        }
    }

    /// The underlying message without the variant prefix.
    ///
    /// Results carry this text so callers see the engine's own wording.
    pub fn message(&self) -> String {
        match self {
            DbInitError::Config(m)
            | DbInitError::Connection(m)
            | DbInitError::Transaction(m)
            | DbInitError::Rollback(m)
            | DbInitError::Catalog(m)
            | DbInitError::Release(m) => m.clone(),
            DbInitError::DdlExecution { message, .. } => message.clone(),
            DbInitError::Sql(e) => e.to_string(),
        }
    }
}

/// Result type alias using DbInitError.
pub type Result<T> = std::result::Result<T, DbInitError>;
