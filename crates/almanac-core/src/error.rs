use thiserror::Error;

use crate::calendar::CivilTimestamp;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    #[error("Rule {item_id} already has an override for the occurrence at {original}")]
    DuplicateOverride {
        item_id: i64,
        original: CivilTimestamp,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
