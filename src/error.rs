use thiserror::Error;

/// Persistence failure surfaced to callers of the session manager and the
/// importer. The cause is flattened into `reason` with its context chain.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {operation}: {reason}")]
    Write {
        operation: &'static str,
        reason: String,
    },

    #[error("failed to {operation}: {reason}")]
    Read {
        operation: &'static str,
        reason: String,
    },

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    #[error("no workout is in progress")]
    NoActiveWorkout,

    #[error("{entity} `{id}` is not part of the active workout")]
    NotInActiveWorkout { entity: &'static str, id: String },
}

impl StorageError {
    pub fn write(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |err| {
            log::error!("failed to {operation}: {err:#}");
            StorageError::Write {
                operation,
                reason: format!("{err:#}"),
            }
        }
    }

    pub fn read(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |err| {
            log::error!("failed to {operation}: {err:#}");
            StorageError::Read {
                operation,
                reason: format!("{err:#}"),
            }
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn not_in_active_workout(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotInActiveWorkout {
            entity,
            id: id.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
