//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y los traduce
//! al `RegistryError` que consume el core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use lake_core::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("base de datos ocupada (retryable)")]
    Busy,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("fila corrupta: {0}")]
    CorruptRow(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                other => {
                    let msg = info.message().to_string();
                    if msg.contains("database is locked") {
                        Self::Busy
                    } else {
                        Self::Unknown(format!("db error kind {:?}: {}", other, msg))
                    }
                }
            },
            DieselError::DeserializationError(e) => Self::CorruptRow(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for RegistryError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => RegistryError::NotFound,
            PersistenceError::UniqueViolation(msg) => RegistryError::Conflict(msg),
            other => RegistryError::Backend(other.to_string()),
        }
    }
}
