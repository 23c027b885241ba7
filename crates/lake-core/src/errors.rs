//! Errores del core (configuración, compatibilidad de formatos, registro).

use lake_domain::DomainError;
use polars::prelude::PolarsError;
use thiserror::Error;
use uuid::Uuid;

/// Errores devueltos por cualquier backend de `Registry`. Los backends
/// concretos (SQLite, in-memory) mapean sus errores nativos a estas
/// variantes semánticas.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no se encontró el registro")]
    NotFound,
    #[error("la consulta devolvió más de un registro")]
    MultipleResults,
    #[error("conflicto de unicidad: {0}")]
    Conflict(String),
    #[error("error del backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Error de configuración: ingesta en memoria sin nombre.
    #[error("Pase un nombre al ingerir datos en memoria")]
    MissingName,

    /// Error de configuración: tracking explícito sin run disponible.
    #[error("No hay contexto de run. Cree uno con RunContext::track() o enlace el input vía Registry::link_run_input")]
    MissingRunContext,

    /// El sufijo del objeto es incompatible con el modo de acceso pedido.
    #[error("El sufijo {suffix} no soporta la operación {operation}")]
    SuffixNotSupported { suffix: String, operation: &'static str },

    /// No existe codec para el sufijo/formato.
    #[error("Sin codec para {0}")]
    NotImplemented(String),

    /// Solo bajo `DuplicatePolicy::Reject`: el hash ya está registrado.
    #[error("Objeto duplicado: el hash {hash} ya está registrado como {existing}")]
    Duplicate { hash: String, existing: Uuid },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tabular: {0}")]
    Table(#[from] PolarsError),

    #[error("serialización: {0}")]
    Serde(#[from] serde_json::Error),
}
