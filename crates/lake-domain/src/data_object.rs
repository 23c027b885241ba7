use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;
use std::fmt;

/// Sufijo de los formatos de directorio streaming (sin archivo único).
pub const STREAMING_SUFFIX: &str = ".zarr";

/// Registro central del lake: un artefacto de datos con hash de contenido,
/// ubicación en storage y procedencia (el run que lo produjo).
///
/// Invariantes:
/// - `suffix` empieza con `.` (se deriva del nombre de archivo o del tipo en
///   memoria).
/// - `hash` identifica contenido byte a byte; es `None` exactamente para el
///   sufijo streaming (`.zarr`), que no tiene archivo único que hashear.
/// - La clave de storage se deriva como `{id}{suffix}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    id: Uuid,
    name: String,
    suffix: String,
    hash: Option<String>,
    size: i64,
    storage_id: Uuid,
    run_id: Uuid,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl DataObject {
    /// Crea un registro nuevo con id y timestamp generados.
    pub fn new(name: &str,
               suffix: &str,
               hash: Option<String>,
               size: i64,
               storage_id: Uuid,
               run_id: Uuid,
               created_by: &str)
               -> Result<Self, DomainError> {
        Self::from_parts(Uuid::new_v4(), name, suffix, hash, size, storage_id, run_id, created_by, Utc::now())
    }

    /// Reconstruye un registro (p.ej. desde una fila de base de datos),
    /// revalidando invariantes.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(id: Uuid,
                      name: &str,
                      suffix: &str,
                      hash: Option<String>,
                      size: i64,
                      storage_id: Uuid,
                      run_id: Uuid,
                      created_by: &str,
                      created_at: DateTime<Utc>)
                      -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError("El nombre no puede estar vacío".to_string()));
        }
        if !suffix.is_empty() && !suffix.starts_with('.') {
            return Err(DomainError::ValidationError(format!("Sufijo inválido (debe empezar con '.'): {suffix}")));
        }
        if size < 0 {
            return Err(DomainError::ValidationError("El tamaño no puede ser negativo".to_string()));
        }
        match &hash {
            Some(h) if h.is_empty() => {
                return Err(DomainError::ValidationError("Hash vacío".to_string()));
            }
            Some(_) if suffix == STREAMING_SUFFIX => {
                return Err(DomainError::ValidationError(
                    "Los objetos streaming (.zarr) no llevan hash de archivo".to_string(),
                ));
            }
            _ => {}
        }
        Ok(DataObject { id,
                        name: name.to_string(),
                        suffix: suffix.to_string(),
                        hash,
                        size,
                        storage_id,
                        run_id,
                        created_by: created_by.to_string(),
                        created_at })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn suffix(&self) -> &str { &self.suffix }
    pub fn hash(&self) -> Option<&str> { self.hash.as_deref() }
    pub fn size(&self) -> i64 { self.size }
    pub fn storage_id(&self) -> Uuid { self.storage_id }
    pub fn run_id(&self) -> Uuid { self.run_id }
    pub fn created_by(&self) -> &str { &self.created_by }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// `true` si el objeto es un directorio streaming (sin archivo único).
    pub fn is_streaming(&self) -> bool { self.suffix == STREAMING_SUFFIX }

    /// Clave bajo la raíz de storage: `{id}{suffix}`.
    pub fn storage_key(&self) -> String { format!("{}{}", self.id.simple(), self.suffix) }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<DataObject {} name={} suffix={}>", self.id, self.name, self.suffix)
    }
}
