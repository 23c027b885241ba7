use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// Raíz de storage donde viven los objetos (directorio local de la
/// instancia). Los objetos se guardan bajo `root/{storage_key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRoot {
    id: Uuid,
    root: String,
    created_at: DateTime<Utc>,
}

impl StorageRoot {
    pub fn new(root: &str) -> Result<Self, DomainError> {
        Self::from_parts(Uuid::new_v4(), root, Utc::now())
    }

    pub fn from_parts(id: Uuid, root: &str, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
        if root.trim().is_empty() {
            return Err(DomainError::ValidationError("Raíz de storage vacía".to_string()));
        }
        Ok(StorageRoot { id,
                         root: root.to_string(),
                         created_at })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn root(&self) -> &str { &self.root }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
}
