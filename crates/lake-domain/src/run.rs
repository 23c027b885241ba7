use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// Una ejecución computacional registrada. Consume cero o más DataObjects
/// (vía `RunInput`) y produce uno o más (vía `DataObject::run_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    id: Uuid,
    name: Option<String>,
    reference: Option<String>,
    reference_type: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl Run {
    pub fn new(name: Option<&str>,
               reference: Option<&str>,
               reference_type: Option<&str>,
               created_by: &str)
               -> Result<Self, DomainError> {
        Self::from_parts(Uuid::new_v4(), name, reference, reference_type, created_by, Utc::now())
    }

    pub fn from_parts(id: Uuid,
                      name: Option<&str>,
                      reference: Option<&str>,
                      reference_type: Option<&str>,
                      created_by: &str,
                      created_at: DateTime<Utc>)
                      -> Result<Self, DomainError> {
        // Una referencia tipada sin referencia no es reconstruible.
        if reference.is_none() && reference_type.is_some() {
            return Err(DomainError::ValidationError("reference_type sin reference".to_string()));
        }
        Ok(Run { id,
                 name: name.map(str::to_string),
                 reference: reference.map(str::to_string),
                 reference_type: reference_type.map(str::to_string),
                 created_by: created_by.to_string(),
                 created_at })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn reference(&self) -> Option<&str> { self.reference.as_deref() }
    pub fn reference_type(&self) -> Option<&str> { self.reference_type.as_deref() }
    pub fn created_by(&self) -> &str { &self.created_by }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

/// Enlace run ⟷ objeto de entrada. El par es único: volver a enlazar el mismo
/// par es un no-op (ver `Registry::link_run_input`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunInput {
    pub run_id: Uuid,
    pub data_object_id: Uuid,
}
