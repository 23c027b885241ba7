use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// Especie a la que pertenecen las tablas de referencia. Se crea perezosamente
/// la primera vez que una curación la menciona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    id: Uuid,
    common_name: String,
}

impl Species {
    pub fn new(common_name: &str) -> Result<Self, DomainError> {
        Self::from_parts(Uuid::new_v4(), common_name)
    }

    pub fn from_parts(id: Uuid, common_name: &str) -> Result<Self, DomainError> {
        if common_name.trim().is_empty() {
            return Err(DomainError::ValidationError("Nombre de especie vacío".to_string()));
        }
        Ok(Species { id,
                     common_name: common_name.to_string() })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn common_name(&self) -> &str { &self.common_name }
}

/// Fila de una tabla de referencia (genes, proteins o cell_markers; las tres
/// comparten esta forma). `label` es el valor del campo identificador contra
/// el que se curan los datasets; `name` viene de la fuente de conocimiento y
/// queda en `None` para labels no mapeables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    id: Uuid,
    label: String,
    name: Option<String>,
    species_id: Uuid,
}

impl FeatureRecord {
    pub fn new(label: &str, name: Option<&str>, species_id: Uuid) -> Result<Self, DomainError> {
        Self::from_parts(Uuid::new_v4(), label, name, species_id)
    }

    pub fn from_parts(id: Uuid, label: &str, name: Option<&str>, species_id: Uuid) -> Result<Self, DomainError> {
        if label.trim().is_empty() {
            return Err(DomainError::ValidationError("Label de feature vacío".to_string()));
        }
        Ok(FeatureRecord { id,
                           label: label.to_string(),
                           name: name.map(str::to_string),
                           species_id })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn label(&self) -> &str { &self.label }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn species_id(&self) -> Uuid { self.species_id }
}
