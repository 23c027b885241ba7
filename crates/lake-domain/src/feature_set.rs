use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Longitud del hash de conjunto (md5 → base64url sin padding, truncado).
pub const SET_HASH_LEN: usize = 20;

/// Entidad biológica de un conjunto de features. Variante etiquetada: cada
/// variante tiene su propia tabla de referencia y su propia relación de
/// enlace (genes / proteins / cell_markers), nunca una relación polimórfica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Gene,
    Protein,
    CellMarker,
}

impl FeatureKind {
    /// Nombre estable para columnas de DB y logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Gene => "gene",
            FeatureKind::Protein => "protein",
            FeatureKind::CellMarker => "cell_marker",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FeatureKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gene" => Ok(FeatureKind::Gene),
            "protein" => Ok(FeatureKind::Protein),
            "cell_marker" => Ok(FeatureKind::CellMarker),
            other => Err(DomainError::ValidationError(format!("Entidad de feature desconocida: {other}"))),
        }
    }
}

/// Conjunto curado de labels de features. Su id ES el hash del conjunto
/// (orden-independiente), por lo que dos datasets con los mismos labels
/// reutilizan el mismo registro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    id: String,
    kind: FeatureKind,
    created_at: DateTime<Utc>,
}

impl FeatureSet {
    pub fn new(set_hash: &str, kind: FeatureKind) -> Result<Self, DomainError> {
        Self::from_parts(set_hash, kind, Utc::now())
    }

    pub fn from_parts(set_hash: &str, kind: FeatureKind, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
        if set_hash.len() != SET_HASH_LEN {
            return Err(DomainError::ValidationError(format!(
                "Id de FeatureSet debe ser un hash de {SET_HASH_LEN} caracteres, recibido: {set_hash:?}"
            )));
        }
        Ok(FeatureSet { id: set_hash.to_string(),
                        kind,
                        created_at })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn kind(&self) -> FeatureKind { self.kind }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
}
