//! Representaciones en memoria soportadas por el adaptador de serialización.
//!
//! - `DataFrame` (polars) para datos tabulares (`.parquet` / `.csv`).
//! - `AnnMatrix` para matrices anotadas observaciones × features
//!   (`.h5ad` como contenedor de archivo único, `.zarr` como directorio
//!   streaming).

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use lake_domain::DomainError;

use crate::errors::CoreError;

/// Matriz anotada: `x[obs][var]` con tablas de anotación por eje. La tabla
/// `var` es la que se curan contra las tablas de conocimiento (labels de
/// features por fila).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnMatrix {
    x: Vec<Vec<f64>>,
    obs: DataFrame,
    var: DataFrame,
}

impl AnnMatrix {
    pub fn new(x: Vec<Vec<f64>>, obs: DataFrame, var: DataFrame) -> Result<Self, CoreError> {
        if x.len() != obs.height() {
            return Err(CoreError::Domain(DomainError::ValidationError(format!(
                "matriz con {} filas pero obs con {} entradas",
                x.len(),
                obs.height()
            ))));
        }
        if let Some(row) = x.iter().find(|row| row.len() != var.height()) {
            return Err(CoreError::Domain(DomainError::ValidationError(format!(
                "fila de matriz con {} columnas pero var con {} entradas",
                row.len(),
                var.height()
            ))));
        }
        Ok(AnnMatrix { x, obs, var })
    }

    pub fn n_obs(&self) -> usize { self.obs.height() }
    pub fn n_vars(&self) -> usize { self.var.height() }
    pub fn x(&self) -> &[Vec<f64>] { &self.x }
    pub fn obs(&self) -> &DataFrame { &self.obs }
    pub fn var(&self) -> &DataFrame { &self.var }

    /// Estimación de tamaño en bytes para formatos sin archivo único que
    /// se pueda consultar con `stat` (directorios streaming).
    pub fn estimated_size(&self) -> i64 {
        let cells = self.n_obs() as i64 * self.n_vars() as i64;
        cells * std::mem::size_of::<f64>() as i64
            + self.obs.estimated_size() as i64
            + self.var.estimated_size() as i64
    }
}

/// Objeto en memoria retenido tras serializar, para reuso sin recargar.
#[derive(Debug, Clone)]
pub enum MemoryRep {
    Table(DataFrame),
    Matrix(AnnMatrix),
}

impl MemoryRep {
    /// Tabla contra la que se curan features: el propio DataFrame para
    /// tabulares, la anotación `var` para matrices.
    pub fn feature_frame(&self) -> &DataFrame {
        match self {
            MemoryRep::Table(df) => df,
            MemoryRep::Matrix(m) => m.var(),
        }
    }
}
