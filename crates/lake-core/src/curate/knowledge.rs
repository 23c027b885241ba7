//! Tabla de conocimiento de referencia (genes / proteins / cell markers de
//! una especie) y resultado de curar un dataset contra ella.

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{info, warn};

use lake_domain::FeatureKind;

use crate::errors::CoreError;
use crate::hashing::hash_set;

/// Columna opcional con el nombre descriptivo en la fuente de conocimiento.
const NAME_COLUMN: &str = "name";

/// Extrae los valores de una columna como strings (casteando si hace falta),
/// deduplicados preservando el orden.
fn column_labels(df: &DataFrame, column: &str) -> Result<Vec<String>, CoreError> {
    let series = df.column(column)?.cast(&DataType::String)?;
    let ca = series.str()?;
    let mut seen = HashSet::new();
    let mut labels = Vec::new();
    for value in ca.into_iter().flatten() {
        if seen.insert(value.to_string()) {
            labels.push(value.to_string());
        }
    }
    Ok(labels)
}

/// Fuente de conocimiento por especie contra la que se curan datasets.
/// Expone la columna identificadora de la entidad (`id_field`) y la especie.
#[derive(Debug, Clone)]
pub struct KnowledgeTable {
    kind: FeatureKind,
    species: String,
    id_field: String,
    table: DataFrame,
}

impl KnowledgeTable {
    pub fn new(kind: FeatureKind, species: &str, id_field: &str, table: DataFrame) -> Result<Self, CoreError> {
        if !table.get_column_names().iter().any(|c| *c == id_field) {
            return Err(CoreError::NotImplemented(format!(
                "la tabla de conocimiento no tiene la columna identificadora {id_field}"
            )));
        }
        Ok(KnowledgeTable { kind,
                            species: species.to_string(),
                            id_field: id_field.to_string(),
                            table })
    }

    /// Carga la fuente de conocimiento desde un CSV de referencia.
    pub fn from_csv(kind: FeatureKind, species: &str, id_field: &str, path: &Path) -> Result<Self, CoreError> {
        let table = CsvReadOptions::default().with_has_header(true)
                                             .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                                             .finish()?;
        Self::new(kind, species, id_field, table)
    }

    pub fn kind(&self) -> FeatureKind { self.kind }
    pub fn species(&self) -> &str { &self.species }
    pub fn id_field(&self) -> &str { &self.id_field }

    /// Labels conocidos por la fuente.
    pub fn known_labels(&self) -> Result<HashSet<String>, CoreError> {
        Ok(column_labels(&self.table, &self.id_field)?.into_iter().collect())
    }

    /// Mapa label → nombre descriptivo, si la fuente trae columna `name`.
    pub fn names(&self) -> Result<HashMap<String, String>, CoreError> {
        if !self.table.get_column_names().iter().any(|c| *c == NAME_COLUMN) {
            return Ok(HashMap::new());
        }
        let ids = self.table.column(&self.id_field)?.cast(&DataType::String)?;
        let ids = ids.str()?;
        let names = self.table.column(NAME_COLUMN)?.cast(&DataType::String)?;
        let names = names.str()?;
        let mut out = HashMap::new();
        for i in 0..self.table.height() {
            if let (Some(label), Some(name)) = (ids.get(i), names.get(i)) {
                out.insert(label.to_string(), name.to_string());
            }
        }
        Ok(out)
    }

    /// Cura un dataset: elige la columna de labels (la homónima de
    /// `id_field`, o la primera columna con warning) y marca cada label como
    /// mapeado o no contra la fuente.
    pub fn curate(&self, df: &DataFrame) -> Result<CuratedTable, CoreError> {
        let columns = df.get_column_names();
        let column = if columns.iter().any(|c| *c == self.id_field) {
            self.id_field.clone()
        } else {
            let first = columns.first()
                               .ok_or_else(|| CoreError::NotImplemented("dataset sin columnas".to_string()))?;
            warn!("columna {} no encontrada, usando {first} como features", self.id_field);
            first.to_string()
        };
        let labels = column_labels(df, &column)?;
        let known = self.known_labels()?;
        let mapped: Vec<bool> = labels.iter().map(|l| known.contains(l)).collect();
        let curated = CuratedTable { labels, mapped };
        let n = curated.n();
        let n_mapped = curated.n_mapped();
        let percent = if n > 0 { n_mapped as f64 / n as f64 * 100.0 } else { 0.0 };
        info!("curación {}: {n_mapped}/{n} labels mapeados ({percent:.1}%)", self.id_field);
        Ok(curated)
    }
}

/// Índice curado de un dataset: labels en orden de aparición con su flag de
/// mapeo contra la fuente.
#[derive(Debug, Clone)]
pub struct CuratedTable {
    labels: Vec<String>,
    mapped: Vec<bool>,
}

impl CuratedTable {
    pub fn n(&self) -> usize { self.labels.len() }
    pub fn n_mapped(&self) -> usize { self.mapped.iter().filter(|m| **m).count() }
    pub fn labels(&self) -> &[String] { &self.labels }

    pub fn mapped_labels(&self) -> Vec<&str> {
        self.labels.iter().zip(&self.mapped).filter(|(_, m)| **m).map(|(l, _)| l.as_str()).collect()
    }

    pub fn unmapped_labels(&self) -> Vec<&str> {
        self.labels.iter().zip(&self.mapped).filter(|(_, m)| !**m).map(|(l, _)| l.as_str()).collect()
    }

    /// Hash del conjunto curado: clave del FeatureSet.
    pub fn set_hash(&self) -> String { hash_set(&self.labels) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> KnowledgeTable {
        let table = DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A", "FOXP3"]),
                                        Series::new("name", &["T-cell surface CD4", "CD8 alpha", "forkhead P3"]),])
            .unwrap();
        KnowledgeTable::new(FeatureKind::Gene, "human", "gene_symbol", table).unwrap()
    }

    #[test]
    fn curate_prefers_id_field_column() {
        let df = DataFrame::new(vec![Series::new("other", &["x", "y"]),
                                     Series::new("gene_symbol", &["CD4", "MYC"]),]).unwrap();
        let curated = knowledge().curate(&df).unwrap();
        assert_eq!(curated.labels(), &["CD4".to_string(), "MYC".to_string()]);
        assert_eq!(curated.mapped_labels(), vec!["CD4"]);
        assert_eq!(curated.unmapped_labels(), vec!["MYC"]);
    }

    #[test]
    fn curate_falls_back_to_first_column() {
        let df = DataFrame::new(vec![Series::new("symbols", &["CD8A", "CD8A", "XYZ1"])]).unwrap();
        let curated = knowledge().curate(&df).unwrap();
        // dedup preservando orden
        assert_eq!(curated.n(), 2);
        assert_eq!(curated.n_mapped(), 1);
    }

    #[test]
    fn set_hash_ignores_label_order() {
        let a = CuratedTable { labels: vec!["CD4".into(), "CD8A".into()],
                               mapped: vec![true, true] };
        let b = CuratedTable { labels: vec!["CD8A".into(), "CD4".into()],
                               mapped: vec![true, true] };
        assert_eq!(a.set_hash(), b.set_hash());
    }

    #[test]
    fn knowledge_loads_from_reference_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.human.csv");
        std::fs::write(&path, "gene_symbol,name\nCD4,cd4 molecule\nCD8A,cd8 subunit alpha\n").unwrap();
        let k = KnowledgeTable::from_csv(FeatureKind::Gene, "human", "gene_symbol", &path).unwrap();
        assert!(k.known_labels().unwrap().contains("CD8A"));
        assert_eq!(k.names().unwrap().get("CD4").map(String::as_str), Some("cd4 molecule"));
    }

    #[test]
    fn missing_id_field_in_knowledge_is_an_error() {
        let table = DataFrame::new(vec![Series::new("x", &["a"])]).unwrap();
        assert!(KnowledgeTable::new(FeatureKind::Gene, "human", "gene_symbol", table).is_err());
    }
}
