//! Adaptador de serialización: convierte la entrada (path o objeto en
//! memoria) en una representación canónica con nombre, sufijo y archivo
//! local.
//!
//! Reglas:
//! - Path: nombre/sufijo se derivan del nombre de archivo quitando TODOS los
//!   sufijos de punto (`x.anndata.h5ad` → nombre `x`, sufijo `.anndata.h5ad`).
//! - Objeto en memoria: `name` es obligatorio; el sufijo se infiere del tipo
//!   y del hint de formato. Se escribe eagerly un archivo local salvo para el
//!   formato de directorio streaming (`.zarr`), que se materializa recién al
//!   almacenar.

use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

use lake_domain::data_object::STREAMING_SUFFIX;

use crate::errors::CoreError;
use crate::storage;
use crate::table::{AnnMatrix, MemoryRep};

/// Entrada del adaptador. Conjunto cerrado: lo que en la capa original era
/// chequeo dinámico de tipos aquí es el propio enum.
#[derive(Debug, Clone)]
pub enum RecordInput {
    Path(PathBuf),
    Table(DataFrame),
    Matrix(AnnMatrix),
}

/// Resultado de la serialización.
#[derive(Debug, Clone)]
pub struct Serialized {
    /// Representación en memoria retenida para reuso (None para paths).
    pub memory_rep: Option<MemoryRep>,
    /// Archivo local. Para `.zarr` el path es virtual: no se escribe nada
    /// hasta el almacenamiento.
    pub local_path: PathBuf,
    pub name: String,
    pub suffix: String,
}

/// Deriva (nombre, sufijo) de un path quitando todos los sufijos de punto.
pub fn name_suffix_from_filepath(path: &Path) -> (String, String) {
    let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    // El primer punto después de la posición 0 abre el sufijo compuesto;
    // un punto inicial (dotfile) es parte del nombre.
    match filename.char_indices().skip(1).find(|(_, c)| *c == '.') {
        Some((i, _)) => (filename[..i].to_string(), filename[i..].to_string()),
        None => (filename, String::new()),
    }
}

fn normalize_format(format: &str) -> String {
    if format.starts_with('.') {
        format.to_string()
    } else {
        format!(".{format}")
    }
}

/// Infere el sufijo para un objeto en memoria según tipo + hint de formato.
pub fn infer_suffix(input: &RecordInput, format: Option<&str>) -> Result<String, CoreError> {
    let hint = format.map(normalize_format);
    match (input, hint.as_deref()) {
        (RecordInput::Table(_), None) => Ok(".parquet".to_string()),
        (RecordInput::Table(_), Some(".parquet")) => Ok(".parquet".to_string()),
        (RecordInput::Table(_), Some(".csv")) => Ok(".csv".to_string()),
        (RecordInput::Matrix(_), None) => Ok(".h5ad".to_string()),
        (RecordInput::Matrix(_), Some(".h5ad")) => Ok(".h5ad".to_string()),
        (RecordInput::Matrix(_), Some(STREAMING_SUFFIX)) => Ok(STREAMING_SUFFIX.to_string()),
        (_, Some(other)) => Err(CoreError::NotImplemented(format!("formato {other} para este tipo de objeto"))),
        (RecordInput::Path(_), None) => unreachable!("los paths no infieren sufijo"),
    }
}

/// Serializa la entrada. `workdir` es el directorio donde se escriben los
/// archivos locales eagerly (cache de la instancia).
pub fn serialize(input: RecordInput,
                 name: Option<&str>,
                 format: Option<&str>,
                 workdir: &Path)
                 -> Result<Serialized, CoreError> {
    match input {
        RecordInput::Path(path) => {
            let (name, suffix) = name_suffix_from_filepath(&path);
            Ok(Serialized { memory_rep: None,
                            local_path: path,
                            name,
                            suffix })
        }
        in_memory => {
            let name = name.ok_or(CoreError::MissingName)?;
            let suffix = infer_suffix(&in_memory, format)?;
            let local_path = workdir.join(format!("{name}{suffix}"));
            let memory_rep = match in_memory {
                RecordInput::Table(df) => MemoryRep::Table(df),
                RecordInput::Matrix(m) => MemoryRep::Matrix(m),
                RecordInput::Path(_) => unreachable!(),
            };
            if suffix != STREAMING_SUFFIX {
                storage::write_to_file(&memory_rep, &local_path, &suffix)?;
            }
            Ok(Serialized { memory_rep: Some(memory_rep),
                            local_path,
                            name: name.to_string(),
                            suffix })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn small_table() -> DataFrame {
        DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A"]), Series::new("count", &[10i64, 20])]).unwrap()
    }

    #[test]
    fn path_input_strips_all_dot_suffixes() {
        let (name, suffix) = name_suffix_from_filepath(Path::new("/data/pbmc.anndata.h5ad"));
        assert_eq!(name, "pbmc");
        assert_eq!(suffix, ".anndata.h5ad");

        let (name, suffix) = name_suffix_from_filepath(Path::new("matrix.csv"));
        assert_eq!(name, "matrix");
        assert_eq!(suffix, ".csv");

        // dotfiles: el punto inicial no abre sufijo
        let (name, suffix) = name_suffix_from_filepath(Path::new(".env"));
        assert_eq!(name, ".env");
        assert_eq!(suffix, "");
    }

    #[test]
    fn in_memory_requires_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = serialize(RecordInput::Table(small_table()), None, None, dir.path());
        assert!(matches!(err, Err(CoreError::MissingName)));
    }

    #[test]
    fn table_defaults_to_parquet_and_writes_eagerly() {
        let dir = tempfile::tempdir().unwrap();
        let out = serialize(RecordInput::Table(small_table()), Some("pbmc"), None, dir.path()).unwrap();
        assert_eq!(out.suffix, ".parquet");
        assert_eq!(out.name, "pbmc");
        assert!(out.local_path.exists());
    }

    #[test]
    fn csv_hint_accepted_with_or_without_dot() {
        let dir = tempfile::tempdir().unwrap();
        for hint in ["csv", ".csv"] {
            let out = serialize(RecordInput::Table(small_table()), Some("t"), Some(hint), dir.path()).unwrap();
            assert_eq!(out.suffix, ".csv");
        }
    }

    #[test]
    fn zarr_matrix_skips_eager_write() {
        let dir = tempfile::tempdir().unwrap();
        let obs = DataFrame::new(vec![Series::new("cell", &["c1"])]).unwrap();
        let var = DataFrame::new(vec![Series::new("gene_symbol", &["CD4"])]).unwrap();
        let m = AnnMatrix::new(vec![vec![1.0]], obs, var).unwrap();
        let out = serialize(RecordInput::Matrix(m), Some("m"), Some("zarr"), dir.path()).unwrap();
        assert_eq!(out.suffix, ".zarr");
        assert!(!out.local_path.exists());
    }

    #[test]
    fn unsupported_format_hint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = serialize(RecordInput::Table(small_table()), Some("t"), Some("zarr"), dir.path());
        assert!(matches!(err, Err(CoreError::NotImplemented(_))));
    }
}
