//! Codecs por sufijo. La lógica de formato vive acá, despachada por sufijo:
//! - `.csv` / `.parquet`: DataFrame vía polars.
//! - `.h5ad`: contenedor de archivo único para `AnnMatrix` (serde_json).
//! - `.zarr`: directorio streaming (var/obs en parquet + matriz en chunks
//!   por filas); nunca se escribe eagerly al serializar.

use polars::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use lake_domain::data_object::STREAMING_SUFFIX;

use crate::errors::CoreError;
use crate::table::{AnnMatrix, MemoryRep};

/// Filas por chunk en el store de matriz.
const CHUNK_ROWS: usize = 1000;

fn write_table(df: &DataFrame, path: &Path, suffix: &str) -> Result<(), CoreError> {
    let mut df = df.clone();
    let mut file = File::create(path)?;
    match suffix {
        ".csv" => {
            CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        }
        ".parquet" => {
            ParquetWriter::new(&mut file).finish(&mut df)?;
        }
        other => return Err(CoreError::NotImplemented(format!("escritura tabular {other}"))),
    }
    Ok(())
}

fn read_table(path: &Path, suffix: &str) -> Result<DataFrame, CoreError> {
    match suffix {
        ".csv" => {
            let df = CsvReadOptions::default().with_has_header(true)
                                              .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                                              .finish()?;
            Ok(df)
        }
        ".parquet" => {
            let file = File::open(path)?;
            Ok(ParquetReader::new(file).finish()?)
        }
        other => Err(CoreError::NotImplemented(format!("lectura tabular {other}"))),
    }
}

/// Escribe una representación en memoria al archivo local indicado.
pub fn write_to_file(rep: &MemoryRep, path: &Path, suffix: &str) -> Result<(), CoreError> {
    match (rep, suffix) {
        (MemoryRep::Table(df), ".csv" | ".parquet") => write_table(df, path, suffix),
        (MemoryRep::Matrix(m), ".h5ad") => {
            let file = File::create(path)?;
            serde_json::to_writer(BufWriter::new(file), m)?;
            Ok(())
        }
        (MemoryRep::Matrix(_), STREAMING_SUFFIX) => Err(CoreError::SuffixNotSupported {
            suffix: STREAMING_SUFFIX.to_string(),
            operation: "write_to_file",
        }),
        (_, other) => Err(CoreError::NotImplemented(format!("escritura de {other}"))),
    }
}

/// Carga el objeto a memoria, despachando por sufijo.
pub fn load_to_memory(path: &Path, suffix: &str) -> Result<MemoryRep, CoreError> {
    match suffix {
        ".csv" | ".parquet" => Ok(MemoryRep::Table(read_table(path, suffix)?)),
        ".h5ad" => {
            let file = File::open(path)?;
            let m: AnnMatrix = serde_json::from_reader(BufReader::new(file))?;
            Ok(MemoryRep::Matrix(m))
        }
        STREAMING_SUFFIX => Ok(MemoryRep::Matrix(read_matrix_dir(path)?)),
        other => Err(CoreError::NotImplemented(format!("carga de {other}"))),
    }
}

/// Materializa una matriz como directorio streaming.
pub fn store_matrix_dir(m: &AnnMatrix, dest: &Path) -> Result<u64, CoreError> {
    let chunks_dir = dest.join("x");
    fs::create_dir_all(&chunks_dir)?;
    write_table(m.var(), &dest.join("var.parquet"), ".parquet")?;
    write_table(m.obs(), &dest.join("obs.parquet"), ".parquet")?;
    let mut written = 0u64;
    for (i, chunk) in m.x().chunks(CHUNK_ROWS).enumerate() {
        let chunk_path = chunks_dir.join(format!("chunk-{i:05}.json"));
        let file = File::create(&chunk_path)?;
        serde_json::to_writer(BufWriter::new(file), chunk)?;
        written += fs::metadata(&chunk_path)?.len();
    }
    Ok(written)
}

/// Reconstruye la matriz completa desde un directorio streaming.
pub fn read_matrix_dir(dir: &Path) -> Result<AnnMatrix, CoreError> {
    let accessor = open_matrix_dir(dir)?;
    accessor.to_matrix()
}

fn sorted_chunk_paths(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let chunks_dir = dir.join("x");
    let mut paths: Vec<PathBuf> = fs::read_dir(&chunks_dir)?.filter_map(|e| e.ok())
                                                            .map(|e| e.path())
                                                            .filter(|p| {
                                                                p.extension().is_some_and(|ext| ext == "json")
                                                            })
                                                            .collect();
    paths.sort();
    Ok(paths)
}

/// Acceso streaming a una matriz anotada: las anotaciones se leen al abrir,
/// la matriz se trae por chunks bajo demanda.
#[derive(Debug)]
pub struct MatrixAccessor {
    var: DataFrame,
    obs: DataFrame,
    source: MatrixSource,
}

#[derive(Debug)]
enum MatrixSource {
    /// Directorio streaming con chunks en disco.
    Chunked(Vec<PathBuf>),
    /// Contenedor de archivo único ya cargado (sin lectura parcial).
    Loaded(Vec<Vec<f64>>),
}

impl MatrixAccessor {
    pub fn var(&self) -> &DataFrame { &self.var }
    pub fn obs(&self) -> &DataFrame { &self.obs }

    pub fn n_chunks(&self) -> usize {
        match &self.source {
            MatrixSource::Chunked(paths) => paths.len(),
            MatrixSource::Loaded(_) => 1,
        }
    }

    /// Filas del chunk `i`.
    pub fn load_chunk(&self, i: usize) -> Result<Vec<Vec<f64>>, CoreError> {
        match &self.source {
            MatrixSource::Chunked(paths) => {
                let path = paths.get(i)
                                .ok_or_else(|| CoreError::NotImplemented(format!("chunk {i} fuera de rango")))?;
                let file = File::open(path)?;
                Ok(serde_json::from_reader(BufReader::new(file))?)
            }
            MatrixSource::Loaded(x) => {
                if i != 0 {
                    return Err(CoreError::NotImplemented(format!("chunk {i} fuera de rango")));
                }
                Ok(x.clone())
            }
        }
    }

    /// Consolida todos los chunks en una matriz en memoria.
    pub fn to_matrix(&self) -> Result<AnnMatrix, CoreError> {
        let mut x = Vec::new();
        for i in 0..self.n_chunks() {
            x.extend(self.load_chunk(i)?);
        }
        AnnMatrix::new(x, self.obs.clone(), self.var.clone())
    }
}

fn open_matrix_dir(dir: &Path) -> Result<MatrixAccessor, CoreError> {
    let var = read_table(&dir.join("var.parquet"), ".parquet")?;
    let obs = read_table(&dir.join("obs.parquet"), ".parquet")?;
    Ok(MatrixAccessor { var,
                        obs,
                        source: MatrixSource::Chunked(sorted_chunk_paths(dir)?) })
}

/// Abre una matriz para streaming según su sufijo (`.zarr` o `.h5ad`).
pub fn open_matrix(path: &Path, suffix: &str) -> Result<MatrixAccessor, CoreError> {
    match suffix {
        STREAMING_SUFFIX => open_matrix_dir(path),
        ".h5ad" => {
            let file = File::open(path)?;
            let m: AnnMatrix = serde_json::from_reader(BufReader::new(file))?;
            Ok(MatrixAccessor { var: m.var().clone(),
                                obs: m.obs().clone(),
                                source: MatrixSource::Loaded(m.x().to_vec()) })
        }
        other => Err(CoreError::SuffixNotSupported { suffix: other.to_string(),
                                                     operation: "stream" }),
    }
}
