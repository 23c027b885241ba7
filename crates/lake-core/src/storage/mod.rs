//! Capa de storage: codecs por sufijo y resolución de claves bajo la raíz.

pub mod object;

pub use object::{load_to_memory, open_matrix, read_matrix_dir, store_matrix_dir, write_to_file, MatrixAccessor};

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Settings;
use crate::errors::CoreError;

/// Resuelve una clave de storage (`{id}{suffix}`) a su path concreto.
pub fn filepath_for(settings: &Settings, storage_key: &str) -> PathBuf {
    settings.storage_root().join(storage_key)
}

/// Copia un archivo local bajo la raíz de storage. Devuelve los bytes
/// escritos.
pub fn store_file(local_path: &Path, settings: &Settings, storage_key: &str) -> Result<u64, CoreError> {
    let dest = filepath_for(settings, storage_key);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(local_path, &dest)?;
    debug!("store_file: {} -> {} ({bytes} bytes)", local_path.display(), dest.display());
    Ok(bytes)
}

/// Copia recursiva de un directorio streaming ya materializado.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<u64, CoreError> {
    fs::create_dir_all(dest)?;
    let mut bytes = 0u64;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.path().is_dir() {
            bytes += copy_dir(&entry.path(), &target)?;
        } else {
            bytes += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(bytes)
}

/// Tamaño total de un directorio (suma de archivos).
pub fn dir_size(path: &Path) -> Result<u64, CoreError> {
    let mut total = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.path().is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Elimina el objeto del storage (archivo o directorio streaming).
pub fn delete_from_storage(settings: &Settings, storage_key: &str) -> Result<(), CoreError> {
    let path = filepath_for(settings, storage_key);
    if path.is_dir() {
        fs::remove_dir_all(&path)?;
    } else {
        fs::remove_file(&path)?;
    }
    debug!("delete_from_storage: {}", path.display());
    Ok(())
}
