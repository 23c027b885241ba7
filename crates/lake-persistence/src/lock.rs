//! Lock de instancia: archivo grueso junto a la base SQLite que serializa
//! escritores entre procesos. Adquirir → read-modify-write → commit →
//! liberar; sin recuperación parcial más allá de la transacción subyacente.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::warn;

use crate::error::PersistenceError;

/// Intentos antes de rendirse (25ms entre intentos → ~5s).
const MAX_ATTEMPTS: u32 = 200;
const RETRY_DELAY: Duration = Duration::from_millis(25);
/// Un lock más viejo que esto se considera huérfano de un proceso muerto.
const STALE_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Lock asociado a una base: `{db}.lock` al lado del archivo.
    pub fn for_db(db_path: &Path) -> Self {
        let mut os = db_path.as_os_str().to_os_string();
        os.push(".lock");
        InstanceLock { path: PathBuf::from(os) }
    }

    /// Adquiere el lock creando el archivo de forma exclusiva, con reintentos
    /// y toma de locks huérfanos.
    pub fn acquire(&self) -> Result<LockGuard, PersistenceError> {
        for _ in 0..MAX_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&self.path) {
                Ok(_) => return Ok(LockGuard { path: self.path.clone() }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if self.is_stale() {
                        warn!("lock huérfano en {}, tomándolo", self.path.display());
                        let _ = std::fs::remove_file(&self.path);
                        continue;
                    }
                    std::thread::sleep(RETRY_DELAY);
                }
                Err(e) => return Err(PersistenceError::TransientIo(format!("lock: {e}"))),
            }
        }
        Err(PersistenceError::Busy)
    }

    fn is_stale(&self) -> bool {
        std::fs::metadata(&self.path).and_then(|m| m.modified())
                                     .map(|mtime| {
                                         SystemTime::now().duration_since(mtime)
                                                          .map(|age| age > STALE_AFTER)
                                                          .unwrap_or(false)
                                     })
                                     .unwrap_or(false)
    }
}

/// Guard RAII: soltarlo libera el lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("no se pudo liberar el lock {}: {e}", self.path.display());
        }
    }
}
