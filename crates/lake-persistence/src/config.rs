//! Configuración de conexión desde variables de entorno.
//! Convención `LAKE_DB_PATH` (o `DATABASE_URL`) y tamaño de pool opcional.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl DbConfig {
    /// Lee `LAKE_DB_PATH` (fallback `DATABASE_URL`). `None` si no hay nada
    /// configurado: el caller decide el default (p.ej. dentro de la raíz de
    /// storage).
    pub fn from_env() -> Option<Self> {
        Lazy::force(&DOTENV_LOADED);
        let path = env::var("LAKE_DB_PATH").or_else(|_| env::var("DATABASE_URL")).ok()?;
        let max_connections = env::var("LAKE_DB_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(8);
        Some(DbConfig { path: PathBuf::from(path),
                        max_connections })
    }

    pub fn from_path(path: &Path) -> Self {
        DbConfig { path: path.to_path_buf(),
                   max_connections: 8 }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
