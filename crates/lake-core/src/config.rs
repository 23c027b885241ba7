//! Configuración de la instancia desde variables de entorno.
//! Convención `LAKE_*`; `.env` se carga una sola vez de forma perezosa.

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

use dotenvy::dotenv;

use crate::errors::CoreError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Política ante un hash de contenido ya registrado (decisión explícita:
/// el comportamiento observado de solo-warn queda como default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Warn,
    Reject,
}

/// Configuración de la instancia: raíz de storage, cache local para
/// serializaciones eagerly escritas, identidad del usuario y políticas.
#[derive(Debug, Clone)]
pub struct Settings {
    storage_root: PathBuf,
    cache_dir: PathBuf,
    user: String,
    duplicate_policy: DuplicatePolicy,
    track_run_inputs_on_load: bool,
}

impl Settings {
    /// Lee `LAKE_STORAGE_ROOT`, `LAKE_CACHE_DIR`, `LAKE_USER` y
    /// `LAKE_ON_DUPLICATE` con defaults razonables.
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let storage_root =
            PathBuf::from(env::var("LAKE_STORAGE_ROOT").unwrap_or_else(|_| "./lake-storage".to_string()));
        let cache_dir = env::var("LAKE_CACHE_DIR").map(PathBuf::from)
                                                  .unwrap_or_else(|_| storage_root.join(".cache"));
        let user = env::var("LAKE_USER").unwrap_or_else(|_| "anonymous".to_string());
        let duplicate_policy = match env::var("LAKE_ON_DUPLICATE").as_deref() {
            Ok("reject") => DuplicatePolicy::Reject,
            _ => DuplicatePolicy::Warn,
        };
        Settings { storage_root,
                   cache_dir,
                   user,
                   duplicate_policy,
                   track_run_inputs_on_load: false }
    }

    /// Instancia apuntando a una raíz concreta (tests, CLI `--storage`).
    pub fn with_storage_root(root: &Path) -> Self {
        Settings { storage_root: root.to_path_buf(),
                   cache_dir: root.join(".cache"),
                   user: "anonymous".to_string(),
                   duplicate_policy: DuplicatePolicy::default(),
                   track_run_inputs_on_load: false }
    }

    pub fn storage_root(&self) -> &Path { &self.storage_root }
    pub fn cache_dir(&self) -> &Path { &self.cache_dir }
    pub fn user(&self) -> &str { &self.user }
    pub fn duplicate_policy(&self) -> DuplicatePolicy { self.duplicate_policy }
    pub fn track_run_inputs_on_load(&self) -> bool { self.track_run_inputs_on_load }

    pub fn set_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn set_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn set_track_run_inputs_on_load(mut self, track: bool) -> Self {
        self.track_run_inputs_on_load = track;
        self
    }

    /// Crea raíz de storage y cache si no existen.
    pub fn ensure_dirs(&self) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.storage_root)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }
}
