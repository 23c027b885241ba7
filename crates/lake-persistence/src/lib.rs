//! lake-persistence
//!
//! Implementación SQLite (Diesel) del `Registry` de `lake-core` sobre un
//! único archivo embebido, más utilidades de conexión, migraciones y el lock
//! de instancia que serializa escritores entre procesos.
//!
//! Módulos:
//! - `sqlite`: `SqliteRegistry` y pool r2d2.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde `.env`.
//! - `schema`: tablas Diesel declaradas para compilar queries.
//! - `lock`: lock de archivo grueso junto a la base.

pub mod config;
pub mod error;
pub mod lock;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use lock::{InstanceLock, LockGuard};
pub use sqlite::{build_pool, ConnectionProvider, PoolProvider, SqlitePool, SqliteRegistry};
