//! Implementación SQLite (Diesel) del `Registry` del core.
//!
//! Objetivo general del módulo:
//! - Proveer una capa de persistencia durable sobre un único archivo SQLite
//!   embebido, con paridad 1:1 respecto al backend en memoria.
//! - Aislar completamente el mapeo dominio ↔ filas de DB del `lake-core`.
//! - Serializar escritores entre procesos con el lock de instancia
//!   (`InstanceLock`): adquirir → transacción → commit → liberar.
//!
//! Notas operativas:
//! - El pool r2d2 corre las migraciones pendientes una sola vez al
//!   construirse.
//! - Cada conexión habilita `foreign_keys` y un `busy_timeout` corto.
//! - Errores transitorios (`database is locked`) se reintentan con backoff
//!   pequeño; el resto se mapea a variantes semánticas.

use std::path::Path;

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use uuid::Uuid;

use lake_core::{Registry, RegistryError};
use lake_core::registry::DataObjectFilter;
use lake_domain::{DataObject, FeatureKind, FeatureRecord, FeatureSet, Run, Species, StorageRoot, UsageEvent};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::lock::InstanceLock;
use crate::migrations::run_pending_migrations;
use crate::models::{CellMarkerRow, DataObjectRow, FeatureSetRow, GeneRow, NewUsageRow, ProteinRow, RunRow,
                    SpeciesRow, StorageRootRow};
use crate::schema::{cell_markers, data_objects, data_objects_feature_sets, feature_sets, feature_sets_cell_markers,
                    feature_sets_genes, feature_sets_proteins, genes, proteins, run_inputs, runs, species,
                    storage_roots, usage_events};

/// Pool r2d2 de conexiones SQLite.
pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Binds por consulta al expandir `IN (...)`; margen holgado respecto al
/// límite de variables de SQLite.
const BIND_CHUNK: usize = 500;

/// Proveedor abstracto de conexiones (inyectable en tests).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, PersistenceError>;
}

/// Implementación concreta respaldada por un `SqlitePool`.
pub struct PoolProvider {
    pub pool: SqlitePool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, PersistenceError> {
        self.pool.get().map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Pragmas por conexión: FKs reales y espera corta ante escritores
/// concurrentes.
#[derive(Debug)]
struct ConnectionSetup;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        use diesel::connection::SimpleConnection;
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::Busy => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => msg.to_lowercase().contains("database is locked"),
        _ => false,
    }
}

/// Retry simple con backoff pequeño (hasta 3 intentos).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("error transitorio (intento {}): {:?} -> durmiendo {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye un pool SQLite y corre las migraciones embebidas.
pub fn build_pool(db_path: &Path, max_size: u32) -> Result<SqlitePool, PersistenceError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::TransientIo(format!("mkdir db: {e}")))?;
        }
    }
    let validated_max = if max_size == 0 { 1 } else { max_size };
    let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
    let pool = r2d2::Pool::builder().max_size(validated_max)
                                    .connection_customizer(Box::new(ConnectionSetup))
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    // Migraciones una sola vez al construir (primer checkout del pool).
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Registro durable sobre SQLite. Las mutaciones toman el lock de instancia
/// y corren dentro de una transacción.
pub struct SqliteRegistry<P: ConnectionProvider> {
    provider: P,
    lock: InstanceLock,
}

impl SqliteRegistry<PoolProvider> {
    /// Abre (o crea) la base en `db_path` y deja el esquema migrado.
    pub fn open(db_path: &Path, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = build_pool(db_path, max_connections)?;
        Ok(SqliteRegistry { provider: PoolProvider { pool },
                            lock: InstanceLock::for_db(db_path) })
    }

    pub fn from_config(cfg: &DbConfig) -> Result<Self, PersistenceError> {
        Self::open(&cfg.path, cfg.max_connections)
    }
}

impl<P: ConnectionProvider> SqliteRegistry<P> {
    pub fn new(provider: P, lock: InstanceLock) -> Self {
        SqliteRegistry { provider, lock }
    }

    /// Eventos de uso registrados para un objeto (auditoría).
    pub fn usage_for(&self, data_object_id: Uuid) -> Result<Vec<(String, String)>, PersistenceError> {
        let mut conn = self.provider.connection()?;
        let rows: Vec<(String, String)> =
            usage_events::table.filter(usage_events::data_object_id.eq(data_object_id.to_string()))
                               .order(usage_events::at.asc())
                               .select((usage_events::kind, usage_events::user_id))
                               .load(&mut conn)
                               .map_err(PersistenceError::from)?;
        Ok(rows)
    }
}

impl<P: ConnectionProvider> Registry for SqliteRegistry<P> {
    fn add_data_object(&mut self, obj: &DataObject) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let row = DataObjectRow::from(obj);
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(data_objects::table).values(&row)
                                                    .execute(&mut conn)
                                                    .map_err(PersistenceError::from)?;
            Ok(())
        })?;
        debug!("add_data_object: {}", obj.id());
        Ok(())
    }

    fn select_data_objects(&self, filter: &DataObjectFilter) -> Result<Vec<DataObject>, RegistryError> {
        let rows: Vec<DataObjectRow> = with_retry(|| {
            let mut conn = self.provider.connection()?;
            let mut query = data_objects::table.into_boxed();
            if let Some(id) = &filter.id {
                query = query.filter(data_objects::id.eq(id.to_string()));
            }
            if let Some(name) = &filter.name {
                query = query.filter(data_objects::name.eq(name.clone()));
            }
            if let Some(suffix) = &filter.suffix {
                query = query.filter(data_objects::suffix.eq(suffix.clone()));
            }
            if let Some(hash) = &filter.hash {
                query = query.filter(data_objects::hash.eq(hash.clone()));
            }
            if let Some(run_id) = &filter.run_id {
                query = query.filter(data_objects::run_id.eq(run_id.to_string()));
            }
            query.order(data_objects::created_at.asc())
                 .load(&mut conn)
                 .map_err(PersistenceError::from)
        })?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(DataObject::try_from(row).map_err(RegistryError::from)?);
        }
        Ok(out)
    }

    fn delete_data_object(&mut self, id: Uuid) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let id_str = id.to_string();
        let mut conn = self.provider.connection()?;
        conn.transaction::<_, PersistenceError, _>(|tx| {
                // primero los enlaces, después la fila
                diesel::delete(run_inputs::table.filter(run_inputs::data_object_id.eq(&id_str))).execute(tx)?;
                diesel::delete(data_objects_feature_sets::table
                    .filter(data_objects_feature_sets::data_object_id.eq(&id_str))).execute(tx)?;
                let deleted =
                    diesel::delete(data_objects::table.filter(data_objects::id.eq(&id_str))).execute(tx)?;
                if deleted == 0 {
                    return Err(PersistenceError::NotFound);
                }
                Ok(())
            })?;
        debug!("delete_data_object: {id}");
        Ok(())
    }

    fn add_run(&mut self, run: &Run) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let row = RunRow::from(run);
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(runs::table).values(&row).execute(&mut conn).map_err(PersistenceError::from)?;
            Ok(())
        })?;
        Ok(())
    }

    fn get_run(&self, id: Uuid) -> Result<Option<Run>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let row: Option<RunRow> = runs::table.filter(runs::id.eq(id.to_string()))
                                             .first(&mut conn)
                                             .optional()
                                             .map_err(PersistenceError::from)?;
        row.map(|r| Run::try_from(r).map_err(RegistryError::from)).transpose()
    }

    fn link_run_input(&mut self, run_id: Uuid, data_object_id: Uuid) -> Result<bool, RegistryError> {
        let _guard = self.lock.acquire()?;
        let run_str = run_id.to_string();
        let obj_str = data_object_id.to_string();
        let mut conn = self.provider.connection()?;
        let newly = conn.transaction::<bool, PersistenceError, _>(|tx| {
                            // test de membresía antes de mutar: re-enlazar es no-op
                            let existing: i64 = run_inputs::table.filter(run_inputs::run_id.eq(&run_str))
                                                                 .filter(run_inputs::data_object_id.eq(&obj_str))
                                                                 .count()
                                                                 .get_result(tx)?;
                            if existing > 0 {
                                return Ok(false);
                            }
                            diesel::insert_into(run_inputs::table)
                                .values((run_inputs::run_id.eq(&run_str),
                                         run_inputs::data_object_id.eq(&obj_str)))
                                .execute(tx)?;
                            Ok(true)
                        })?;
        Ok(newly)
    }

    fn run_inputs(&self, run_id: Uuid) -> Result<Vec<Uuid>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let ids: Vec<String> = run_inputs::table.filter(run_inputs::run_id.eq(run_id.to_string()))
                                                .order(run_inputs::data_object_id.asc())
                                                .select(run_inputs::data_object_id)
                                                .load(&mut conn)
                                                .map_err(PersistenceError::from)?;
        ids.iter()
           .map(|raw| {
               Uuid::parse_str(raw).map_err(|e| RegistryError::Backend(format!("uuid inválido {raw}: {e}")))
           })
           .collect()
    }

    fn get_or_create_storage_root(&mut self, root: &str) -> Result<StorageRoot, RegistryError> {
        let existing: Option<StorageRootRow> = {
            let mut conn = self.provider.connection()?;
            storage_roots::table.filter(storage_roots::root.eq(root))
                                .first(&mut conn)
                                .optional()
                                .map_err(PersistenceError::from)?
        };
        if let Some(row) = existing {
            return StorageRoot::try_from(row).map_err(RegistryError::from);
        }
        let _guard = self.lock.acquire()?;
        let record = StorageRoot::new(root).map_err(|e| RegistryError::Backend(e.to_string()))?;
        let row = StorageRootRow::from(&record);
        let mut conn = self.provider.connection()?;
        match diesel::insert_into(storage_roots::table).values(&row)
                                                       .execute(&mut conn)
                                                       .map_err(PersistenceError::from)
        {
            Ok(_) => Ok(record),
            // carrera entre procesos: otro escritor la creó primero
            Err(PersistenceError::UniqueViolation(_)) => {
                let row: StorageRootRow = storage_roots::table.filter(storage_roots::root.eq(root))
                                                              .first(&mut conn)
                                                              .map_err(PersistenceError::from)?;
                StorageRoot::try_from(row).map_err(RegistryError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_species(&self, common_name: &str) -> Result<Option<Species>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let row: Option<SpeciesRow> = species::table.filter(species::common_name.eq(common_name))
                                                    .first(&mut conn)
                                                    .optional()
                                                    .map_err(PersistenceError::from)?;
        row.map(|r| Species::try_from(r).map_err(RegistryError::from)).transpose()
    }

    fn get_or_create_species(&mut self, common_name: &str) -> Result<Species, RegistryError> {
        if let Some(existing) = self.get_species(common_name)? {
            return Ok(existing);
        }
        let _guard = self.lock.acquire()?;
        let record = Species::new(common_name).map_err(|e| RegistryError::Backend(e.to_string()))?;
        let row = SpeciesRow::from(&record);
        let mut conn = self.provider.connection()?;
        match diesel::insert_into(species::table).values(&row).execute(&mut conn).map_err(PersistenceError::from) {
            Ok(_) => Ok(record),
            Err(PersistenceError::UniqueViolation(_)) => {
                let row: SpeciesRow = species::table.filter(species::common_name.eq(common_name))
                                                    .first(&mut conn)
                                                    .map_err(PersistenceError::from)?;
                Species::try_from(row).map_err(RegistryError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn select_feature_records(&self,
                              kind: FeatureKind,
                              species_id: Uuid,
                              labels: &[String])
                              -> Result<Vec<FeatureRecord>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let sid = species_id.to_string();
        let mut out = Vec::new();
        for chunk in labels.chunks(BIND_CHUNK) {
            match kind {
                FeatureKind::Gene => {
                    let rows: Vec<GeneRow> = genes::table.filter(genes::species_id.eq(&sid))
                                                         .filter(genes::label.eq_any(chunk))
                                                         .load(&mut conn)
                                                         .map_err(PersistenceError::from)?;
                    for row in rows {
                        out.push(FeatureRecord::try_from(row).map_err(RegistryError::from)?);
                    }
                }
                FeatureKind::Protein => {
                    let rows: Vec<ProteinRow> = proteins::table.filter(proteins::species_id.eq(&sid))
                                                               .filter(proteins::label.eq_any(chunk))
                                                               .load(&mut conn)
                                                               .map_err(PersistenceError::from)?;
                    for row in rows {
                        out.push(FeatureRecord::try_from(row).map_err(RegistryError::from)?);
                    }
                }
                FeatureKind::CellMarker => {
                    let rows: Vec<CellMarkerRow> =
                        cell_markers::table.filter(cell_markers::species_id.eq(&sid))
                                           .filter(cell_markers::label.eq_any(chunk))
                                           .load(&mut conn)
                                           .map_err(PersistenceError::from)?;
                    for row in rows {
                        out.push(FeatureRecord::try_from(row).map_err(RegistryError::from)?);
                    }
                }
            }
        }
        Ok(out)
    }

    fn add_feature_records(&mut self, kind: FeatureKind, records: &[FeatureRecord]) -> Result<(), RegistryError> {
        if records.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.acquire()?;
        let mut conn = self.provider.connection()?;
        conn.transaction::<_, PersistenceError, _>(|tx| {
                match kind {
                    FeatureKind::Gene => {
                        let rows: Vec<GeneRow> = records.iter().map(GeneRow::from).collect();
                        for chunk in rows.chunks(BIND_CHUNK) {
                            diesel::insert_into(genes::table).values(chunk).execute(tx)?;
                        }
                    }
                    FeatureKind::Protein => {
                        let rows: Vec<ProteinRow> = records.iter().map(ProteinRow::from).collect();
                        for chunk in rows.chunks(BIND_CHUNK) {
                            diesel::insert_into(proteins::table).values(chunk).execute(tx)?;
                        }
                    }
                    FeatureKind::CellMarker => {
                        let rows: Vec<CellMarkerRow> = records.iter().map(CellMarkerRow::from).collect();
                        for chunk in rows.chunks(BIND_CHUNK) {
                            diesel::insert_into(cell_markers::table).values(chunk).execute(tx)?;
                        }
                    }
                }
                Ok(())
            })?;
        debug!("add_feature_records: {} filas de {kind}", records.len());
        Ok(())
    }

    fn get_feature_set(&self, id: &str, kind: FeatureKind) -> Result<Option<FeatureSet>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let row: Option<FeatureSetRow> = feature_sets::table.filter(feature_sets::id.eq(id))
                                                            .filter(feature_sets::kind.eq(kind.as_str()))
                                                            .first(&mut conn)
                                                            .optional()
                                                            .map_err(PersistenceError::from)?;
        row.map(|r| FeatureSet::try_from(r).map_err(RegistryError::from)).transpose()
    }

    fn add_feature_set(&mut self, set: &FeatureSet) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let row = FeatureSetRow::from(set);
        let mut conn = self.provider.connection()?;
        diesel::insert_into(feature_sets::table).values(&row)
                                                .execute(&mut conn)
                                                .map_err(PersistenceError::from)?;
        Ok(())
    }

    fn attach_genes(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let mut conn = self.provider.connection()?;
        conn.transaction::<_, PersistenceError, _>(|tx| {
                for id in record_ids {
                    diesel::insert_into(feature_sets_genes::table)
                        .values((feature_sets_genes::feature_set_id.eq(set_id),
                                 feature_sets_genes::gene_id.eq(id.to_string())))
                        .on_conflict_do_nothing()
                        .execute(tx)?;
                }
                Ok(())
            })?;
        Ok(())
    }

    fn attach_proteins(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let mut conn = self.provider.connection()?;
        conn.transaction::<_, PersistenceError, _>(|tx| {
                for id in record_ids {
                    diesel::insert_into(feature_sets_proteins::table)
                        .values((feature_sets_proteins::feature_set_id.eq(set_id),
                                 feature_sets_proteins::protein_id.eq(id.to_string())))
                        .on_conflict_do_nothing()
                        .execute(tx)?;
                }
                Ok(())
            })?;
        Ok(())
    }

    fn attach_cell_markers(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let mut conn = self.provider.connection()?;
        conn.transaction::<_, PersistenceError, _>(|tx| {
                for id in record_ids {
                    diesel::insert_into(feature_sets_cell_markers::table)
                        .values((feature_sets_cell_markers::feature_set_id.eq(set_id),
                                 feature_sets_cell_markers::cell_marker_id.eq(id.to_string())))
                        .on_conflict_do_nothing()
                        .execute(tx)?;
                }
                Ok(())
            })?;
        Ok(())
    }

    fn feature_set_members(&self, set_id: &str, kind: FeatureKind) -> Result<Vec<Uuid>, RegistryError> {
        let mut conn = self.provider.connection()?;
        let raw: Vec<String> = match kind {
            FeatureKind::Gene => {
                feature_sets_genes::table.filter(feature_sets_genes::feature_set_id.eq(set_id))
                                         .order(feature_sets_genes::gene_id.asc())
                                         .select(feature_sets_genes::gene_id)
                                         .load(&mut conn)
                                         .map_err(PersistenceError::from)?
            }
            FeatureKind::Protein => {
                feature_sets_proteins::table.filter(feature_sets_proteins::feature_set_id.eq(set_id))
                                            .order(feature_sets_proteins::protein_id.asc())
                                            .select(feature_sets_proteins::protein_id)
                                            .load(&mut conn)
                                            .map_err(PersistenceError::from)?
            }
            FeatureKind::CellMarker => {
                feature_sets_cell_markers::table.filter(feature_sets_cell_markers::feature_set_id.eq(set_id))
                                                .order(feature_sets_cell_markers::cell_marker_id.asc())
                                                .select(feature_sets_cell_markers::cell_marker_id)
                                                .load(&mut conn)
                                                .map_err(PersistenceError::from)?
            }
        };
        raw.iter()
           .map(|s| Uuid::parse_str(s).map_err(|e| RegistryError::Backend(format!("uuid inválido {s}: {e}"))))
           .collect()
    }

    fn link_feature_set(&mut self, data_object_id: Uuid, set_id: &str) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let mut conn = self.provider.connection()?;
        diesel::insert_into(data_objects_feature_sets::table)
            .values((data_objects_feature_sets::data_object_id.eq(data_object_id.to_string()),
                     data_objects_feature_sets::feature_set_id.eq(set_id)))
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(PersistenceError::from)?;
        Ok(())
    }

    fn record_usage(&mut self, event: &UsageEvent) -> Result<(), RegistryError> {
        let _guard = self.lock.acquire()?;
        let row = NewUsageRow::from(event);
        let mut conn = self.provider.connection()?;
        diesel::insert_into(usage_events::table).values(&row)
                                                .execute(&mut conn)
                                                .map_err(PersistenceError::from)?;
        Ok(())
    }
}
