//! Ingesta por staging: serializar → hashear → chequear duplicados → commit.
//!
//! `Ingest` acumula objetos staged y los materializa todos en `commit`:
//! cura features, copia al storage bajo la clave `{id}{suffix}`, inserta los
//! registros y deja rastro de auditoría. El chequeo de duplicados corre al
//! stagear, con política explícita (warn o reject).

use std::path::Path;

use log::{info, warn};

use lake_domain::data_object::STREAMING_SUFFIX;
use lake_domain::{DataObject, FeatureSet, UsageEvent, UsageKind};

use crate::config::{DuplicatePolicy, Settings};
use crate::context::RunContext;
use crate::curate::{curate_features, KnowledgeTable};
use crate::errors::CoreError;
use crate::hashing::hash_file;
use crate::registry::{DataObjectFilter, Registry};
use crate::serialize::{serialize, RecordInput, Serialized};
use crate::storage;
use crate::table::MemoryRep;

/// Hash de contenido para dedupe. `None` para el formato streaming, que no
/// tiene archivo único que hashear.
pub fn content_hash(local_path: &Path, suffix: &str) -> Result<Option<String>, CoreError> {
    if suffix == STREAMING_SUFFIX {
        return Ok(None);
    }
    Ok(Some(hash_file(local_path)?))
}

/// Chequeo de duplicados contra el registro. Con `Warn` la ingesta sigue;
/// con `Reject` falla.
fn check_duplicate(hash: &str, policy: DuplicatePolicy, registry: &dyn Registry) -> Result<(), CoreError> {
    let existing = registry.select_data_objects(&DataObjectFilter::by_hash(hash))?;
    if let Some(dup) = existing.first() {
        match policy {
            DuplicatePolicy::Warn => {
                warn!("el mismo contenido ya está registrado (hash {hash}): {dup}");
            }
            DuplicatePolicy::Reject => {
                return Err(CoreError::Duplicate { hash: hash.to_string(),
                                                  existing: dup.id() });
            }
        }
    }
    Ok(())
}

/// Objeto staged a la espera de commit.
pub struct StagedObject {
    serialized: Serialized,
    size: i64,
    hash: Option<String>,
    knowledge: Option<KnowledgeTable>,
}

impl StagedObject {
    pub fn name(&self) -> &str { &self.serialized.name }
    pub fn suffix(&self) -> &str { &self.serialized.suffix }
    pub fn hash(&self) -> Option<&str> { self.hash.as_deref() }
    pub fn size(&self) -> i64 { self.size }
}

/// Área de staging de la ingesta.
#[derive(Default)]
pub struct Ingest {
    staged: Vec<StagedObject>,
}

impl Ingest {
    pub fn new() -> Self { Self::default() }

    /// Stagea un objeto para ingesta. `name` es obligatorio para entradas en
    /// memoria; `knowledge` enlaza features durante el commit.
    pub fn add(&mut self,
               input: RecordInput,
               name: Option<&str>,
               format: Option<&str>,
               knowledge: Option<KnowledgeTable>,
               settings: &Settings,
               registry: &dyn Registry)
               -> Result<&StagedObject, CoreError> {
        settings.ensure_dirs()?;
        let serialized = serialize(input, name, format, settings.cache_dir())?;
        let size = staged_size(&serialized)?;
        let hash = content_hash(&serialized.local_path, &serialized.suffix)?;
        if let Some(h) = &hash {
            check_duplicate(h, settings.duplicate_policy(), registry)?;
        }
        self.staged.push(StagedObject { serialized,
                                        size,
                                        hash,
                                        knowledge });
        Ok(self.staged.last().expect("recién pusheado"))
    }

    /// Objetos staged pendientes de commit.
    pub fn status(&self) -> &[StagedObject] { &self.staged }

    /// Materializa todos los objetos staged: curación, storage, registros y
    /// auditoría. Consume el área de staging.
    pub fn commit(self,
                  ctx: &RunContext,
                  settings: &Settings,
                  registry: &mut dyn Registry)
                  -> Result<Vec<DataObject>, CoreError> {
        let storage_record = registry.get_or_create_storage_root(&settings.storage_root().to_string_lossy())?;
        let mut committed = Vec::with_capacity(self.staged.len());
        for staged in self.staged {
            let StagedObject { serialized, size, hash, knowledge } = staged;

            // Curación de features antes de insertar el objeto, para poder
            // enlazar el FeatureSet resultante.
            let feature_set = match &knowledge {
                Some(k) => Some(curate_staged(k, &serialized, registry)?),
                None => None,
            };

            let obj = DataObject::new(&serialized.name,
                                      &serialized.suffix,
                                      hash,
                                      size,
                                      storage_record.id(),
                                      ctx.run().id(),
                                      settings.user())?;

            store_staged(&serialized, &obj, settings)?;
            registry.add_data_object(&obj)?;
            if let Some(set) = &feature_set {
                registry.link_feature_set(obj.id(), set.id())?;
            }
            registry.record_usage(&UsageEvent::now(obj.id(), UsageKind::Ingest, settings.user()))?;
            info!("ingresado {} ({}{}, {} bytes, run {})",
                  obj.name(),
                  obj.id().simple(),
                  obj.suffix(),
                  obj.size(),
                  ctx.run().id());
            committed.push(obj);
        }
        Ok(committed)
    }
}

fn staged_size(serialized: &Serialized) -> Result<i64, CoreError> {
    if serialized.suffix == STREAMING_SUFFIX {
        // Sin archivo único: estimar desde memoria o sumar el directorio.
        match &serialized.memory_rep {
            Some(MemoryRep::Matrix(m)) => Ok(m.estimated_size()),
            _ => Ok(storage::dir_size(&serialized.local_path)? as i64),
        }
    } else {
        Ok(std::fs::metadata(&serialized.local_path)?.len() as i64)
    }
}

fn curate_staged(knowledge: &KnowledgeTable,
                 serialized: &Serialized,
                 registry: &mut dyn Registry)
                 -> Result<FeatureSet, CoreError> {
    // Reusar la representación en memoria si quedó retenida; si la entrada
    // fue un path, cargarla recién ahora.
    let loaded;
    let rep = match &serialized.memory_rep {
        Some(rep) => rep,
        None => {
            loaded = storage::load_to_memory(&serialized.local_path, &serialized.suffix)?;
            &loaded
        }
    };
    curate_features(rep.feature_frame(), knowledge, registry)
}

fn store_staged(serialized: &Serialized, obj: &DataObject, settings: &Settings) -> Result<(), CoreError> {
    let key = obj.storage_key();
    if obj.is_streaming() {
        let dest = storage::filepath_for(settings, &key);
        match &serialized.memory_rep {
            Some(MemoryRep::Matrix(m)) => {
                storage::store_matrix_dir(m, &dest)?;
            }
            _ => {
                storage::copy_dir(&serialized.local_path, &dest)?;
            }
        }
    } else {
        storage::store_file(&serialized.local_path, settings, &key)?;
    }
    Ok(())
}
