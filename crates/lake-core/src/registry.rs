//! Contrato de registro relacional (select/add/delete) y backend en memoria.
//!
//! El core emite consultas e inserciones a través de este trait y nunca
//! implementa almacenamiento propio. `InMemoryRegistry` da paridad 1:1 para
//! tests y prototipos; el backend durable vive en `lake-persistence`.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use lake_domain::{DataObject, FeatureKind, FeatureRecord, FeatureSet, Run, Species, StorageRoot, UsageEvent};

use crate::errors::RegistryError;

/// Filtro de selección para DataObjects. Los campos presentes se combinan
/// con AND.
#[derive(Debug, Clone, Default)]
pub struct DataObjectFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub suffix: Option<String>,
    pub hash: Option<String>,
    pub run_id: Option<Uuid>,
}

impl DataObjectFilter {
    pub fn by_id(id: Uuid) -> Self {
        DataObjectFilter { id: Some(id),
                           ..Default::default() }
    }

    pub fn by_hash(hash: &str) -> Self {
        DataObjectFilter { hash: Some(hash.to_string()),
                           ..Default::default() }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

/// Exactamente un resultado, si no error (semántica `one()`).
pub fn one<T>(mut results: Vec<T>) -> Result<T, RegistryError> {
    match results.len() {
        0 => Err(RegistryError::NotFound),
        1 => Ok(results.remove(0)),
        _ => Err(RegistryError::MultipleResults),
    }
}

/// A lo sumo un resultado (semántica `one_or_none()`).
pub fn one_or_none<T>(mut results: Vec<T>) -> Result<Option<T>, RegistryError> {
    match results.len() {
        0 => Ok(None),
        1 => Ok(Some(results.remove(0))),
        _ => Err(RegistryError::MultipleResults),
    }
}

/// Operaciones de registro tipadas. Las mutaciones de cada método son
/// atómicas en el backend (transacción + lock de instancia en SQLite).
pub trait Registry {
    // --- data objects ---
    fn add_data_object(&mut self, obj: &DataObject) -> Result<(), RegistryError>;
    fn select_data_objects(&self, filter: &DataObjectFilter) -> Result<Vec<DataObject>, RegistryError>;
    /// Borra el registro quitando antes sus enlaces (run inputs, feature
    /// sets).
    fn delete_data_object(&mut self, id: Uuid) -> Result<(), RegistryError>;

    // --- runs ---
    fn add_run(&mut self, run: &Run) -> Result<(), RegistryError>;
    fn get_run(&self, id: Uuid) -> Result<Option<Run>, RegistryError>;
    /// Enlaza un objeto como input de un run. Idempotente: devuelve `true`
    /// solo si el par no estaba enlazado (test de membresía antes de mutar).
    fn link_run_input(&mut self, run_id: Uuid, data_object_id: Uuid) -> Result<bool, RegistryError>;
    fn run_inputs(&self, run_id: Uuid) -> Result<Vec<Uuid>, RegistryError>;

    // --- storage ---
    fn get_or_create_storage_root(&mut self, root: &str) -> Result<StorageRoot, RegistryError>;

    // --- conocimiento / curación ---
    fn get_species(&self, common_name: &str) -> Result<Option<Species>, RegistryError>;
    fn get_or_create_species(&mut self, common_name: &str) -> Result<Species, RegistryError>;
    fn select_feature_records(&self,
                              kind: FeatureKind,
                              species_id: Uuid,
                              labels: &[String])
                              -> Result<Vec<FeatureRecord>, RegistryError>;
    fn add_feature_records(&mut self, kind: FeatureKind, records: &[FeatureRecord]) -> Result<(), RegistryError>;
    fn get_feature_set(&self, id: &str, kind: FeatureKind) -> Result<Option<FeatureSet>, RegistryError>;
    fn add_feature_set(&mut self, set: &FeatureSet) -> Result<(), RegistryError>;

    // Operaciones de attachment por variante: las tres relaciones son
    // distintas, no hay enlace polimórfico.
    fn attach_genes(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError>;
    fn attach_proteins(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError>;
    fn attach_cell_markers(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError>;
    fn feature_set_members(&self, set_id: &str, kind: FeatureKind) -> Result<Vec<Uuid>, RegistryError>;

    /// Enlaza un DataObject con un FeatureSet existente.
    fn link_feature_set(&mut self, data_object_id: Uuid, set_id: &str) -> Result<(), RegistryError>;

    // --- auditoría ---
    fn record_usage(&mut self, event: &UsageEvent) -> Result<(), RegistryError>;
}

/// Despacha el attachment según la variante etiquetada.
pub fn attach_for_kind(registry: &mut dyn Registry,
                       kind: FeatureKind,
                       set_id: &str,
                       record_ids: &[Uuid])
                       -> Result<(), RegistryError> {
    match kind {
        FeatureKind::Gene => registry.attach_genes(set_id, record_ids),
        FeatureKind::Protein => registry.attach_proteins(set_id, record_ids),
        FeatureKind::CellMarker => registry.attach_cell_markers(set_id, record_ids),
    }
}

/// Backend en memoria con paridad semántica respecto al durable.
#[derive(Default)]
pub struct InMemoryRegistry {
    data_objects: HashMap<Uuid, DataObject>,
    runs: HashMap<Uuid, Run>,
    run_inputs: HashSet<(Uuid, Uuid)>,
    storage_roots: HashMap<String, StorageRoot>,
    species: HashMap<String, Species>,
    features: HashMap<FeatureKind, Vec<FeatureRecord>>,
    feature_sets: HashMap<String, FeatureSet>,
    feature_links: HashMap<(String, FeatureKind), Vec<Uuid>>,
    object_feature_sets: HashSet<(Uuid, String)>,
    usage: Vec<UsageEvent>,
}

impl InMemoryRegistry {
    pub fn new() -> Self { Self::default() }

    /// Eventos de uso registrados (para asserts en tests).
    pub fn usage_events(&self) -> &[UsageEvent] { &self.usage }
}

impl Registry for InMemoryRegistry {
    fn add_data_object(&mut self, obj: &DataObject) -> Result<(), RegistryError> {
        if self.data_objects.contains_key(&obj.id()) {
            return Err(RegistryError::Conflict(format!("data object {} ya existe", obj.id())));
        }
        self.data_objects.insert(obj.id(), obj.clone());
        Ok(())
    }

    fn select_data_objects(&self, filter: &DataObjectFilter) -> Result<Vec<DataObject>, RegistryError> {
        let mut out: Vec<DataObject> =
            self.data_objects
                .values()
                .filter(|o| filter.id.map_or(true, |id| o.id() == id))
                .filter(|o| filter.name.as_deref().map_or(true, |n| o.name() == n))
                .filter(|o| filter.suffix.as_deref().map_or(true, |s| o.suffix() == s))
                .filter(|o| filter.hash.as_deref().map_or(true, |h| o.hash() == Some(h)))
                .filter(|o| filter.run_id.map_or(true, |r| o.run_id() == r))
                .cloned()
                .collect();
        out.sort_by_key(|o| o.created_at());
        Ok(out)
    }

    fn delete_data_object(&mut self, id: Uuid) -> Result<(), RegistryError> {
        if self.data_objects.remove(&id).is_none() {
            return Err(RegistryError::NotFound);
        }
        self.run_inputs.retain(|(_, obj)| *obj != id);
        self.object_feature_sets.retain(|(obj, _)| *obj != id);
        Ok(())
    }

    fn add_run(&mut self, run: &Run) -> Result<(), RegistryError> {
        self.runs.insert(run.id(), run.clone());
        Ok(())
    }

    fn get_run(&self, id: Uuid) -> Result<Option<Run>, RegistryError> { Ok(self.runs.get(&id).cloned()) }

    fn link_run_input(&mut self, run_id: Uuid, data_object_id: Uuid) -> Result<bool, RegistryError> {
        Ok(self.run_inputs.insert((run_id, data_object_id)))
    }

    fn run_inputs(&self, run_id: Uuid) -> Result<Vec<Uuid>, RegistryError> {
        let mut ids: Vec<Uuid> =
            self.run_inputs.iter().filter(|(r, _)| *r == run_id).map(|(_, obj)| *obj).collect();
        ids.sort();
        Ok(ids)
    }

    fn get_or_create_storage_root(&mut self, root: &str) -> Result<StorageRoot, RegistryError> {
        if let Some(existing) = self.storage_roots.get(root) {
            return Ok(existing.clone());
        }
        let record = StorageRoot::new(root).map_err(|e| RegistryError::Backend(e.to_string()))?;
        self.storage_roots.insert(root.to_string(), record.clone());
        Ok(record)
    }

    fn get_species(&self, common_name: &str) -> Result<Option<Species>, RegistryError> {
        Ok(self.species.get(common_name).cloned())
    }

    fn get_or_create_species(&mut self, common_name: &str) -> Result<Species, RegistryError> {
        if let Some(existing) = self.species.get(common_name) {
            return Ok(existing.clone());
        }
        let record = Species::new(common_name).map_err(|e| RegistryError::Backend(e.to_string()))?;
        self.species.insert(common_name.to_string(), record.clone());
        Ok(record)
    }

    fn select_feature_records(&self,
                              kind: FeatureKind,
                              species_id: Uuid,
                              labels: &[String])
                              -> Result<Vec<FeatureRecord>, RegistryError> {
        let wanted: HashSet<&str> = labels.iter().map(String::as_str).collect();
        Ok(self.features
               .get(&kind)
               .map(|records| {
                   records.iter()
                          .filter(|r| r.species_id() == species_id && wanted.contains(r.label()))
                          .cloned()
                          .collect()
               })
               .unwrap_or_default())
    }

    fn add_feature_records(&mut self, kind: FeatureKind, records: &[FeatureRecord]) -> Result<(), RegistryError> {
        self.features.entry(kind).or_default().extend(records.iter().cloned());
        Ok(())
    }

    fn get_feature_set(&self, id: &str, kind: FeatureKind) -> Result<Option<FeatureSet>, RegistryError> {
        Ok(self.feature_sets.get(id).filter(|fs| fs.kind() == kind).cloned())
    }

    fn add_feature_set(&mut self, set: &FeatureSet) -> Result<(), RegistryError> {
        if self.feature_sets.contains_key(set.id()) {
            return Err(RegistryError::Conflict(format!("feature set {} ya existe", set.id())));
        }
        self.feature_sets.insert(set.id().to_string(), set.clone());
        Ok(())
    }

    fn attach_genes(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        self.attach(set_id, FeatureKind::Gene, record_ids)
    }

    fn attach_proteins(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        self.attach(set_id, FeatureKind::Protein, record_ids)
    }

    fn attach_cell_markers(&mut self, set_id: &str, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        self.attach(set_id, FeatureKind::CellMarker, record_ids)
    }

    fn feature_set_members(&self, set_id: &str, kind: FeatureKind) -> Result<Vec<Uuid>, RegistryError> {
        Ok(self.feature_links.get(&(set_id.to_string(), kind)).cloned().unwrap_or_default())
    }

    fn link_feature_set(&mut self, data_object_id: Uuid, set_id: &str) -> Result<(), RegistryError> {
        self.object_feature_sets.insert((data_object_id, set_id.to_string()));
        Ok(())
    }

    fn record_usage(&mut self, event: &UsageEvent) -> Result<(), RegistryError> {
        self.usage.push(event.clone());
        Ok(())
    }
}

impl InMemoryRegistry {
    fn attach(&mut self, set_id: &str, kind: FeatureKind, record_ids: &[Uuid]) -> Result<(), RegistryError> {
        let members = self.feature_links.entry((set_id.to_string(), kind)).or_default();
        for id in record_ids {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        Ok(())
    }
}
