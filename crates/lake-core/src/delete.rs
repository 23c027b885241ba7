//! Borrado de registros y (opcionalmente) de sus datos en storage.

use log::info;

use lake_domain::{DataObject, UsageEvent, UsageKind};

use crate::config::Settings;
use crate::errors::CoreError;
use crate::registry::Registry;
use crate::storage;

/// Borra el registro del objeto (el backend quita primero sus enlaces) y,
/// según el flag, también el dato en storage:
/// - `None`: conserva el dato y deja un hint (no hay prompt interactivo en
///   la librería).
/// - `Some(false)`: conserva el dato.
/// - `Some(true)`: elimina archivo o directorio del storage.
pub fn delete_data_object(obj: &DataObject,
                          delete_from_storage: Option<bool>,
                          settings: &Settings,
                          registry: &mut dyn Registry)
                          -> Result<(), CoreError> {
    // El rastro de auditoría se escribe antes de que el registro desaparezca.
    registry.record_usage(&UsageEvent::now(obj.id(), UsageKind::Delete, settings.user()))?;
    registry.delete_data_object(obj.id())?;
    info!("borrada la fila {} de data_objects", obj.id());

    let key = obj.storage_key();
    match delete_from_storage {
        Some(true) => {
            storage::delete_from_storage(settings, &key)?;
            info!("borrado el objeto {key} del storage");
        }
        Some(false) => {}
        None => {
            info!("se conserva {key} en storage; pase delete_from_storage=Some(true) para borrarlo");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::ingest::Ingest;
    use crate::registry::{DataObjectFilter, InMemoryRegistry, Registry};
    use crate::serialize::RecordInput;
    use polars::prelude::*;

    #[test]
    fn delete_removes_links_then_row_and_optionally_storage() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_storage_root(dir.path());
        let mut reg = InMemoryRegistry::new();
        let ctx = RunContext::track(Some("producer"), None, None, &settings, &mut reg).unwrap();

        let df = DataFrame::new(vec![Series::new("gene_symbol", &["CD4"])]).unwrap();
        let mut ingest = Ingest::new();
        ingest.add(RecordInput::Table(df), Some("t"), None, None, &settings, &reg).unwrap();
        let obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);

        // enlazar como input de otro run, para verificar que el borrado
        // limpia el enlace
        let consumer = RunContext::track(Some("consumer"), None, None, &settings, &mut reg).unwrap();
        reg.link_run_input(consumer.run().id(), obj.id()).unwrap();

        let stored = crate::storage::filepath_for(&settings, &obj.storage_key());
        assert!(stored.exists());

        delete_data_object(&obj, Some(true), &settings, &mut reg).unwrap();

        assert!(reg.select_data_objects(&DataObjectFilter::by_id(obj.id())).unwrap().is_empty());
        assert!(reg.run_inputs(consumer.run().id()).unwrap().is_empty());
        assert!(!stored.exists());
        // la auditoría sobrevive al borrado
        assert!(reg.usage_events().iter().any(|e| e.kind == lake_domain::UsageKind::Delete));
    }

    #[test]
    fn delete_keeps_storage_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_storage_root(dir.path());
        let mut reg = InMemoryRegistry::new();
        let ctx = RunContext::track(None, None, None, &settings, &mut reg).unwrap();

        let df = DataFrame::new(vec![Series::new("gene_symbol", &["CD8A"])]).unwrap();
        let mut ingest = Ingest::new();
        ingest.add(RecordInput::Table(df), Some("t"), None, None, &settings, &reg).unwrap();
        let obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);

        delete_data_object(&obj, None, &settings, &mut reg).unwrap();
        assert!(crate::storage::filepath_for(&settings, &obj.storage_key()).exists());
    }
}
