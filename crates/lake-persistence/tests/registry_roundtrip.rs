//! Paridad del backend SQLite: alta, selección, enlaces y borrado sobre una
//! base temporal.

use lake_core::registry::DataObjectFilter;
use lake_core::Registry;
use lake_domain::{DataObject, FeatureKind, FeatureRecord, FeatureSet, Run, UsageEvent, UsageKind};
use lake_persistence::SqliteRegistry;

fn open_registry(dir: &std::path::Path) -> SqliteRegistry<lake_persistence::PoolProvider> {
    SqliteRegistry::open(&dir.join("lake.db"), 2).expect("registry")
}

fn sample_object(reg: &mut dyn Registry) -> DataObject {
    let run = Run::new(Some("producer"), None, None, "tester").unwrap();
    reg.add_run(&run).unwrap();
    let storage = reg.get_or_create_storage_root("/tmp/lake-root").unwrap();
    let obj = DataObject::new("pbmc", ".parquet", Some("AAAAAAAAAAAAAAAAAAAA".to_string()), 64, storage.id(),
                              run.id(), "tester").unwrap();
    reg.add_data_object(&obj).unwrap();
    obj
}

#[test]
fn data_object_round_trip_and_hash_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let mut reg = open_registry(dir.path());
    let obj = sample_object(&mut reg);

    let by_hash = reg.select_data_objects(&DataObjectFilter::by_hash("AAAAAAAAAAAAAAAAAAAA")).unwrap();
    assert_eq!(by_hash.len(), 1);
    assert_eq!(by_hash[0], obj);

    let by_name = reg.select_data_objects(&DataObjectFilter::default().with_name("pbmc").with_suffix(".parquet"))
                     .unwrap();
    assert_eq!(by_name.len(), 1);

    let none = reg.select_data_objects(&DataObjectFilter::by_hash("BBBBBBBBBBBBBBBBBBBB")).unwrap();
    assert!(none.is_empty());
}

#[test]
fn link_run_input_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut reg = open_registry(dir.path());
    let obj = sample_object(&mut reg);

    let consumer = Run::new(Some("consumer"), None, None, "tester").unwrap();
    reg.add_run(&consumer).unwrap();

    assert!(reg.link_run_input(consumer.id(), obj.id()).unwrap());
    assert!(!reg.link_run_input(consumer.id(), obj.id()).unwrap());
    assert_eq!(reg.run_inputs(consumer.id()).unwrap(), vec![obj.id()]);
}

#[test]
fn delete_removes_links_before_row() {
    let dir = tempfile::tempdir().unwrap();
    let mut reg = open_registry(dir.path());
    let obj = sample_object(&mut reg);

    let consumer = Run::new(Some("consumer"), None, None, "tester").unwrap();
    reg.add_run(&consumer).unwrap();
    reg.link_run_input(consumer.id(), obj.id()).unwrap();
    reg.record_usage(&UsageEvent::now(obj.id(), UsageKind::Delete, "tester")).unwrap();

    reg.delete_data_object(obj.id()).unwrap();

    assert!(reg.select_data_objects(&DataObjectFilter::by_id(obj.id())).unwrap().is_empty());
    assert!(reg.run_inputs(consumer.id()).unwrap().is_empty());
    // la auditoría sobrevive al borrado de la fila
    let usage = reg.usage_for(obj.id()).unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].0, "delete");

    // borrar lo ya borrado: NotFound
    assert!(reg.delete_data_object(obj.id()).is_err());
}

#[test]
fn feature_tables_are_species_scoped_and_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let mut reg = open_registry(dir.path());

    let human = reg.get_or_create_species("human").unwrap();
    let mouse = reg.get_or_create_species("mouse").unwrap();
    assert_ne!(human.id(), mouse.id());
    // idempotente
    assert_eq!(reg.get_or_create_species("human").unwrap().id(), human.id());

    let cd4 = FeatureRecord::new("CD4", Some("cd4 molecule"), human.id()).unwrap();
    let cd4_mouse = FeatureRecord::new("CD4", None, mouse.id()).unwrap();
    reg.add_feature_records(FeatureKind::Gene, &[cd4.clone()]).unwrap();
    reg.add_feature_records(FeatureKind::Gene, &[cd4_mouse]).unwrap();

    let found = reg.select_feature_records(FeatureKind::Gene, human.id(), &["CD4".to_string()]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), cd4.id());

    // misma label como proteína: tabla distinta, vacía
    let as_protein = reg.select_feature_records(FeatureKind::Protein, human.id(), &["CD4".to_string()]).unwrap();
    assert!(as_protein.is_empty());
}

#[test]
fn feature_set_attachment_per_kind() {
    let dir = tempfile::tempdir().unwrap();
    let mut reg = open_registry(dir.path());

    let human = reg.get_or_create_species("human").unwrap();
    let rec = FeatureRecord::new("P01308", Some("insulin"), human.id()).unwrap();
    reg.add_feature_records(FeatureKind::Protein, &[rec.clone()]).unwrap();

    let set_hash = lake_core::hash_set(["P01308"]);
    let set = FeatureSet::new(&set_hash, FeatureKind::Protein).unwrap();
    reg.add_feature_set(&set).unwrap();
    reg.attach_proteins(set.id(), &[rec.id()]).unwrap();
    // re-adjuntar es no-op
    reg.attach_proteins(set.id(), &[rec.id()]).unwrap();

    assert_eq!(reg.feature_set_members(set.id(), FeatureKind::Protein).unwrap(), vec![rec.id()]);
    assert!(reg.feature_set_members(set.id(), FeatureKind::Gene).unwrap().is_empty());

    // buscar el set con el kind equivocado no lo encuentra
    assert!(reg.get_feature_set(set.id(), FeatureKind::Gene).unwrap().is_none());
    assert!(reg.get_feature_set(set.id(), FeatureKind::Protein).unwrap().is_some());
}

#[test]
fn reopening_the_database_preserves_rows_and_reruns_no_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let obj_id = {
        let mut reg = open_registry(dir.path());
        sample_object(&mut reg).id()
    };
    // reabrir: migraciones ya aplicadas, datos presentes
    let reg = open_registry(dir.path());
    let found = reg.select_data_objects(&DataObjectFilter::by_id(obj_id)).unwrap();
    assert_eq!(found.len(), 1);
}
