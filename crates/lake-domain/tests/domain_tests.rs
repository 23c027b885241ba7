use lake_domain::{DataObject, FeatureKind, FeatureRecord, FeatureSet, Run, Species, StorageRoot};
use uuid::Uuid;

#[test]
fn test_data_object_storage_key() {
    let storage = Uuid::new_v4();
    let run = Uuid::new_v4();
    let obj = DataObject::new("pbmc", ".parquet", Some("aGFzaGhhc2hoYXNoaGFz".to_string()), 128, storage, run,
                              "testuser").unwrap();
    assert_eq!(obj.storage_key(), format!("{}{}", obj.id().simple(), ".parquet"));
    assert!(!obj.is_streaming());
}

#[test]
fn test_data_object_rejects_empty_name() {
    let err = DataObject::new("  ", ".csv", None, 0, Uuid::new_v4(), Uuid::new_v4(), "u");
    assert!(err.is_err());
}

#[test]
fn test_data_object_rejects_bad_suffix() {
    let err = DataObject::new("x", "csv", None, 0, Uuid::new_v4(), Uuid::new_v4(), "u");
    assert!(err.is_err());
}

#[test]
fn test_streaming_object_must_not_carry_hash() {
    // Un .zarr se streamea por directorio: no existe hash de archivo único
    let err = DataObject::new("m", ".zarr", Some("aGFzaGhhc2hoYXNoaGFz".to_string()), 10, Uuid::new_v4(),
                              Uuid::new_v4(), "u");
    assert!(err.is_err());
    let ok = DataObject::new("m", ".zarr", None, 10, Uuid::new_v4(), Uuid::new_v4(), "u").unwrap();
    assert!(ok.is_streaming());
    assert!(ok.hash().is_none());
}

#[test]
fn test_feature_kind_round_trip() {
    for kind in [FeatureKind::Gene, FeatureKind::Protein, FeatureKind::CellMarker] {
        let parsed: FeatureKind = kind.as_str().parse().unwrap();
        assert_eq!(parsed, kind);
    }
    assert!("plasmid".parse::<FeatureKind>().is_err());
}

#[test]
fn test_feature_set_id_must_be_set_hash() {
    assert!(FeatureSet::new("short", FeatureKind::Gene).is_err());
    let fs = FeatureSet::new("AAAAAAAAAAAAAAAAAAAA", FeatureKind::Protein).unwrap();
    assert_eq!(fs.id().len(), 20);
    assert_eq!(fs.kind(), FeatureKind::Protein);
}

#[test]
fn test_run_reference_type_requires_reference() {
    assert!(Run::new(Some("fit model"), None, Some("url"), "u").is_err());
    let run = Run::new(Some("fit model"), Some("https://example.org/nb"), Some("url"), "u").unwrap();
    assert_eq!(run.reference(), Some("https://example.org/nb"));
}

#[test]
fn test_species_and_feature_record_validation() {
    assert!(Species::new(" ").is_err());
    let species = Species::new("human").unwrap();
    assert!(FeatureRecord::new("", None, species.id()).is_err());
    let rec = FeatureRecord::new("CD8A", Some("CD8 subunit alpha"), species.id()).unwrap();
    assert_eq!(rec.label(), "CD8A");
    assert_eq!(rec.species_id(), species.id());
}

#[test]
fn test_storage_root_validation() {
    assert!(StorageRoot::new("").is_err());
    let root = StorageRoot::new("/tmp/lake-storage").unwrap();
    assert_eq!(root.root(), "/tmp/lake-storage");
}
