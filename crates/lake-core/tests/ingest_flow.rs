//! Flujo integrado: ingesta → curación → acceso con tracking de inputs,
//! sobre el backend en memoria.

use lake_core::{
    load, stream, track_run_input, CoreError, DataObjectFilter, Ingest, InMemoryRegistry, KnowledgeTable,
    MemoryRep, RecordInput, Registry, RunContext, Settings,
};
use lake_domain::FeatureKind;
use polars::prelude::*;

fn expression_table() -> DataFrame {
    DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A", "MYC"]),
                        Series::new("count", &[12i64, 40, 7]),]).unwrap()
}

fn gene_knowledge() -> KnowledgeTable {
    let table = DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A", "FOXP3"]),
                                    Series::new("name", &["cd4 molecule", "cd8 subunit alpha", "forkhead box P3"]),])
        .unwrap();
    KnowledgeTable::new(FeatureKind::Gene, "human", "gene_symbol", table).unwrap()
}

#[test]
fn parquet_round_trip_preserves_schema_and_values() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_storage_root(dir.path());
    let mut reg = InMemoryRegistry::new();
    let ctx = RunContext::track(Some("roundtrip"), None, None, &settings, &mut reg).unwrap();

    let original = expression_table();
    let mut ingest = Ingest::new();
    ingest.add(RecordInput::Table(original.clone()), Some("expr"), None, None, &settings, &reg).unwrap();
    let obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);

    let loaded = load(&obj, false, None, None, &settings, &mut reg).unwrap();
    match loaded {
        MemoryRep::Table(df) => {
            assert_eq!(df.get_column_names(), original.get_column_names());
            assert_eq!(df.height(), original.height());
            assert!(df.equals(&original));
        }
        other => panic!("se esperaba tabla, llegó {other:?}"),
    }
}

#[test]
fn curation_reuses_feature_set_across_objects() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_storage_root(dir.path());
    let mut reg = InMemoryRegistry::new();
    let ctx = RunContext::track(Some("curation"), None, None, &settings, &mut reg).unwrap();
    let knowledge = gene_knowledge();

    let mut first = Ingest::new();
    first.add(RecordInput::Table(expression_table()), Some("a"), None, Some(knowledge.clone()), &settings, &reg)
         .unwrap();
    first.commit(&ctx, &settings, &mut reg).unwrap();

    // segundo dataset con los mismos labels en otro orden
    let permuted = DataFrame::new(vec![Series::new("gene_symbol", &["MYC", "CD4", "CD8A"]),
                                       Series::new("count", &[1i64, 2, 3]),]).unwrap();
    let mut second = Ingest::new();
    second.add(RecordInput::Table(permuted), Some("b"), None, Some(knowledge), &settings, &reg).unwrap();
    second.commit(&ctx, &settings, &mut reg).unwrap();

    // un único FeatureSet y una única fila por label, compartidas
    let set_hash = lake_core::hash_set(["CD4", "CD8A", "MYC"]);
    let set = reg.get_feature_set(&set_hash, FeatureKind::Gene).unwrap().unwrap();
    assert_eq!(reg.feature_set_members(set.id(), FeatureKind::Gene).unwrap().len(), 3);
    let species_id = reg.get_species("human").unwrap().unwrap().id();
    let cd4 = reg.select_feature_records(FeatureKind::Gene, species_id, &["CD4".to_string()]).unwrap();
    assert_eq!(cd4.len(), 1);
}

#[test]
fn consumer_run_links_inputs_once_and_streams_matrices() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_storage_root(dir.path());
    let mut reg = InMemoryRegistry::new();
    let producer = RunContext::track(Some("producer"), None, None, &settings, &mut reg).unwrap();

    let obs = DataFrame::new(vec![Series::new("cell", &["c1", "c2"])]).unwrap();
    let var = DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A"])]).unwrap();
    let matrix = lake_core::AnnMatrix::new(vec![vec![1.0, 0.0], vec![3.5, 2.0]], obs, var).unwrap();

    let mut ingest = Ingest::new();
    ingest.add(RecordInput::Matrix(matrix), Some("pbmc"), Some("zarr"), None, &settings, &reg).unwrap();
    let obj = ingest.commit(&producer, &settings, &mut reg).unwrap().remove(0);

    let consumer = RunContext::track(Some("consumer"), None, None, &settings, &mut reg).unwrap();
    let acc = stream(&obj, Some(&consumer), Some(true), &settings, &mut reg).unwrap();
    assert_eq!(acc.var().height(), 2);
    assert_eq!(acc.to_matrix().unwrap().x()[1], vec![3.5, 2.0]);

    // segunda pasada: el enlace no se duplica
    track_run_input(&obj, Some(&consumer), Some(true), &settings, &mut reg).unwrap();
    assert_eq!(reg.run_inputs(consumer.run().id()).unwrap(), vec![obj.id()]);

    // el objeto sigue seleccionable por hash... no: es streaming, sin hash;
    // por run del productor sí
    let by_run = reg.select_data_objects(&DataObjectFilter::default().with_run(producer.run().id())).unwrap();
    assert_eq!(by_run.len(), 1);
    assert!(by_run[0].hash().is_none());
}

#[test]
fn stream_gates_on_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_storage_root(dir.path());
    let mut reg = InMemoryRegistry::new();
    let ctx = RunContext::track(None, None, None, &settings, &mut reg).unwrap();

    let mut ingest = Ingest::new();
    ingest.add(RecordInput::Table(expression_table()), Some("t"), Some("csv"), None, &settings, &reg).unwrap();
    let obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);
    assert_eq!(obj.suffix(), ".csv");

    let err = stream(&obj, Some(&ctx), None, &settings, &mut reg);
    assert!(matches!(err, Err(CoreError::SuffixNotSupported { .. })));
}
