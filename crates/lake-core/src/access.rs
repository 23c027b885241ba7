//! Acceso a objetos registrados: load / stage / stream, con tracking de
//! run-inputs y gating por sufijo.

use std::path::PathBuf;

use log::{info, warn};

use lake_domain::data_object::STREAMING_SUFFIX;
use lake_domain::{DataObject, UsageEvent, UsageKind};

use crate::config::Settings;
use crate::context::RunContext;
use crate::errors::CoreError;
use crate::registry::Registry;
use crate::storage::{self, MatrixAccessor};
use crate::table::MemoryRep;

/// Sufijos con matriz anotada subyacente (streameables).
const MATRIX_SUFFIXES: [&str; 2] = [".h5ad", STREAMING_SUFFIX];

/// Registra el objeto como input del run, según máquina de dos estados por
/// par (run, objeto): "no enlazado" → "enlazado", re-invocar es no-op.
///
/// Guardas:
/// - `is_run_input == None` y sin contexto: se omite con un hint informativo.
/// - `is_run_input == None` con contexto: decide
///   `Settings::track_run_inputs_on_load`.
/// - `is_run_input == Some(true)` sin contexto: error de configuración.
pub fn track_run_input(obj: &DataObject,
                       ctx: Option<&RunContext>,
                       is_run_input: Option<bool>,
                       settings: &Settings,
                       registry: &mut dyn Registry)
                       -> Result<(), CoreError> {
    let track = match is_run_input {
        None => {
            match ctx {
                Some(_) => {
                    info!("pase is_run_input=true para registrar este objeto como input del run");
                }
                None => {
                    info!("sin contexto de run: no se registra el acceso como input");
                }
            }
            settings.track_run_inputs_on_load() && ctx.is_some()
        }
        Some(requested) => requested,
    };
    if !track {
        return Ok(());
    }
    let ctx = ctx.ok_or(CoreError::MissingRunContext)?;
    let newly_linked = registry.link_run_input(ctx.run().id(), obj.id())?;
    if newly_linked {
        info!("objeto {} registrado como input del run {}", obj.id(), ctx.run().id());
    }
    Ok(())
}

/// Carga el objeto a memoria. `stream` solo aplica a sufijos con matriz
/// subyacente; para el resto se ignora con warning.
pub fn load(obj: &DataObject,
            stream: bool,
            ctx: Option<&RunContext>,
            is_run_input: Option<bool>,
            settings: &Settings,
            registry: &mut dyn Registry)
            -> Result<MemoryRep, CoreError> {
    if stream && !MATRIX_SUFFIXES.contains(&obj.suffix()) {
        warn!("ignorando stream para un objeto {}", obj.suffix());
    }
    track_run_input(obj, ctx, is_run_input, settings, registry)?;
    registry.record_usage(&UsageEvent::now(obj.id(), UsageKind::Load, settings.user()))?;
    let path = storage::filepath_for(settings, &obj.storage_key());
    storage::load_to_memory(&path, obj.suffix())
}

/// Devuelve el path local del objeto sin cargarlo. Los directorios
/// streaming no se stagean: no hay archivo único que devolver.
pub fn stage(obj: &DataObject,
             ctx: Option<&RunContext>,
             is_run_input: Option<bool>,
             settings: &Settings,
             registry: &mut dyn Registry)
             -> Result<PathBuf, CoreError> {
    if obj.is_streaming() {
        return Err(CoreError::SuffixNotSupported { suffix: obj.suffix().to_string(),
                                                   operation: "stage" });
    }
    track_run_input(obj, ctx, is_run_input, settings, registry)?;
    registry.record_usage(&UsageEvent::now(obj.id(), UsageKind::Stage, settings.user()))?;
    Ok(storage::filepath_for(settings, &obj.storage_key()))
}

/// Abre el objeto para acceso streaming. Requiere una matriz anotada
/// subyacente (`.h5ad` o `.zarr`).
pub fn stream(obj: &DataObject,
              ctx: Option<&RunContext>,
              is_run_input: Option<bool>,
              settings: &Settings,
              registry: &mut dyn Registry)
              -> Result<MatrixAccessor, CoreError> {
    if !MATRIX_SUFFIXES.contains(&obj.suffix()) {
        return Err(CoreError::SuffixNotSupported { suffix: obj.suffix().to_string(),
                                                   operation: "stream" });
    }
    track_run_input(obj, ctx, is_run_input, settings, registry)?;
    registry.record_usage(&UsageEvent::now(obj.id(), UsageKind::Stream, settings.user()))?;
    let path = storage::filepath_for(settings, &obj.storage_key());
    storage::open_matrix(&path, obj.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Ingest;
    use crate::registry::InMemoryRegistry;
    use crate::serialize::RecordInput;
    use crate::table::AnnMatrix;
    use polars::prelude::*;

    fn ingest_table(dir: &std::path::Path) -> (Settings, InMemoryRegistry, RunContext, DataObject) {
        let settings = Settings::with_storage_root(dir);
        let mut reg = InMemoryRegistry::new();
        let ctx = RunContext::track(Some("producer"), None, None, &settings, &mut reg).unwrap();
        let df = DataFrame::new(vec![Series::new("gene_symbol", &["CD4"]), Series::new("count", &[4i64])]).unwrap();
        let mut ingest = Ingest::new();
        ingest.add(RecordInput::Table(df), Some("t"), None, None, &settings, &reg).unwrap();
        let obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);
        (settings, reg, ctx, obj)
    }

    #[test]
    fn load_round_trips_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, _ctx, obj) = ingest_table(dir.path());
        match load(&obj, false, None, None, &settings, &mut reg).unwrap() {
            MemoryRep::Table(df) => {
                assert_eq!(df.height(), 1);
                assert_eq!(df.get_column_names(), vec!["gene_symbol", "count"]);
            }
            other => panic!("se esperaba tabla, llegó {other:?}"),
        }
    }

    #[test]
    fn run_input_linking_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, _producer, obj) = ingest_table(dir.path());
        let consumer = RunContext::track(Some("consumer"), None, None, &settings, &mut reg).unwrap();

        track_run_input(&obj, Some(&consumer), Some(true), &settings, &mut reg).unwrap();
        track_run_input(&obj, Some(&consumer), Some(true), &settings, &mut reg).unwrap();
        assert_eq!(reg.run_inputs(consumer.run().id()).unwrap(), vec![obj.id()]);
    }

    #[test]
    fn explicit_tracking_without_context_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, _ctx, obj) = ingest_table(dir.path());
        let err = track_run_input(&obj, None, Some(true), &settings, &mut reg);
        assert!(matches!(err, Err(CoreError::MissingRunContext)));
    }

    #[test]
    fn no_flag_and_no_context_skips_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, ctx, obj) = ingest_table(dir.path());
        track_run_input(&obj, None, None, &settings, &mut reg).unwrap();
        track_run_input(&obj, Some(&ctx), Some(false), &settings, &mut reg).unwrap();
        assert!(reg.run_inputs(ctx.run().id()).unwrap().is_empty());
    }

    #[test]
    fn stage_rejects_streaming_suffix_and_stream_rejects_tables() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, ctx, table_obj) = ingest_table(dir.path());

        // stream sobre tabular: error de tipo
        let err = stream(&table_obj, Some(&ctx), None, &settings, &mut reg);
        assert!(matches!(err, Err(CoreError::SuffixNotSupported { operation: "stream", .. })));

        // ingesta de una matriz streaming para probar stage
        let obs = DataFrame::new(vec![Series::new("cell", &["c1"])]).unwrap();
        let var = DataFrame::new(vec![Series::new("gene_symbol", &["CD4"])]).unwrap();
        let m = AnnMatrix::new(vec![vec![1.0]], obs, var).unwrap();
        let mut ingest = Ingest::new();
        ingest.add(RecordInput::Matrix(m), Some("m"), Some("zarr"), None, &settings, &reg).unwrap();
        let zarr_obj = ingest.commit(&ctx, &settings, &mut reg).unwrap().remove(0);

        let err = stage(&zarr_obj, Some(&ctx), None, &settings, &mut reg);
        assert!(matches!(err, Err(CoreError::SuffixNotSupported { operation: "stage", .. })));

        // stream sí abre la matriz streaming
        let acc = stream(&zarr_obj, Some(&ctx), None, &settings, &mut reg).unwrap();
        assert_eq!(acc.var().height(), 1);
    }

    #[test]
    fn stage_returns_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, mut reg, ctx, obj) = ingest_table(dir.path());
        let path = stage(&obj, Some(&ctx), None, &settings, &mut reg).unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".parquet"));
    }
}
