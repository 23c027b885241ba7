use std::path::PathBuf;

use lake_core::{delete_data_object, DataObjectFilter, Ingest, RecordInput, Registry, RunContext, Settings};
use lake_persistence::{DbConfig, PoolProvider, SqliteRegistry};
use uuid::Uuid;

fn open_registry(settings: &Settings) -> Result<SqliteRegistry<PoolProvider>, String> {
    // Si hay LAKE_DB_PATH / DATABASE_URL se usa eso; si no, la base vive
    // dentro de la raíz de storage.
    let cfg = DbConfig::from_env().unwrap_or_else(|| DbConfig::from_path(&settings.storage_root().join("lake.db")));
    SqliteRegistry::from_config(&cfg).map_err(|e| format!("no se pudo abrir la base: {e}"))
}

fn usage() -> ! {
    eprintln!("Uso: lake-cli <init|ingest|ls|delete> [opciones]");
    eprintln!("  init");
    eprintln!("  ingest <archivo> [--name <N>] [--run <NOMBRE>]");
    eprintln!("  ls [--suffix <S>] [--name <N>]");
    eprintln!("  delete --id <UUID> [--purge]");
    std::process::exit(2);
}

fn main() {
    // Cargar .env si existe y levantar logging (RUST_LOG manda si está).
    let _ = dotenvy::dotenv();
    let _logger = flexi_logger::Logger::try_with_env_or_str("info").ok().and_then(|l| l.start().ok());

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }
    let settings = Settings::from_env();

    match args[1].as_str() {
        "init" => {
            if let Err(e) = settings.ensure_dirs() {
                eprintln!("[lake init] error creando directorios: {e}");
                std::process::exit(5);
            }
            let mut registry = match open_registry(&settings) {
                Ok(r) => r,
                Err(e) => { eprintln!("[lake init] {e}"); std::process::exit(5); }
            };
            match registry.get_or_create_storage_root(&settings.storage_root().to_string_lossy()) {
                Ok(root) => println!("instancia lista: storage {} ({})", root.root(), root.id()),
                Err(e) => { eprintln!("[lake init] {e}"); std::process::exit(5); }
            }
        }
        "ingest" => {
            if args.len() < 3 {
                usage();
            }
            let filepath = PathBuf::from(&args[2]);
            let mut name: Option<String> = None;
            let mut run_name: Option<String> = None;
            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--name" => {
                        i += 1;
                        if i < args.len() { name = Some(args[i].clone()); }
                    }
                    "--run" => {
                        i += 1;
                        if i < args.len() { run_name = Some(args[i].clone()); }
                    }
                    _ => {}
                }
                i += 1;
            }
            if !filepath.exists() {
                eprintln!("[lake ingest] archivo no encontrado: {}", filepath.display());
                std::process::exit(4);
            }
            let mut registry = match open_registry(&settings) {
                Ok(r) => r,
                Err(e) => { eprintln!("[lake ingest] {e}"); std::process::exit(5); }
            };
            let result = RunContext::track(run_name.as_deref().or(Some("lake-cli ingest")), None, None,
                                           &settings, &mut registry)
                .and_then(|ctx| {
                    let mut ingest = Ingest::new();
                    ingest.add(RecordInput::Path(filepath), name.as_deref(), None, None, &settings, &registry)?;
                    ingest.commit(&ctx, &settings, &mut registry)
                });
            match result {
                Ok(objects) => {
                    for obj in objects {
                        println!("ingresado: {} ({}{}, {} bytes)",
                                 obj.name(),
                                 obj.id().simple(),
                                 obj.suffix(),
                                 obj.size());
                    }
                }
                Err(e) => {
                    eprintln!("[lake ingest] error: {e}");
                    std::process::exit(5);
                }
            }
        }
        "ls" => {
            let mut filter = DataObjectFilter::default();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--suffix" => {
                        i += 1;
                        if i < args.len() { filter = filter.with_suffix(&args[i]); }
                    }
                    "--name" => {
                        i += 1;
                        if i < args.len() { filter = filter.with_name(&args[i]); }
                    }
                    _ => {}
                }
                i += 1;
            }
            let registry = match open_registry(&settings) {
                Ok(r) => r,
                Err(e) => { eprintln!("[lake ls] {e}"); std::process::exit(5); }
            };
            match registry.select_data_objects(&filter) {
                Ok(objects) => {
                    for obj in &objects {
                        println!("{}  {:<24} {:<10} {:>10}  run={}",
                                 obj.id(),
                                 obj.name(),
                                 obj.suffix(),
                                 obj.size(),
                                 obj.run_id());
                    }
                    println!("{} objetos", objects.len());
                }
                Err(e) => {
                    eprintln!("[lake ls] error: {e}");
                    std::process::exit(5);
                }
            }
        }
        "delete" => {
            let mut id: Option<Uuid> = None;
            let mut purge = false;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--id" => {
                        i += 1;
                        if i < args.len() { id = Uuid::parse_str(&args[i]).ok(); }
                    }
                    "--purge" => purge = true,
                    _ => {}
                }
                i += 1;
            }
            let Some(id) = id else { usage() };
            let mut registry = match open_registry(&settings) {
                Ok(r) => r,
                Err(e) => { eprintln!("[lake delete] {e}"); std::process::exit(5); }
            };
            let found = registry.select_data_objects(&DataObjectFilter::by_id(id))
                                .ok()
                                .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) });
            let Some(obj) = found else {
                eprintln!("[lake delete] objeto no encontrado: {id}");
                std::process::exit(4);
            };
            // sin prompt interactivo: --purge decide si el dato también se va
            match delete_data_object(&obj, Some(purge), &settings, &mut registry) {
                Ok(()) => println!("borrado: {} (storage {})", obj.id(), if purge { "purgado" } else { "conservado" }),
                Err(e) => {
                    eprintln!("[lake delete] error: {e}");
                    std::process::exit(5);
                }
            }
        }
        _ => usage(),
    }
}
