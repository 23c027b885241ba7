//! lake-core: capa de gestión de datos sobre el registro relacional.
//!
//! Flujo principal: serializar → hashear → chequear duplicados → commit al
//! storage y al registro, con curación de features contra tablas de
//! conocimiento y tracking de procedencia (runs e inputs).

pub mod access;
pub mod config;
pub mod context;
pub mod curate;
pub mod delete;
pub mod errors;
pub mod hashing;
pub mod ingest;
pub mod registry;
pub mod serialize;
pub mod storage;
pub mod table;

pub use access::{load, stage, stream, track_run_input};
pub use config::{DuplicatePolicy, Settings};
pub use context::RunContext;
pub use curate::{apply_feature_curation, curate_features, plan_feature_curation, CurationPlan, KnowledgeTable};
pub use delete::delete_data_object;
pub use errors::{CoreError, RegistryError};
pub use hashing::{hash_file, hash_set};
pub use ingest::{content_hash, Ingest};
pub use registry::{attach_for_kind, one, one_or_none, DataObjectFilter, InMemoryRegistry, Registry};
pub use serialize::{infer_suffix, name_suffix_from_filepath, serialize, RecordInput, Serialized};
pub use storage::MatrixAccessor;
pub use table::{AnnMatrix, MemoryRep};
