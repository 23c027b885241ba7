//! Curación de features contra tablas de conocimiento por especie.
//!
//! La operación está partida en dos fases explícitas:
//! - `plan_feature_curation` (solo lectura): cura labels, calcula el hash del
//!   conjunto y resuelve qué existe ya en el registro.
//! - `apply_feature_curation` (escritura): materializa especie, filas de
//!   referencia y FeatureSet según el plan. La reutilización completa no
//!   escribe nada.

pub mod knowledge;
pub mod plan;

pub use knowledge::{CuratedTable, KnowledgeTable};
pub use plan::{apply_feature_curation, curate_features, plan_feature_curation, CurationPlan};
