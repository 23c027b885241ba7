//! Fases de curación: plan (lectura) y apply (escritura).

use polars::prelude::DataFrame;
use std::collections::HashSet;

use log::{debug, info};

use lake_domain::{FeatureKind, FeatureRecord, FeatureSet};

use crate::curate::knowledge::KnowledgeTable;
use crate::errors::CoreError;
use crate::registry::{attach_for_kind, Registry};

/// Resultado de la fase de lectura. Describe todo lo que la fase de
/// escritura materializará; si `reuse` está presente, no hay nada que
/// escribir.
#[derive(Debug)]
pub struct CurationPlan {
    pub set_hash: String,
    pub kind: FeatureKind,
    pub species: String,
    /// FeatureSet idéntico ya registrado (reutilización completa, sin merge).
    pub reuse: Option<FeatureSet>,
    /// Filas de referencia que ya existen para los labels curados.
    pub existing: Vec<FeatureRecord>,
    /// Labels nuevos presentes en la fuente de conocimiento (label, nombre).
    pub new_mapped: Vec<(String, Option<String>)>,
    /// Labels nuevos que la fuente no conoce: se insertan solo con label y
    /// especie.
    pub new_unmapped: Vec<String>,
}

/// Fase de lectura: cura el dataset y resuelve el estado actual del
/// registro. No escribe nada.
pub fn plan_feature_curation(df: &DataFrame,
                             knowledge: &KnowledgeTable,
                             registry: &dyn Registry)
                             -> Result<CurationPlan, CoreError> {
    let curated = knowledge.curate(df)?;
    let set_hash = curated.set_hash();
    let kind = knowledge.kind();

    if let Some(existing_set) = registry.get_feature_set(&set_hash, kind)? {
        debug!("feature set {set_hash} ya registrado, reutilización completa");
        return Ok(CurationPlan { set_hash,
                                 kind,
                                 species: knowledge.species().to_string(),
                                 reuse: Some(existing_set),
                                 existing: Vec::new(),
                                 new_mapped: Vec::new(),
                                 new_unmapped: Vec::new() });
    }

    // Filas ya registradas para estos labels (solo si la especie ya existe;
    // si no existe, no puede haber filas suyas).
    let labels: Vec<String> = curated.labels().to_vec();
    let existing = match registry.get_species(knowledge.species())? {
        Some(species) => registry.select_feature_records(kind, species.id(), &labels)?,
        None => Vec::new(),
    };
    let existing_labels: HashSet<&str> = existing.iter().map(|r| r.label()).collect();

    let names = knowledge.names()?;
    let known = knowledge.known_labels()?;
    let mut new_mapped = Vec::new();
    let mut new_unmapped = Vec::new();
    for label in curated.labels() {
        if existing_labels.contains(label.as_str()) {
            continue;
        }
        if known.contains(label) {
            new_mapped.push((label.clone(), names.get(label).cloned()));
        } else {
            new_unmapped.push(label.clone());
        }
    }

    Ok(CurationPlan { set_hash,
                      kind,
                      species: knowledge.species().to_string(),
                      reuse: None,
                      existing,
                      new_mapped,
                      new_unmapped })
}

/// Fase de escritura: materializa el plan. Devuelve el FeatureSet final
/// (el reutilizado o el recién creado con todas sus filas adjuntas).
pub fn apply_feature_curation(plan: CurationPlan, registry: &mut dyn Registry) -> Result<FeatureSet, CoreError> {
    if let Some(existing) = plan.reuse {
        return Ok(existing);
    }

    let species = registry.get_or_create_species(&plan.species)?;

    let mut new_records = Vec::with_capacity(plan.new_mapped.len() + plan.new_unmapped.len());
    for (label, name) in &plan.new_mapped {
        new_records.push(FeatureRecord::new(label, name.as_deref(), species.id())?);
    }
    for label in &plan.new_unmapped {
        new_records.push(FeatureRecord::new(label, None, species.id())?);
    }
    if !new_records.is_empty() {
        registry.add_feature_records(plan.kind, &new_records)?;
        info!("{} filas de referencia nuevas para {} ({})",
              new_records.len(),
              plan.kind,
              plan.species);
    }

    let set = FeatureSet::new(&plan.set_hash, plan.kind)?;
    registry.add_feature_set(&set)?;

    let member_ids: Vec<_> = plan.existing.iter().chain(new_records.iter()).map(|r| r.id()).collect();
    attach_for_kind(registry, plan.kind, set.id(), &member_ids)?;
    Ok(set)
}

/// Conveniencia: plan + apply en una llamada.
pub fn curate_features(df: &DataFrame,
                       knowledge: &KnowledgeTable,
                       registry: &mut dyn Registry)
                       -> Result<FeatureSet, CoreError> {
    let plan = plan_feature_curation(df, knowledge, registry)?;
    apply_feature_curation(plan, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use polars::prelude::*;

    fn knowledge() -> KnowledgeTable {
        let table = DataFrame::new(vec![Series::new("gene_symbol", &["CD4", "CD8A", "FOXP3"]),
                                        Series::new("name", &["cd4", "cd8 alpha", "forkhead"]),]).unwrap();
        KnowledgeTable::new(FeatureKind::Gene, "human", "gene_symbol", table).unwrap()
    }

    fn dataset(labels: &[&str]) -> DataFrame {
        DataFrame::new(vec![Series::new("gene_symbol", labels)]).unwrap()
    }

    #[test]
    fn creates_set_with_mapped_and_unmapped_rows() {
        let mut reg = InMemoryRegistry::new();
        let df = dataset(&["CD4", "MYC"]);
        let set = curate_features(&df, &knowledge(), &mut reg).unwrap();

        let members = reg.feature_set_members(set.id(), FeatureKind::Gene).unwrap();
        assert_eq!(members.len(), 2);
        // la fila no mapeada existe pero sin nombre descriptivo
        let species = reg.get_species("human").unwrap().unwrap();
        let rows = reg.select_feature_records(FeatureKind::Gene, species.id(),
                                              &["CD4".to_string(), "MYC".to_string()])
                      .unwrap();
        let myc = rows.iter().find(|r| r.label() == "MYC").unwrap();
        assert!(myc.name().is_none());
        let cd4 = rows.iter().find(|r| r.label() == "CD4").unwrap();
        assert_eq!(cd4.name(), Some("cd4"));
    }

    #[test]
    fn identical_label_set_reuses_feature_set() {
        let mut reg = InMemoryRegistry::new();
        let k = knowledge();
        let first = curate_features(&dataset(&["CD4", "CD8A"]), &k, &mut reg).unwrap();
        // mismo conjunto en otro orden: mismo id, sin filas nuevas
        let species_id = reg.get_species("human").unwrap().unwrap().id();
        let rows_before = reg.select_feature_records(FeatureKind::Gene, species_id,
                                                     &["CD4".to_string(), "CD8A".to_string()])
                             .unwrap()
                             .len();
        let second = curate_features(&dataset(&["CD8A", "CD4"]), &k, &mut reg).unwrap();
        assert_eq!(first.id(), second.id());
        let rows_after = reg.select_feature_records(FeatureKind::Gene, species_id,
                                                    &["CD4".to_string(), "CD8A".to_string()])
                            .unwrap()
                            .len();
        assert_eq!(rows_before, rows_after);
    }

    #[test]
    fn plan_phase_performs_no_writes() {
        let reg = InMemoryRegistry::new();
        let plan = plan_feature_curation(&dataset(&["CD4"]), &knowledge(), &reg).unwrap();
        assert!(plan.reuse.is_none());
        assert_eq!(plan.new_mapped.len(), 1);
        // la especie sigue sin existir: la fase de lectura no la creó
        assert!(reg.get_species("human").unwrap().is_none());
    }

    #[test]
    fn overlapping_sets_share_reference_rows() {
        let mut reg = InMemoryRegistry::new();
        let k = knowledge();
        curate_features(&dataset(&["CD4", "CD8A"]), &k, &mut reg).unwrap();
        let set2 = curate_features(&dataset(&["CD4", "FOXP3"]), &k, &mut reg).unwrap();
        let species_id = reg.get_species("human").unwrap().unwrap().id();
        // CD4 no se duplica: una sola fila para ambos sets
        let cd4 = reg.select_feature_records(FeatureKind::Gene, species_id, &["CD4".to_string()]).unwrap();
        assert_eq!(cd4.len(), 1);
        let members = reg.feature_set_members(set2.id(), FeatureKind::Gene).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains(&cd4[0].id()));
    }
}
