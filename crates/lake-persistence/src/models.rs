//! Mapeo filas de DB ⟷ registros de dominio. El dominio queda aislado del
//! esquema: acá se parsean UUIDs, se reconvierten timestamps y se revalidan
//! invariantes al rehidratar.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use lake_domain::{DataObject, FeatureKind, FeatureRecord, FeatureSet, Run, Species, StorageRoot, UsageEvent};

use crate::error::PersistenceError;
use crate::schema::{cell_markers, data_objects, feature_sets, genes, proteins, runs, species, storage_roots,
                    usage_events};

fn parse_uuid(raw: &str) -> Result<Uuid, PersistenceError> {
    Uuid::parse_str(raw).map_err(|e| PersistenceError::CorruptRow(format!("uuid inválido {raw}: {e}")))
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = data_objects)]
pub struct DataObjectRow {
    pub id: String,
    pub name: String,
    pub suffix: String,
    pub hash: Option<String>,
    pub size: i64,
    pub storage_id: String,
    pub run_id: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl From<&DataObject> for DataObjectRow {
    fn from(obj: &DataObject) -> Self {
        DataObjectRow { id: obj.id().to_string(),
                        name: obj.name().to_string(),
                        suffix: obj.suffix().to_string(),
                        hash: obj.hash().map(str::to_string),
                        size: obj.size(),
                        storage_id: obj.storage_id().to_string(),
                        run_id: obj.run_id().to_string(),
                        created_by: obj.created_by().to_string(),
                        created_at: obj.created_at().naive_utc() }
    }
}

impl TryFrom<DataObjectRow> for DataObject {
    type Error = PersistenceError;

    fn try_from(row: DataObjectRow) -> Result<Self, Self::Error> {
        DataObject::from_parts(parse_uuid(&row.id)?,
                               &row.name,
                               &row.suffix,
                               row.hash,
                               row.size,
                               parse_uuid(&row.storage_id)?,
                               parse_uuid(&row.run_id)?,
                               &row.created_by,
                               to_utc(row.created_at)).map_err(|e| PersistenceError::CorruptRow(e.to_string()))
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = runs)]
pub struct RunRow {
    pub id: String,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub reference_type: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        RunRow { id: run.id().to_string(),
                 name: run.name().map(str::to_string),
                 reference: run.reference().map(str::to_string),
                 reference_type: run.reference_type().map(str::to_string),
                 created_by: run.created_by().to_string(),
                 created_at: run.created_at().naive_utc() }
    }
}

impl TryFrom<RunRow> for Run {
    type Error = PersistenceError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Run::from_parts(parse_uuid(&row.id)?,
                        row.name.as_deref(),
                        row.reference.as_deref(),
                        row.reference_type.as_deref(),
                        &row.created_by,
                        to_utc(row.created_at)).map_err(|e| PersistenceError::CorruptRow(e.to_string()))
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = storage_roots)]
pub struct StorageRootRow {
    pub id: String,
    pub root: String,
    pub created_at: NaiveDateTime,
}

impl From<&StorageRoot> for StorageRootRow {
    fn from(record: &StorageRoot) -> Self {
        StorageRootRow { id: record.id().to_string(),
                         root: record.root().to_string(),
                         created_at: record.created_at().naive_utc() }
    }
}

impl TryFrom<StorageRootRow> for StorageRoot {
    type Error = PersistenceError;

    fn try_from(row: StorageRootRow) -> Result<Self, Self::Error> {
        StorageRoot::from_parts(parse_uuid(&row.id)?, &row.root, to_utc(row.created_at))
            .map_err(|e| PersistenceError::CorruptRow(e.to_string()))
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = species)]
pub struct SpeciesRow {
    pub id: String,
    pub common_name: String,
}

impl From<&Species> for SpeciesRow {
    fn from(record: &Species) -> Self {
        SpeciesRow { id: record.id().to_string(),
                     common_name: record.common_name().to_string() }
    }
}

impl TryFrom<SpeciesRow> for Species {
    type Error = PersistenceError;

    fn try_from(row: SpeciesRow) -> Result<Self, Self::Error> {
        Species::from_parts(parse_uuid(&row.id)?, &row.common_name)
            .map_err(|e| PersistenceError::CorruptRow(e.to_string()))
    }
}

// Las tres tablas de referencia comparten forma pero son relaciones
// distintas: una struct de fila por tabla.

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = genes)]
pub struct GeneRow {
    pub id: String,
    pub label: String,
    pub name: Option<String>,
    pub species_id: String,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = proteins)]
pub struct ProteinRow {
    pub id: String,
    pub label: String,
    pub name: Option<String>,
    pub species_id: String,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = cell_markers)]
pub struct CellMarkerRow {
    pub id: String,
    pub label: String,
    pub name: Option<String>,
    pub species_id: String,
}

macro_rules! feature_row_conversions {
    ($row:ident) => {
        impl From<&FeatureRecord> for $row {
            fn from(record: &FeatureRecord) -> Self {
                $row { id: record.id().to_string(),
                       label: record.label().to_string(),
                       name: record.name().map(str::to_string),
                       species_id: record.species_id().to_string() }
            }
        }

        impl TryFrom<$row> for FeatureRecord {
            type Error = PersistenceError;

            fn try_from(row: $row) -> Result<Self, Self::Error> {
                FeatureRecord::from_parts(parse_uuid(&row.id)?,
                                          &row.label,
                                          row.name.as_deref(),
                                          parse_uuid(&row.species_id)?)
                    .map_err(|e| PersistenceError::CorruptRow(e.to_string()))
            }
        }
    };
}

feature_row_conversions!(GeneRow);
feature_row_conversions!(ProteinRow);
feature_row_conversions!(CellMarkerRow);

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = feature_sets)]
pub struct FeatureSetRow {
    pub id: String,
    pub kind: String,
    pub created_at: NaiveDateTime,
}

impl From<&FeatureSet> for FeatureSetRow {
    fn from(set: &FeatureSet) -> Self {
        FeatureSetRow { id: set.id().to_string(),
                        kind: set.kind().as_str().to_string(),
                        created_at: set.created_at().naive_utc() }
    }
}

impl TryFrom<FeatureSetRow> for FeatureSet {
    type Error = PersistenceError;

    fn try_from(row: FeatureSetRow) -> Result<Self, Self::Error> {
        let kind: FeatureKind = row.kind.parse().map_err(|_| {
                                                    PersistenceError::CorruptRow(format!("kind inválido: {}",
                                                                                         row.kind))
                                                })?;
        FeatureSet::from_parts(&row.id, kind, to_utc(row.created_at))
            .map_err(|e| PersistenceError::CorruptRow(e.to_string()))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = usage_events)]
pub struct NewUsageRow {
    pub data_object_id: String,
    pub kind: String,
    pub user_id: String,
    pub at: NaiveDateTime,
}

impl From<&UsageEvent> for NewUsageRow {
    fn from(event: &UsageEvent) -> Self {
        NewUsageRow { data_object_id: event.data_object_id.to_string(),
                      kind: event.kind.as_str().to_string(),
                      user_id: event.user.clone(),
                      at: event.at.naive_utc() }
    }
}
