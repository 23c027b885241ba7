use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operación de acceso registrada sobre un DataObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    Ingest,
    Load,
    Stage,
    Stream,
    Delete,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Ingest => "ingest",
            UsageKind::Load => "load",
            UsageKind::Stage => "stage",
            UsageKind::Stream => "stream",
            UsageKind::Delete => "delete",
        }
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Evento de uso para auditoría. No lleva FK dura al objeto: el rastro debe
/// sobrevivir al borrado del registro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub data_object_id: Uuid,
    pub kind: UsageKind,
    pub user: String,
    pub at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn now(data_object_id: Uuid, kind: UsageKind, user: &str) -> Self {
        UsageEvent { data_object_id,
                     kind,
                     user: user.to_string(),
                     at: Utc::now() }
    }
}
