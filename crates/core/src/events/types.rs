use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blueprint::model::{BlueprintId, RevisionId, UserId};

/// Events emitted after successful catalog mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CatalogEvent {
    EntryCreated(EntryEvent),
    EntryDeleted(EntryEvent),
    RevisionCreated(RevisionEvent),
    RevisionRendered(RevisionEvent),
    RevisionDeleted(RevisionEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryEvent {
    pub blueprint_id: BlueprintId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionEvent {
    pub blueprint_id: BlueprintId,
    pub revision_id: RevisionId,
    pub revision: i64,
    pub checksum: String,
    pub timestamp: DateTime<Utc>,
}

impl CatalogEvent {
    /// The `type` tag this event serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogEvent::EntryCreated(_) => "entryCreated",
            CatalogEvent::EntryDeleted(_) => "entryDeleted",
            CatalogEvent::RevisionCreated(_) => "revisionCreated",
            CatalogEvent::RevisionRendered(_) => "revisionRendered",
            CatalogEvent::RevisionDeleted(_) => "revisionDeleted",
        }
    }

    pub fn blueprint_id(&self) -> BlueprintId {
        match self {
            CatalogEvent::EntryCreated(e) | CatalogEvent::EntryDeleted(e) => e.blueprint_id,
            CatalogEvent::RevisionCreated(e)
            | CatalogEvent::RevisionRendered(e)
            | CatalogEvent::RevisionDeleted(e) => e.blueprint_id,
        }
    }
}
