use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;

pub type RevisionId = i64;
pub type ItemId = i64;

/// One harvested snapshot of a production declared on a CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub item_id: ItemId,
    pub retrieval_time: DateTime<Utc>,
    pub source: String,

    /// `None` when the production was observed removed from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<RevisionId>,
}

impl Revision {
    pub fn new(id: RevisionId, item_id: ItemId, meta: Option<Metadata>) -> Self {
        Self {
            id,
            item_id,
            retrieval_time: Utc::now(),
            source: String::new(),
            meta,
            duplicate_of: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_duplicate_of(mut self, main: RevisionId) -> Self {
        self.duplicate_of = Some(main);
        self
    }

    pub fn is_removed(&self) -> bool {
        self.meta.is_none()
    }

    pub fn is_main_candidate(&self) -> bool {
        self.duplicate_of.is_none()
    }

    /// Id of the main revision of the group this revision belongs to.
    pub fn group_main(&self) -> RevisionId {
        self.duplicate_of.unwrap_or(self.id)
    }
}

/// A harvesting slot: one per (researcher, sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub researcher_id: String,
    pub seq_prod: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_item_id: Option<i64>,

    /// Revision last synchronized downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_revision_id: Option<RevisionId>,

    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub frozen: bool,
}

impl Item {
    pub fn new(id: ItemId, researcher_id: impl Into<String>, seq_prod: i32) -> Self {
        Self {
            id,
            researcher_id: researcher_id.into(),
            seq_prod,
            repo_item_id: None,
            synced_revision_id: None,
            skip: false,
            frozen: false,
        }
    }

    pub fn is_pending_sync(&self, last_revision: RevisionId) -> bool {
        self.synced_revision_id != Some(last_revision)
    }
}

/// The owner of a CV, with the institutional roles it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Researcher {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub roles: Vec<String>,
}

impl Researcher {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}
