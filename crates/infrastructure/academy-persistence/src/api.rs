use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CURRENT_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbState {
    Missing,
    Valid,
    Busy,
    Corrupt,
    NewerSchema { found: u32, supported: u32 },
}

/// A locally persisted copy of an in-progress wizard. Advisory only: it is
/// never loaded back unless the user asks for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftSnapshot {
    pub session_id: Uuid,
    pub saved_at: DateTime<Utc>,
    /// Label of the step the session was on.
    pub step: String,
    pub course_title: String,
    /// The serialized session (form data and captured identifiers).
    pub state: serde_json::Value,
}

impl DraftSnapshot {
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            session_id: self.session_id,
            course_title: self.course_title.clone(),
            step: self.step.clone(),
            saved_at: self.saved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSummary {
    pub session_id: Uuid,
    pub course_title: String,
    pub step: String,
    pub saved_at: DateTime<Utc>,
}

pub trait DraftStore: Send + Sync {
    fn validate(&self) -> Result<DbState, crate::StorageError>;

    /// Insert or replace the draft for `draft.session_id`.
    fn save_draft(&self, draft: &DraftSnapshot) -> Result<(), crate::StorageError>;

    fn load_draft(&self, session_id: &Uuid) -> Result<Option<DraftSnapshot>, crate::StorageError>;

    /// Most recently saved first.
    fn list_drafts(&self) -> Result<Vec<DraftSummary>, crate::StorageError>;

    /// Returns whether a draft was removed.
    fn delete_draft(&self, session_id: &Uuid) -> Result<bool, crate::StorageError>;
}
