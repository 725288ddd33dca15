use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{DbState, DraftSnapshot, DraftSummary, CURRENT_SCHEMA};
use crate::codec::{decode_draft, encode_draft};
use crate::maintenance::quarantine_corrupt_file;
use crate::{DraftStore, StorageError};

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
const DRAFTS: TableDefinition<&str, &[u8]> = TableDefinition::new("drafts");

const META_FORMAT_KEY: &str = "format";
const META_FORMAT_VALUE: &str = "academy-drafts";
const META_SCHEMA_VERSION: &str = "schema_version";
const META_CREATED_AT: &str = "created_at";
const META_LAST_SAVE_AT: &str = "last_save_at";

/// Draft store backed by a single redb file.
#[derive(Debug, Clone)]
pub struct RedbDraftStore {
    path: Utf8PathBuf,
}

impl RedbDraftStore {
    fn is_corrupt_open_error(err: &redb::DatabaseError) -> bool {
        match err {
            redb::DatabaseError::Storage(storage) => match storage {
                redb::StorageError::Corrupted(_) => true,
                redb::StorageError::Io(ioe) => matches!(
                    ioe.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
                ),
                _ => false,
            },
            _ => false,
        }
    }

    // redb refuses a second handle on the same file within one process.
    fn db_cache() -> &'static Mutex<HashMap<Utf8PathBuf, Arc<Database>>> {
        static CACHE: OnceLock<Mutex<HashMap<Utf8PathBuf, Arc<Database>>>> = OnceLock::new();
        CACHE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store living in `dir` under the default file name.
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self::new(dir.join(academy_config::DRAFTS_DB_FILENAME))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn cached(&self) -> Option<Arc<Database>> {
        let mut cache = Self::db_cache().lock().ok()?;
        match cache.get(&self.path) {
            Some(db) if self.path.exists() => Some(db.clone()),
            Some(_) => {
                cache.remove(&self.path);
                None
            }
            None => None,
        }
    }

    fn remember(&self, db: Database) -> Arc<Database> {
        let db = Arc::new(db);
        if let Ok(mut cache) = Self::db_cache().lock() {
            cache.insert(self.path.clone(), db.clone());
        }
        db
    }

    fn open(&self, create: bool) -> Result<Arc<Database>, StorageError> {
        if let Some(db) = self.cached() {
            return Ok(db);
        }

        let db = if self.path.exists() {
            match Database::open(self.path.as_std_path()) {
                Ok(db) => db,
                Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                    return Err(StorageError::DatabaseAlreadyOpen);
                }
                Err(e) if Self::is_corrupt_open_error(&e) => {
                    let _ = quarantine_corrupt_file(&self.path);
                    return Err(StorageError::Corrupt);
                }
                Err(e) => return Err(e.into()),
            }
        } else if create {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            debug!(path = %self.path, "creating draft store");
            Database::create(self.path.as_std_path())?
        } else {
            return Err(StorageError::Missing);
        };

        if let Err(e) = self.ensure_schema(&db) {
            drop(db);
            if matches!(e, StorageError::Corrupt) {
                let _ = quarantine_corrupt_file(&self.path);
            }
            return Err(e);
        }
        Ok(self.remember(db))
    }

    /// Open for writing; a corrupt file is quarantined and replaced.
    fn open_or_create(&self) -> Result<Arc<Database>, StorageError> {
        match self.open(true) {
            Err(StorageError::Corrupt) => self.open(true),
            other => other,
        }
    }

    fn ensure_schema(&self, db: &Database) -> Result<(), StorageError> {
        let write_tx = db.begin_write()?;
        {
            let mut meta = write_tx.open_table(META)?;
            let format: Option<String> = meta.get(META_FORMAT_KEY)?.map(|g| g.value().to_string());
            if format.is_none() {
                let schema_version = CURRENT_SCHEMA.to_string();
                let created_at = Utc::now().to_rfc3339();
                meta.insert(META_FORMAT_KEY, META_FORMAT_VALUE)?;
                meta.insert(META_SCHEMA_VERSION, schema_version.as_str())?;
                meta.insert(META_CREATED_AT, created_at.as_str())?;
            } else if format.as_deref() != Some(META_FORMAT_VALUE) {
                return Err(StorageError::Corrupt);
            }
        }
        let _ = write_tx.open_table(DRAFTS)?;
        write_tx.commit()?;

        let read_tx = db.begin_read()?;
        let meta = read_tx.open_table(META)?;
        let schema_version = meta
            .get(META_SCHEMA_VERSION)?
            .and_then(|g| g.value().parse::<u32>().ok())
            .unwrap_or(0);
        if schema_version == 0 {
            return Err(StorageError::Corrupt);
        }
        if schema_version > CURRENT_SCHEMA {
            return Err(StorageError::NewerSchema {
                found: schema_version,
                supported: CURRENT_SCHEMA,
            });
        }
        if schema_version != CURRENT_SCHEMA {
            return Err(StorageError::Corrupt);
        }
        Ok(())
    }
}

impl DraftStore for RedbDraftStore {
    fn validate(&self) -> Result<DbState, StorageError> {
        if !self.path.exists() {
            return Ok(DbState::Missing);
        }
        if self.cached().is_some() {
            return Ok(DbState::Valid);
        }

        match Database::open(self.path.as_std_path()) {
            Ok(db) => match self.ensure_schema(&db) {
                Ok(()) => {
                    self.remember(db);
                    Ok(DbState::Valid)
                }
                Err(StorageError::NewerSchema { found, supported }) => {
                    Ok(DbState::NewerSchema { found, supported })
                }
                Err(StorageError::DatabaseAlreadyOpen) => Ok(DbState::Busy),
                Err(StorageError::Corrupt) => {
                    drop(db);
                    let _ = quarantine_corrupt_file(&self.path);
                    Ok(DbState::Corrupt)
                }
                Err(e) => Err(e),
            },
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => Ok(DbState::Busy),
            Err(e) if Self::is_corrupt_open_error(&e) => {
                let _ = quarantine_corrupt_file(&self.path);
                Ok(DbState::Corrupt)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save_draft(&self, draft: &DraftSnapshot) -> Result<(), StorageError> {
        let db = self.open_or_create()?;
        let key = draft.session_id.to_string();
        let bytes = encode_draft(draft)?;

        let write_tx = db.begin_write()?;
        {
            let mut drafts = write_tx.open_table(DRAFTS)?;
            drafts.insert(key.as_str(), bytes.as_slice())?;
            let ts = Utc::now().to_rfc3339();
            let mut meta = write_tx.open_table(META)?;
            meta.insert(META_LAST_SAVE_AT, ts.as_str())?;
        }
        write_tx.commit()?;
        debug!(session = %draft.session_id, step = %draft.step, "draft saved");
        Ok(())
    }

    fn load_draft(&self, session_id: &Uuid) -> Result<Option<DraftSnapshot>, StorageError> {
        let db = match self.open(false) {
            Ok(db) => db,
            Err(StorageError::Missing) => return Ok(None),
            Err(e) => return Err(e),
        };
        let key = session_id.to_string();
        let read_tx = db.begin_read()?;
        let drafts = read_tx.open_table(DRAFTS)?;
        let value = drafts.get(key.as_str())?;
        value.map(|g| decode_draft(g.value())).transpose()
    }

    fn list_drafts(&self) -> Result<Vec<DraftSummary>, StorageError> {
        let db = match self.open(false) {
            Ok(db) => db,
            Err(StorageError::Missing) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let read_tx = db.begin_read()?;
        let drafts = read_tx.open_table(DRAFTS)?;

        let mut out = Vec::new();
        for row in drafts.iter()? {
            let (k, v) = row?;
            match decode_draft(v.value()) {
                Ok(d) => out.push(d.summary()),
                Err(e) => warn!(key = k.value(), "skipping unreadable draft: {e}"),
            }
        }
        out.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(out)
    }

    fn delete_draft(&self, session_id: &Uuid) -> Result<bool, StorageError> {
        let db = match self.open(false) {
            Ok(db) => db,
            Err(StorageError::Missing) => return Ok(false),
            Err(e) => return Err(e),
        };
        let key = session_id.to_string();
        let write_tx = db.begin_write()?;
        let removed = {
            let mut drafts = write_tx.open_table(DRAFTS)?;
            let removed = drafts.remove(key.as_str())?.is_some();
            removed
        };
        write_tx.commit()?;
        Ok(removed)
    }
}
