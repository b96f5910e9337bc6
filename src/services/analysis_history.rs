use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::repositories::kv_repository::KvRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analysis::{AnalysisRecord, AnalysisResponse};

pub const ANALYSIS_HISTORY_KEY: &str = "analyses";
pub const ANALYSIS_HISTORY_LIMIT: usize = 50;

/// Durable key-value storage holding serialized history lists.
pub trait HistoryStorage: Send + Sync {
    fn load(&self, key: &str) -> AppResult<Option<String>>;

    /// Replaces the value under `key` with `apply(previous)` as one atomic step.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> AppResult<String>,
    ) -> AppResult<()>;
}

/// SQLite-backed storage. Writers in this process are serialized by a mutex;
/// other processes are kept out by the `BEGIN IMMEDIATE` transaction.
pub struct SqliteHistoryStorage {
    db: DbPool,
    write_lock: Mutex<()>,
}

impl SqliteHistoryStorage {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }
}

impl HistoryStorage for SqliteHistoryStorage {
    fn load(&self, key: &str) -> AppResult<Option<String>> {
        let row = self
            .db
            .with_connection(|conn| KvRepository::get(conn, key))?;
        Ok(row.map(|row| row.value))
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> AppResult<String>,
    ) -> AppResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::other("history write lock poisoned"))?;

        let stored = self
            .db
            .with_connection_mut(|conn| KvRepository::update(conn, key, |current| apply(current)))?;

        debug!(
            target: "app::history",
            key,
            revision = stored.revision,
            "history entry written"
        );
        Ok(())
    }
}

/// Newest-first, bounded log of completed video analyses.
#[derive(Clone)]
pub struct AnalysisHistoryStore {
    storage: Arc<dyn HistoryStorage>,
    key: String,
    limit: usize,
}

impl AnalysisHistoryStore {
    pub fn new(storage: Arc<dyn HistoryStorage>) -> Self {
        Self {
            storage,
            key: ANALYSIS_HISTORY_KEY.to_string(),
            limit: ANALYSIS_HISTORY_LIMIT,
        }
    }

    pub fn with_db(db: DbPool) -> Self {
        Self::new(Arc::new(SqliteHistoryStorage::new(db)))
    }

    /// Stores a successful analysis under a fresh id and the current time.
    pub fn record(&self, response: &AnalysisResponse) -> AppResult<AnalysisRecord> {
        let record =
            AnalysisRecord::from_response(response, Uuid::new_v4().to_string(), Utc::now());
        self.append(record.clone())?;
        Ok(record)
    }

    /// Prepends `record` and evicts anything past the limit.
    pub fn append(&self, record: AnalysisRecord) -> AppResult<()> {
        let limit = self.limit;
        let key = self.key.clone();
        let mut pending = Some(record);

        self.storage.update(&self.key, &mut |current: Option<&str>| {
            let mut records = match current {
                Some(raw) => parse_records(&key, raw),
                None => Vec::new(),
            };

            let record = pending
                .take()
                .ok_or_else(|| AppError::other("history update applied twice"))?;
            records.insert(0, record);
            records.truncate(limit);

            Ok(serde_json::to_string(&records)?)
        })
    }

    /// Stored records, newest first. Missing, unreadable or corrupt storage
    /// yields an empty list.
    pub fn read_all(&self) -> Vec<AnalysisRecord> {
        match self.storage.load(&self.key) {
            Ok(Some(raw)) => {
                let mut records = parse_records(&self.key, &raw);
                records.truncate(self.limit);
                records
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    target: "app::history",
                    key = %self.key,
                    error = %err,
                    "failed to read analysis history"
                );
                Vec::new()
            }
        }
    }
}

fn parse_records(key: &str, raw: &str) -> Vec<AnalysisRecord> {
    match serde_json::from_str::<Vec<AnalysisRecord>>(raw) {
        Ok(records) => records,
        Err(err) => {
            warn!(
                target: "app::history",
                key,
                error = %err,
                "discarding unreadable analysis history"
            );
            Vec::new()
        }
    }
}
