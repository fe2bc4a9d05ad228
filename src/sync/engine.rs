use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use super::connectivity::Connectivity;
use crate::db::{CacheError, PendingQueue, WordCache};
use crate::models::{normalize_key, PendingOperation, WordEntry};
use crate::sheet::codec;
use crate::sheet::schema::header_row;
use crate::sheet::{find_word_row_index, SheetError, SheetsTransport, TableClient};

/// Errors that can occur in sync operations
#[derive(Debug)]
pub enum SyncError {
    /// The spreadsheet call failed
    Sheet(SheetError),
    /// The local cache failed
    Cache(CacheError),
    /// No row in the sheet carries this word
    WordNotFound(String),
    /// The located row came back empty
    RowMissing(String),
    /// Operation needs the sheet but the client is offline, signed out or not ready
    Unavailable(String),
    /// A record without a word was supplied
    EmptyKey,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Sheet(e) => write!(f, "{}", e),
            SyncError::Cache(e) => write!(f, "{}", e),
            SyncError::WordNotFound(word) => write!(f, "Word \"{}\" not found in sheet", word),
            SyncError::RowMissing(word) => {
                write!(f, "Could not get data for word \"{}\" from sheet", word)
            }
            SyncError::Unavailable(msg) => write!(f, "{}", msg),
            SyncError::EmptyKey => write!(f, "Word must not be empty"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<SheetError> for SyncError {
    fn from(e: SheetError) -> Self {
        SyncError::Sheet(e)
    }
}

impl From<CacheError> for SyncError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::EmptyKey => SyncError::EmptyKey,
            other => SyncError::Cache(other),
        }
    }
}

/// Offline-first access to the word table.
///
/// While online every mutation goes to the sheet first and the cache second;
/// while offline mutations land in the cache and the pending queue, to be
/// replayed by [`SyncEngine::process_pending_queue`].
pub struct SyncEngine<T: SheetsTransport> {
    pub(super) client: Arc<TableClient<T>>,
    pub(super) cache: WordCache,
    pub(super) queue: PendingQueue,
    pub(super) connectivity: Arc<Connectivity>,
    pub(super) replay_lock: Mutex<()>,
}

impl<T: SheetsTransport> SyncEngine<T> {
    pub fn new(
        client: Arc<TableClient<T>>,
        pool: SqlitePool,
        connectivity: Arc<Connectivity>,
    ) -> Self {
        Self {
            client,
            cache: WordCache::new(pool.clone()),
            queue: PendingQueue::new(pool),
            connectivity,
            replay_lock: Mutex::new(()),
        }
    }

    pub fn client(&self) -> &Arc<TableClient<T>> {
        &self.client
    }

    pub fn cache(&self) -> &WordCache {
        &self.cache
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.client.last_error().await
    }

    pub async fn pending_count(&self) -> Result<i64, SyncError> {
        Ok(self.queue.len().await?)
    }

    /// Active words, from the cache when it has any.
    ///
    /// With `force_refresh`, or when the cache holds no active words, the
    /// whole table is fetched and replaces the cache. Offline, the cached
    /// active set is returned without error.
    pub async fn get_all_words(&self, force_refresh: bool) -> Result<Vec<WordEntry>, SyncError> {
        if !force_refresh {
            let cached = self.cache.get_active().await?;
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        if !self.is_online() {
            tracing::debug!("offline, serving cached words");
            return Ok(self.cache.get_active().await?);
        }

        let words = self.fetch_all().await?;
        self.cache.replace_all(&words).await?;
        tracing::info!(count = words.len(), "refreshed word cache from sheet");

        Ok(words.into_iter().filter(WordEntry::is_active).collect())
    }

    /// Adds new words, skipping any whose word already exists in the sheet.
    ///
    /// Accepted entries are stored with `version = 0` and returned. Offline,
    /// the sheet cannot be consulted: words already in the cache are skipped
    /// and the rest is queued as one add.
    pub async fn add_words(&self, entries: Vec<WordEntry>) -> Result<Vec<WordEntry>, SyncError> {
        let entries = prepare_new_entries(entries)?;
        if entries.is_empty() {
            return Ok(entries);
        }

        if !self.is_online() {
            let mut fresh = Vec::with_capacity(entries.len());
            for entry in entries {
                if self.cache.get(&entry.word).await?.is_some() {
                    tracing::info!(word = %entry.word, "word already cached, skipping");
                    continue;
                }
                fresh.push(entry);
            }
            let entries = fresh;
            if entries.is_empty() {
                return Ok(entries);
            }

            self.queue
                .enqueue(&PendingOperation::Add {
                    data: entries.clone(),
                })
                .await?;
            for entry in &entries {
                self.cache.put(entry).await?;
            }
            tracing::info!(count = entries.len(), "queued words for adding");
            return Ok(entries);
        }

        self.add_online(entries).await
    }

    /// Replaces the stored record of `word` with `data`.
    ///
    /// Online, the row is located, its version bumped by one and exactly
    /// that row rewritten; the updated record is returned. Offline, the
    /// change is queued and cached as given.
    pub async fn update_word(&self, word: &str, data: WordEntry) -> Result<WordEntry, SyncError> {
        if normalize_key(word).is_empty() {
            return Err(SyncError::EmptyKey);
        }
        let data = with_identifier(word, data);

        if !self.is_online() {
            self.queue
                .enqueue(&PendingOperation::Update {
                    word: word.to_string(),
                    data: data.clone(),
                })
                .await?;
            self.cache.put(&data).await?;
            tracing::info!(word, "queued word update");
            return Ok(data);
        }

        self.update_online(word, data).await
    }

    /// Soft-deletes `word`: the row stays in the sheet with its deleted flag set.
    pub async fn delete_word(&self, word: &str) -> Result<(), SyncError> {
        if normalize_key(word).is_empty() {
            return Err(SyncError::EmptyKey);
        }

        if !self.is_online() {
            self.queue
                .enqueue(&PendingOperation::Delete {
                    word: word.to_string(),
                })
                .await?;
            if let Some(mut cached) = self.cache.get(word).await? {
                cached.mark_deleted(now());
                cached.version += 1;
                self.cache.put(&cached).await?;
            }
            tracing::info!(word, "queued word deletion");
            return Ok(());
        }

        self.delete_online(word).await
    }

    /// Records a review outcome and writes the counters through
    /// [`SyncEngine::update_word`].
    pub async fn review_word(&self, word: &str, correct: bool) -> Result<WordEntry, SyncError> {
        let mut entry = match self.cache.get(word).await? {
            Some(entry) => entry,
            None => {
                self.get_all_words(false).await?;
                self.cache
                    .get(word)
                    .await?
                    .ok_or_else(|| SyncError::WordNotFound(word.to_string()))?
            }
        };
        if entry.is_deleted {
            return Err(SyncError::WordNotFound(word.to_string()));
        }

        entry.apply_review(correct, now());
        self.update_word(word, entry).await
    }

    /// Forces a full refresh; needs the sheet to be reachable.
    ///
    /// Returns the number of active words now cached.
    pub async fn sync_cache_with_sheet(&self) -> Result<usize, SyncError> {
        self.require_sheet().await?;
        let words = self.get_all_words(true).await?;
        Ok(words.len())
    }

    /// Wipes the cache and the pending queue. The sheet is untouched.
    pub async fn clear_cache(&self) -> Result<(), SyncError> {
        let words = self.cache.clear().await?;
        let pending = self.queue.clear().await?;
        tracing::info!(words, pending, "cleared local cache");
        Ok(())
    }

    /// Wipes local state and, when the sheet is reachable, every data row.
    ///
    /// Returns whether the sheet was cleared too.
    pub async fn clear_all_data(&self) -> Result<bool, SyncError> {
        self.clear_cache().await?;

        if self.require_sheet().await.is_err() {
            return Ok(false);
        }
        let range = self.client.layout().data_range();
        self.client.clear_range(&range).await?;
        tracing::info!(range = %range, "cleared sheet data");
        Ok(true)
    }

    /// Writes the column names into the header row.
    pub async fn write_header(&self) -> Result<(), SyncError> {
        let layout = self.client.layout();
        let mut header = header_row();
        header.resize(layout.column_count(), String::new());
        self.client
            .write_range(&layout.header_range(), &[header])
            .await?;
        Ok(())
    }

    async fn require_sheet(&self) -> Result<(), SyncError> {
        if self.is_online() && self.client.is_signed_in().await && self.client.is_ready() {
            return Ok(());
        }
        let message = "Cannot sync: offline or not signed in.";
        self.client.set_last_error(message).await;
        Err(SyncError::Unavailable(message.to_string()))
    }

    async fn fetch_all(&self) -> Result<Vec<WordEntry>, SyncError> {
        let result = self
            .client
            .read_range(&self.client.layout().data_range())
            .await?;

        Ok(result
            .values
            .iter()
            .filter_map(|row| codec::decode(row))
            .filter(|entry| !entry.key().is_empty())
            .collect())
    }

    pub(super) async fn add_online(
        &self,
        entries: Vec<WordEntry>,
    ) -> Result<Vec<WordEntry>, SyncError> {
        let mut accepted = Vec::with_capacity(entries.len());
        for entry in entries {
            if find_word_row_index(&self.client, &entry.word).await?.is_some() {
                tracing::info!(word = %entry.word, "word already in sheet, skipping");
                continue;
            }
            accepted.push(entry);
        }
        if accepted.is_empty() {
            return Ok(accepted);
        }

        let layout = self.client.layout();
        let rows: Vec<Vec<String>> = accepted
            .iter()
            .map(|entry| codec::encode(entry, layout.column_count()))
            .collect();
        self.client
            .append_rows(&layout.append_anchor(), &rows)
            .await?;

        for entry in &accepted {
            self.cache.put(entry).await?;
        }
        tracing::info!(count = accepted.len(), "added words to sheet");
        Ok(accepted)
    }

    pub(super) async fn update_online(
        &self,
        word: &str,
        data: WordEntry,
    ) -> Result<WordEntry, SyncError> {
        let index = find_word_row_index(&self.client, word)
            .await?
            .ok_or_else(|| SyncError::WordNotFound(word.to_string()))?;
        self.write_row(index, with_identifier(word, data)).await
    }

    pub(super) async fn delete_online(&self, word: &str) -> Result<(), SyncError> {
        let index = find_word_row_index(&self.client, word)
            .await?
            .ok_or_else(|| SyncError::WordNotFound(word.to_string()))?;

        let range = self.client.layout().row_range(index);
        let result = self.client.read_range(&range).await?;
        let mut entry = result
            .values
            .first()
            .and_then(|row| codec::decode(row))
            .ok_or_else(|| SyncError::RowMissing(word.to_string()))?;

        entry.mark_deleted(now());
        self.write_row(index, with_identifier(word, entry)).await?;
        tracing::info!(word, "soft-deleted word");
        Ok(())
    }

    /// Replaces the cached copy of `word` with the sheet's row. Leaves the
    /// cache alone when the sheet has no such word.
    pub(super) async fn reload_word(&self, word: &str) -> Result<(), SyncError> {
        let Some(index) = find_word_row_index(&self.client, word).await? else {
            return Ok(());
        };
        let result = self
            .client
            .read_range(&self.client.layout().row_range(index))
            .await?;
        if let Some(entry) = result.values.first().and_then(|row| codec::decode(row)) {
            self.cache.put(&entry).await?;
        }
        Ok(())
    }

    /// Bumps the version and overwrites the data row at `index`.
    async fn write_row(&self, index: usize, mut entry: WordEntry) -> Result<WordEntry, SyncError> {
        entry.version += 1;

        let layout = self.client.layout();
        let row = codec::encode(&entry, layout.column_count());
        self.client
            .write_range(&layout.row_range(index), &[row])
            .await?;

        self.cache.put(&entry).await?;
        tracing::debug!(word = %entry.word, version = entry.version, "wrote word row");
        Ok(entry)
    }
}

pub(super) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Keeps the caller's spelling when it names the same word, otherwise forces
/// the identifier so the record stays under its key.
fn with_identifier(word: &str, mut data: WordEntry) -> WordEntry {
    if normalize_key(&data.word) != normalize_key(word) {
        data.word = word.trim().to_string();
    }
    data
}

/// Rejects empty words, drops case-insensitive duplicates within the batch
/// and resets versions.
fn prepare_new_entries(entries: Vec<WordEntry>) -> Result<Vec<WordEntry>, SyncError> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(entries.len());

    for mut entry in entries {
        let key = entry.key();
        if key.is_empty() {
            return Err(SyncError::EmptyKey);
        }
        if !seen.insert(key) {
            tracing::debug!(word = %entry.word, "duplicate word in batch, skipping");
            continue;
        }
        entry.version = 0;
        prepared.push(entry);
    }

    Ok(prepared)
}
