//! In-memory stand-in for the Sheets API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use vocasync::auth::CredentialStore;
use vocasync::db::init_db;
use vocasync::models::WordEntry;
use vocasync::sheet::codec;
use vocasync::sheet::{
    ApiFailure, CallContext, RetryPolicy, SheetLayout, SheetsTransport, TableClient,
    UpdateSummary, ValueRange,
};
use vocasync::sync::{Connectivity, SyncEngine};

#[derive(Default)]
struct SheetState {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    calls: Vec<String>,
    /// Failures keyed by absolute call number
    failures: HashMap<usize, ApiFailure>,
}

/// A sheet held in memory. Clones share the same table.
#[derive(Clone, Default)]
pub struct FakeSheet {
    state: Arc<Mutex<SheetState>>,
    layout: SheetLayout,
}

impl FakeSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[WordEntry]) -> Self {
        let sheet = Self::new();
        {
            let mut state = sheet.state.lock().unwrap();
            for entry in entries {
                state.rows.push(codec::encode(entry, 32));
            }
        }
        sheet
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub fn header(&self) -> Vec<String> {
        self.state.lock().unwrap().header.clone()
    }

    /// Decoded record of the first row whose key matches `word`.
    pub fn entry(&self, word: &str) -> Option<WordEntry> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .find(|row| row.first().map(|c| c.eq_ignore_ascii_case(word)).unwrap_or(false))
            .and_then(|row| codec::decode(row))
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Calls that changed the sheet, in order.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get "))
            .collect()
    }

    /// Makes the `offset`-th call from now fail.
    pub fn fail_call(&self, offset: usize, failure: ApiFailure) {
        let mut state = self.state.lock().unwrap();
        let index = state.calls.len() + offset;
        state.failures.insert(index, failure);
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, SheetState>, ApiFailure> {
        let mut state = self.state.lock().unwrap();
        let index = state.calls.len();
        state.calls.push(call);
        match state.failures.remove(&index) {
            Some(failure) => Err(failure),
            None => Ok(state),
        }
    }
}

/// Zero-based data index addressed by a single-row range such as `Sheet1!A5:AF5`.
fn data_index(range: &str) -> Option<usize> {
    let cells = range.rsplit('!').next()?;
    let start = cells.split(':').next()?;
    let digits: String = start.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<usize>().ok()?.checked_sub(2)
}

/// The API omits trailing empty cells.
fn trimmed(row: &[String]) -> Vec<String> {
    let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
    row[..end].to_vec()
}

#[async_trait]
impl SheetsTransport for FakeSheet {
    async fn get_values(&self, _ctx: CallContext, range: &str) -> Result<ValueRange, ApiFailure> {
        let state = self.begin(format!("get {}", range))?;

        let values = if range == self.layout.data_range() {
            state.rows.iter().map(|r| trimmed(r)).collect()
        } else if range == self.layout.key_column_range() {
            state
                .rows
                .iter()
                .map(|r| trimmed(&r[..1.min(r.len())]))
                .collect()
        } else if range == self.layout.header_range() {
            vec![state.header.clone()]
        } else {
            match data_index(range).and_then(|i| state.rows.get(i)) {
                Some(row) => vec![trimmed(row)],
                None => Vec::new(),
            }
        };

        Ok(ValueRange {
            range: range.to_string(),
            values,
        })
    }

    async fn update_values(
        &self,
        _ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure> {
        let mut state = self.begin(format!("update {}", range))?;

        if range == self.layout.header_range() {
            state.header = rows.first().cloned().unwrap_or_default();
        } else {
            let index = data_index(range)
                .ok_or_else(|| ApiFailure::status(400, format!("Unable to parse range: {}", range)))?;
            if state.rows.len() <= index {
                state.rows.resize(index + 1, Vec::new());
            }
            state.rows[index] = rows.first().cloned().unwrap_or_default();
        }

        Ok(UpdateSummary {
            updated_range: range.to_string(),
            updated_rows: rows.len() as u64,
        })
    }

    async fn append_values(
        &self,
        _ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure> {
        let mut state = self.begin(format!("append {}", range))?;
        state.rows.extend(rows.iter().cloned());

        Ok(UpdateSummary {
            updated_range: range.to_string(),
            updated_rows: rows.len() as u64,
        })
    }

    async fn clear_values(&self, _ctx: CallContext, range: &str) -> Result<String, ApiFailure> {
        let mut state = self.begin(format!("clear {}", range))?;
        state.rows.clear();
        Ok(range.to_string())
    }
}

pub struct TestEngine {
    pub engine: SyncEngine<FakeSheet>,
    pub sheet: FakeSheet,
    _temp_dir: TempDir,
}

impl TestEngine {
    pub fn go_online(&self) {
        self.engine.connectivity().set_online(true);
    }

    pub fn go_offline(&self) {
        self.engine.connectivity().set_online(false);
    }
}

/// An engine over `sheet`, signed in and initialized, with retries but no delays.
pub async fn setup_engine(sheet: FakeSheet, online: bool) -> TestEngine {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();

    let client = TableClient::new(
        sheet.clone(),
        Arc::new(CredentialStore::in_memory(Some("test-token".to_string()))),
        Some("test-sheet".to_string()),
        SheetLayout::default(),
        RetryPolicy::immediate(2),
    );
    client.initialize().await.unwrap();

    TestEngine {
        engine: SyncEngine::new(Arc::new(client), pool, Arc::new(Connectivity::new(online))),
        sheet,
        _temp_dir: temp_dir,
    }
}
