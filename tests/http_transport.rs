//! The reqwest transport against a local server speaking the Sheets values API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use vocasync::auth::CredentialStore;
use vocasync::db::init_db;
use vocasync::models::WordEntry;
use vocasync::sheet::{HttpTransport, RetryPolicy, SheetError, SheetLayout, TableClient};
use vocasync::sync::{Connectivity, SyncEngine};

const TOKEN: &str = "good-token";
const SPREADSHEET_ID: &str = "sheet-123";

#[derive(Default)]
struct ServerState {
    rows: Vec<Vec<String>>,
    requests: Vec<String>,
    /// Status and message returned by the next requests, in order
    failures: Vec<(u16, String)>,
    /// Apply the next append but answer it with an unreadable body
    garble_append: bool,
}

type Shared = Arc<Mutex<ServerState>>;

fn error(status: u16, message: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        code,
        Json(json!({ "error": { "code": status, "message": message } })),
    )
        .into_response()
}

/// Common checks shared by every handler.
fn admit(
    state: &Shared,
    method: &str,
    id: &str,
    range: &str,
    headers: &HeaderMap,
) -> Option<Response> {
    let mut state = state.lock().unwrap();
    state.requests.push(format!("{} {}", method, range));

    if !state.failures.is_empty() {
        let (status, message) = state.failures.remove(0);
        return Some(error(status, &message));
    }

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false);
    if !authorized {
        return Some(error(401, "Request had invalid authentication credentials."));
    }
    if id != SPREADSHEET_ID {
        return Some(error(404, "Requested entity was not found."));
    }
    if !range.starts_with("Sheet1!") {
        return Some(error(400, &format!("Unable to parse range: {}", range)));
    }
    None
}

fn row_number(range: &str) -> Option<usize> {
    let cells = range.split('!').nth(1)?;
    let start = cells.split(':').next()?;
    start
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()
}

fn cells(body: &Value) -> Vec<Vec<String>> {
    body["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|c| c.as_str().unwrap_or_default().to_string())
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn get_values(
    State(state): State<Shared>,
    Path((id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = admit(&state, "GET", &id, &range, &headers) {
        return rejection;
    }
    let state = state.lock().unwrap();

    let values: Vec<Vec<String>> = if range.ends_with(":A") {
        state
            .rows
            .iter()
            .map(|r| r.iter().take(1).cloned().collect())
            .collect()
    } else if range.ends_with(":AF") {
        state.rows.clone()
    } else {
        row_number(&range)
            .and_then(|n| n.checked_sub(2))
            .and_then(|i| state.rows.get(i))
            .map(|r| vec![r.clone()])
            .unwrap_or_default()
    };

    // Numbers come back unformatted to exercise cell conversion.
    let values: Vec<Vec<Value>> = values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|c| match c.parse::<i64>() {
                    Ok(n) => Value::from(n),
                    Err(_) => Value::from(c),
                })
                .collect()
        })
        .collect();

    Json(json!({ "range": range, "majorDimension": "ROWS", "values": values })).into_response()
}

async fn put_values(
    State(state): State<Shared>,
    Path((id, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = admit(&state, "PUT", &id, &range, &headers) {
        return rejection;
    }
    if query.get("valueInputOption").map(String::as_str) != Some("USER_ENTERED") {
        return error(400, "valueInputOption is required");
    }

    let rows = cells(&body);
    let mut state = state.lock().unwrap();
    if let Some(index) = row_number(&range).and_then(|n| n.checked_sub(2)) {
        if state.rows.len() <= index {
            state.rows.resize(index + 1, Vec::new());
        }
        if let Some(row) = rows.first() {
            state.rows[index] = row.clone();
        }
    }

    Json(json!({
        "spreadsheetId": id,
        "updatedRange": range,
        "updatedRows": rows.len(),
    }))
    .into_response()
}

async fn post_values(
    State(state): State<Shared>,
    Path((id, target)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(range) = target.strip_suffix(":append") {
        if let Some(rejection) = admit(&state, "APPEND", &id, range, &headers) {
            return rejection;
        }
        if query.get("insertDataOption").map(String::as_str) != Some("INSERT_ROWS") {
            return error(400, "insertDataOption is required");
        }
        let rows = cells(&body);
        let mut state = state.lock().unwrap();
        state.rows.extend(rows.iter().cloned());
        if std::mem::take(&mut state.garble_append) {
            return (StatusCode::OK, "<html>proxy says hi</html>").into_response();
        }
        return Json(json!({
            "spreadsheetId": id,
            "updates": { "updatedRange": range, "updatedRows": rows.len() }
        }))
        .into_response();
    }

    if let Some(range) = target.strip_suffix(":clear") {
        if let Some(rejection) = admit(&state, "CLEAR", &id, range, &headers) {
            return rejection;
        }
        state.lock().unwrap().rows.clear();
        return Json(json!({ "spreadsheetId": id, "clearedRange": range })).into_response();
    }

    error(404, "Unknown method")
}

struct MockSheets {
    state: Shared,
    base_url: String,
}

impl MockSheets {
    async fn start(rows: Vec<Vec<String>>) -> Self {
        let state: Shared = Arc::new(Mutex::new(ServerState {
            rows,
            ..Default::default()
        }));

        let app = Router::new()
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(get_values).put(put_values).post(post_values),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{}", addr),
        }
    }

    fn client(&self, token: &str) -> TableClient<HttpTransport> {
        TableClient::new(
            HttpTransport::new(self.base_url.clone()),
            Arc::new(CredentialStore::in_memory(Some(token.to_string()))),
            Some(SPREADSHEET_ID.to_string()),
            SheetLayout::default(),
            RetryPolicy::immediate(2),
        )
    }

    fn fail_next(&self, status: u16, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((status, message.to_string()));
    }

    fn garble_next_append(&self) {
        self.state.lock().unwrap().garble_append = true;
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().rows.clone()
    }

    fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[tokio::test]
async fn test_range_operations_round_trip() {
    let server = MockSheets::start(vec![
        row(&["apple", "a fruit"]),
        row(&["banana", "", "noun"]),
    ])
    .await;
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();
    let layout = client.layout().clone();

    let all = client.read_range(&layout.data_range()).await.unwrap();
    assert_eq!(all.values.len(), 2);
    assert_eq!(all.values[1][2], "noun");

    let keys = client.read_range(&layout.key_column_range()).await.unwrap();
    assert_eq!(keys.values, vec![row(&["apple"]), row(&["banana"])]);

    let written = client
        .write_range(&layout.row_range(1), &[row(&["banana", "yellow"])])
        .await
        .unwrap();
    assert_eq!(written.updated_rows, 1);
    assert_eq!(written.updated_range, "Sheet1!A3:AF3");
    assert_eq!(server.rows()[1], row(&["banana", "yellow"]));

    let appended = client
        .append_rows(&layout.append_anchor(), &[row(&["cherry"])])
        .await
        .unwrap();
    assert_eq!(appended.updated_rows, 1);
    assert_eq!(server.rows().len(), 3);

    let cleared = client.clear_range(&layout.data_range()).await.unwrap();
    assert_eq!(cleared, "Sheet1!A2:AF");
    assert!(server.rows().is_empty());
}

#[tokio::test]
async fn test_numeric_cells_become_strings() {
    let mut cells = vec![String::new(); 17];
    cells[0] = "apple".to_string();
    cells[16] = "42".to_string();
    let server = MockSheets::start(vec![cells]).await;
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();

    let result = client
        .read_range(&client.layout().row_range(0))
        .await
        .unwrap();
    assert_eq!(result.values[0][16], "42");
}

#[tokio::test]
async fn test_rejected_token_is_cleared() {
    let server = MockSheets::start(Vec::new()).await;
    let client = server.client("stale-token");
    client.initialize().await.unwrap();

    let err = client
        .read_range(&client.layout().data_range())
        .await
        .unwrap_err();

    assert_eq!(err, SheetError::Unauthenticated);
    assert!(!client.is_signed_in().await);
    assert_eq!(server.requests().len(), 1);
    assert!(client.last_error().await.is_some());
}

#[tokio::test]
async fn test_unknown_sheet_name_reports_range() {
    let server = MockSheets::start(Vec::new()).await;
    let client = TableClient::new(
        HttpTransport::new(server.base_url.clone()),
        Arc::new(CredentialStore::in_memory(Some(TOKEN.to_string()))),
        Some(SPREADSHEET_ID.to_string()),
        SheetLayout::new("Words"),
        RetryPolicy::immediate(2),
    );
    client.initialize().await.unwrap();

    let err = client
        .read_range(&client.layout().data_range())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SheetError::RangeParse {
            range: "Words!A2:AF".to_string()
        }
    );
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_unknown_spreadsheet_is_not_found() {
    let server = MockSheets::start(Vec::new()).await;
    let client = TableClient::new(
        HttpTransport::new(server.base_url.clone()),
        Arc::new(CredentialStore::in_memory(Some(TOKEN.to_string()))),
        Some("nope".to_string()),
        SheetLayout::default(),
        RetryPolicy::immediate(2),
    );
    client.initialize().await.unwrap();

    let err = client
        .read_range(&client.layout().data_range())
        .await
        .unwrap_err();
    assert!(matches!(err, SheetError::NotFound(_)));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockSheets::start(vec![row(&["apple"])]).await;
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();

    server.fail_next(500, "Internal error encountered.");
    server.fail_next(503, "The service is currently unavailable.");
    let result = client
        .read_range(&client.layout().data_range())
        .await
        .unwrap();

    assert_eq!(result.values.len(), 1);
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_retries_give_up_after_limit() {
    let server = MockSheets::start(Vec::new()).await;
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();

    for _ in 0..3 {
        server.fail_next(429, "Quota exceeded");
    }
    let err = client
        .read_range(&client.layout().data_range())
        .await
        .unwrap_err();

    assert_eq!(err, SheetError::RateLimited);
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_unreadable_append_response_is_not_resent() {
    let server = MockSheets::start(Vec::new()).await;
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();

    server.garble_next_append();
    let err = client
        .append_rows(&client.layout().append_anchor(), &[row(&["apple"])])
        .await
        .unwrap_err();

    assert!(matches!(err, SheetError::InvalidResponse(_)));
    assert_eq!(server.requests(), vec!["APPEND Sheet1!A2".to_string()]);
    assert_eq!(server.rows().len(), 1);
    assert!(client.last_error().await.is_some());
}

#[tokio::test]
async fn test_engine_over_http() {
    let server = MockSheets::start(vec![row(&["apple", "a fruit"])]).await;
    let temp_dir = TempDir::new().unwrap();
    let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
    let client = server.client(TOKEN);
    client.initialize().await.unwrap();
    let engine = SyncEngine::new(Arc::new(client), pool, Arc::new(Connectivity::new(true)));

    let added = engine
        .add_words(vec![
            WordEntry::new("apple"),
            WordEntry::new("zenith").with_meaning("peak"),
        ])
        .await
        .unwrap();
    assert_eq!(added.len(), 1);

    let updated = engine
        .update_word(
            "zenith",
            WordEntry::new("zenith").with_meaning("the highest point"),
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 1);

    engine.delete_word("apple").await.unwrap();

    let words = engine.get_all_words(true).await.unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].meaning, "the highest point");
    assert_eq!(words[0].version, 1);

    let rows = server.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][27], "true");
    assert_eq!(rows[0][31], "1");
}
