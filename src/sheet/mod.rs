//! Spreadsheet access: row codec, A1 layout, transport and the retrying
//! table client.

pub mod client;
pub mod codec;
pub mod error;
pub mod layout;
pub mod locator;
pub mod schema;
pub mod state;
pub mod transport;

pub use client::{RetryPolicy, TableClient};
pub use error::{ApiFailure, SheetError};
pub use layout::{SheetLayout, DEFAULT_SHEET_NAME};
pub use locator::find_word_row_index;
pub use state::ClientState;
pub use transport::{
    CallContext, HttpTransport, SheetsTransport, UpdateSummary, ValueRange, DEFAULT_API_BASE_URL,
};
