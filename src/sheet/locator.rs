//! Resolves a word to its data row.

use super::client::TableClient;
use super::error::SheetError;
use super::transport::SheetsTransport;
use crate::models::normalize_key;

/// Zero-based data-row index of `word`, or `None` when the key column has no
/// case-insensitive match.
///
/// Reads the whole key column on every call; the first match wins.
pub async fn find_word_row_index<T: SheetsTransport>(
    client: &TableClient<T>,
    word: &str,
) -> Result<Option<usize>, SheetError> {
    let target = normalize_key(word);
    let column = client
        .read_range(&client.layout().key_column_range())
        .await?;

    Ok(column.values.iter().position(|row| {
        row.first()
            .map(|cell| normalize_key(cell) == target)
            .unwrap_or(false)
    }))
}
