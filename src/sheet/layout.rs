//! A1-notation addressing for the word table.
//!
//! Row order is the only addressing mechanism the spreadsheet offers: row 1
//! holds the header and data rows start at row 2, so the data row at
//! zero-based index `i` lives on sheet row `i + 2`.

use super::schema::COLUMNS;

/// Default tab name of the word table.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Where the word table lives inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    sheet_name: String,
    first_column: String,
    last_column: String,
    key_column: String,
    start_row: usize,
}

impl SheetLayout {
    /// Layout spanning exactly the schema's columns on the given tab.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            first_column: "A".to_string(),
            last_column: column_letters(COLUMNS.len() - 1),
            key_column: "A".to_string(),
            start_row: 2,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    /// Number of cells in every row written to the sheet.
    pub fn column_count(&self) -> usize {
        match (
            column_index(&self.first_column),
            column_index(&self.last_column),
        ) {
            (Some(first), Some(last)) if last >= first => last - first + 1,
            _ => COLUMNS.len(),
        }
    }

    /// Every data row: `Sheet1!A2:AF`.
    pub fn data_range(&self) -> String {
        format!(
            "{}!{}{}:{}",
            self.quoted_name(),
            self.first_column,
            self.start_row,
            self.last_column
        )
    }

    /// The key column below the header: `Sheet1!A2:A`.
    pub fn key_column_range(&self) -> String {
        format!(
            "{}!{}{}:{}",
            self.quoted_name(),
            self.key_column,
            self.start_row,
            self.key_column
        )
    }

    /// A single data row by zero-based data index: `Sheet1!A5:AF5` for index 3.
    pub fn row_range(&self, index: usize) -> String {
        let row = self.sheet_row(index);
        format!(
            "{}!{}{}:{}{}",
            self.quoted_name(),
            self.first_column,
            row,
            self.last_column,
            row
        )
    }

    /// Anchor for appending rows after the existing data: `Sheet1!A2`.
    pub fn append_anchor(&self) -> String {
        format!(
            "{}!{}{}",
            self.quoted_name(),
            self.first_column,
            self.start_row
        )
    }

    /// The header row: `Sheet1!A1:AF1`.
    pub fn header_range(&self) -> String {
        let row = self.start_row - 1;
        format!(
            "{}!{}{}:{}{}",
            self.quoted_name(),
            self.first_column,
            row,
            self.last_column,
            row
        )
    }

    /// 1-based sheet row of a zero-based data index.
    pub fn sheet_row(&self, index: usize) -> usize {
        index + self.start_row
    }

    fn quoted_name(&self) -> String {
        let plain = self
            .sheet_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            self.sheet_name.clone()
        } else {
            format!("'{}'", self.sheet_name.replace('\'', "''"))
        }
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_NAME)
    }
}

/// Zero-based index of a column given in letters (`A` = 0, `AF` = 31).
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut num = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        num = num.checked_mul(26)?.checked_add(digit)?;
    }
    Some(num - 1)
}

/// Column letters of a zero-based index (31 = `AF`).
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AF"), Some(31));
        assert_eq!(column_index("af"), Some(31));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(31), "AF");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_default_layout_ranges() {
        let layout = SheetLayout::default();

        assert_eq!(layout.column_count(), 32);
        assert_eq!(layout.data_range(), "Sheet1!A2:AF");
        assert_eq!(layout.key_column_range(), "Sheet1!A2:A");
        assert_eq!(layout.row_range(0), "Sheet1!A2:AF2");
        assert_eq!(layout.row_range(3), "Sheet1!A5:AF5");
        assert_eq!(layout.append_anchor(), "Sheet1!A2");
        assert_eq!(layout.header_range(), "Sheet1!A1:AF1");
    }

    #[test]
    fn test_sheet_name_with_spaces_is_quoted() {
        let layout = SheetLayout::new("My Words");
        assert_eq!(layout.data_range(), "'My Words'!A2:AF");

        let layout = SheetLayout::new("Tom's");
        assert_eq!(layout.append_anchor(), "'Tom''s'!A2");
    }
}
