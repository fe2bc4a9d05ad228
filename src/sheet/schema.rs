//! Column layout of the word table.
//!
//! Both directions of the row codec walk [`COLUMNS`], so reordering or adding
//! a column only happens here.

/// How a column's cell is written and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Plain text, written as-is.
    Text,
    /// A JSON array or object serialized into the cell.
    Json,
    /// Decimal integer.
    Integer,
    /// `"true"` / `"false"`.
    Boolean,
}

/// One spreadsheet column bound to a `WordEntry` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field name on `WordEntry`, also used as the header cell.
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Cell text used when the field is missing or unreadable.
    pub default: &'static str,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
        default: "",
    }
}

const fn json(name: &'static str, default: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Json,
        default,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
        default: "0",
    }
}

const fn boolean(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Boolean,
        default: "false",
    }
}

pub const PHONETIC_DEFAULT: &str = r#"{"short":"","long":""}"#;

/// Columns `A` through `AF`, in sheet order.
pub const COLUMNS: [Column; 32] = [
    text("word"),
    text("meaning"),
    text("part_of_speech"),
    json("phonetic", PHONETIC_DEFAULT),
    text("etymology"),
    json("examples", "[]"),
    json("mnemonics", "[]"),
    json("collocations", "[]"),
    json("common_mistakes", "[]"),
    text("formality_level"),
    text("cultural_notes"),
    text("gesture_association"),
    text("emotional_connotation"),
    text("grammar_notes"),
    json("word_family", "[]"),
    json("variants", "[]"),
    integer("memory_strength"),
    json("spaced_repetition_dates", "[]"),
    text("difficulty_level"),
    text("category"),
    json("synonyms", "[]"),
    json("antonyms", "[]"),
    text("usage_frequency"),
    json("related_words", "[]"),
    text("source"),
    text("notes"),
    json("example_audio_url", "[]"),
    boolean("is_deleted"),
    integer("correct_reviews"),
    integer("wrong_reviews"),
    text("last_reviewed"),
    integer("version"),
];

/// Position of the key (`word`) column.
pub const KEY_COLUMN: usize = 0;

/// Looks up a column by field name.
pub fn column(name: &str) -> Option<(usize, &'static Column)> {
    COLUMNS.iter().enumerate().find(|(_, c)| c.name == name)
}

/// Header cells for row 1.
pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_column_names_are_unique() {
        let names: HashSet<&str> = COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), COLUMNS.len());
    }

    #[test]
    fn test_key_column_is_word() {
        assert_eq!(COLUMNS[KEY_COLUMN].name, "word");
    }

    #[test]
    fn test_json_defaults_parse() {
        for column in COLUMNS.iter().filter(|c| c.kind == ColumnKind::Json) {
            assert!(
                serde_json::from_str::<serde_json::Value>(column.default).is_ok(),
                "default of {} is not JSON",
                column.name
            );
        }
    }

    #[test]
    fn test_column_lookup() {
        let (index, col) = column("version").unwrap();
        assert_eq!(index, 31);
        assert_eq!(col.kind, ColumnKind::Integer);
        assert!(column("nonexistent").is_none());
    }

    #[test]
    fn test_header_row() {
        let header = header_row();
        assert_eq!(header.len(), 32);
        assert_eq!(header[0], "word");
        assert_eq!(header[27], "is_deleted");
    }
}
