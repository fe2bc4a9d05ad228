use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Format used for `last_reviewed` stamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pronunciation hint shown on the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phonetic {
    pub short: String,
    pub long: String,
}

/// A sentence in the source language with its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageExample {
    pub sentence: String,
    pub translation: String,
}

/// A single vocabulary entry with its metadata and review state.
///
/// `word` is the identity of the entry: it is the primary key of the local
/// cache (lowercased, see [`WordEntry::key`]) and the value matched against
/// the spreadsheet's key column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordEntry {
    pub word: String,
    pub meaning: String,
    pub part_of_speech: String,
    #[serde(deserialize_with = "lenient")]
    pub phonetic: Phonetic,
    pub etymology: String,
    #[serde(deserialize_with = "lenient")]
    pub examples: Vec<UsageExample>,
    #[serde(deserialize_with = "lenient")]
    pub mnemonics: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub collocations: Vec<UsageExample>,
    #[serde(deserialize_with = "lenient")]
    pub common_mistakes: Vec<String>,
    pub formality_level: String,
    pub cultural_notes: String,
    pub gesture_association: String,
    pub emotional_connotation: String,
    pub grammar_notes: String,
    #[serde(deserialize_with = "lenient")]
    pub word_family: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub variants: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub memory_strength: i64,
    #[serde(deserialize_with = "lenient")]
    pub spaced_repetition_dates: Vec<NaiveDate>,
    pub difficulty_level: String,
    pub category: String,
    #[serde(deserialize_with = "lenient")]
    pub synonyms: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub antonyms: Vec<String>,
    pub usage_frequency: String,
    #[serde(deserialize_with = "lenient")]
    pub related_words: Vec<String>,
    pub source: String,
    pub notes: String,
    #[serde(deserialize_with = "lenient")]
    pub example_audio_url: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub is_deleted: bool,
    #[serde(deserialize_with = "lenient")]
    pub correct_reviews: u32,
    #[serde(deserialize_with = "lenient")]
    pub wrong_reviews: u32,
    pub last_reviewed: String,
    #[serde(deserialize_with = "lenient")]
    pub version: u64,
    /// Keys outside the spreadsheet layout. Kept in the local cache, never
    /// written to the sheet.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Falls back to the field's default when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl WordEntry {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = meaning.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_review_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.spaced_repetition_dates = dates;
        self
    }

    /// Normalized lookup key: trimmed and lowercased.
    pub fn key(&self) -> String {
        normalize_key(&self.word)
    }

    /// True unless the entry has been soft-deleted.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Marks the entry deleted and stamps `last_reviewed` with `now`.
    pub fn mark_deleted(&mut self, now: NaiveDateTime) {
        self.is_deleted = true;
        self.last_reviewed = now.format(TIMESTAMP_FORMAT).to_string();
    }
}

/// Lowercases and trims a word so it can be used as a cache key.
pub fn normalize_key(word: &str) -> String {
    word.trim().to_lowercase()
}

impl fmt::Display for WordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.word)?;
        writeln!(f, "{}", "=".repeat(self.word.chars().count()))?;
        if !self.part_of_speech.is_empty() {
            writeln!(f, "({})", self.part_of_speech)?;
        }
        if !self.phonetic.short.is_empty() {
            writeln!(f, "Pronunciation: {}", self.phonetic.short)?;
        }
        writeln!(f, "Meaning: {}", self.meaning)?;

        if !self.category.is_empty() {
            writeln!(f, "Category: {}", self.category)?;
        }
        if !self.difficulty_level.is_empty() {
            writeln!(f, "Difficulty: {}", self.difficulty_level)?;
        }

        if !self.examples.is_empty() {
            writeln!(f, "\nExamples:")?;
            for example in &self.examples {
                writeln!(f, "  - {}", example.sentence)?;
                if !example.translation.is_empty() {
                    writeln!(f, "    {}", example.translation)?;
                }
            }
        }

        if !self.synonyms.is_empty() {
            writeln!(f, "\nSynonyms: {}", self.synonyms.join(", "))?;
        }

        writeln!(
            f,
            "\nReviews: {} correct, {} wrong (strength {})",
            self.correct_reviews, self.wrong_reviews, self.memory_strength
        )?;
        if !self.spaced_repetition_dates.is_empty() {
            let dates: Vec<String> = self
                .spaced_repetition_dates
                .iter()
                .map(|d| d.to_string())
                .collect();
            writeln!(f, "Due: {}", dates.join(", "))?;
        }
        write!(f, "Version: {}", self.version)?;
        if self.is_deleted {
            write!(f, " (deleted)")?;
        }
        Ok(())
    }
}
