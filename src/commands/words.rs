use chrono::Local;
use clap::{ArgGroup, Args, Subcommand};
use std::path::{Path, PathBuf};

use super::{confirm, OutputFormat};
use crate::models::{due_words, WordEntry};
use crate::sheet::SheetsTransport;
use crate::sync::SyncEngine;

#[derive(Args)]
pub struct WordsCommand {
    #[command(subcommand)]
    pub command: WordsSubcommand,
}

#[derive(Subcommand)]
pub enum WordsSubcommand {
    /// List words
    List {
        /// Fetch the whole sheet instead of using the cache
        #[arg(long)]
        refresh: bool,

        /// Include deleted words
        #[arg(long)]
        all: bool,

        /// Only words in this category
        #[arg(long)]
        category: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a word's details
    Show {
        word: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add words from a JSON file, or a single word from flags
    Add {
        /// JSON file with one entry or an array of entries
        #[arg(long, conflicts_with = "word")]
        file: Option<PathBuf>,

        /// Word to add
        #[arg(long, required_unless_present = "file")]
        word: Option<String>,

        /// Meaning of the word
        #[arg(long, requires = "word")]
        meaning: Option<String>,

        /// Category of the word
        #[arg(long, requires = "word")]
        category: Option<String>,
    },

    /// Update a word from a JSON file or flags
    Update {
        word: String,

        /// JSON file with the full replacement entry
        #[arg(long)]
        file: Option<PathBuf>,

        /// New meaning
        #[arg(long)]
        meaning: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Soft-delete a word
    Delete {
        word: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// List words scheduled for review today
    Due {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record a review outcome
    #[command(group(ArgGroup::new("outcome").required(true).args(["correct", "wrong"])))]
    Review {
        word: String,

        /// The answer was correct
        #[arg(long)]
        correct: bool,

        /// The answer was wrong
        #[arg(long)]
        wrong: bool,
    },
}

impl WordsCommand {
    pub async fn run<T: SheetsTransport>(
        &self,
        engine: &SyncEngine<T>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            WordsSubcommand::List {
                refresh,
                all,
                category,
                format,
            } => {
                let active = engine.get_all_words(*refresh).await?;
                let words = match (category, *all) {
                    (Some(category), false) => engine.cache().get_by_category(category).await?,
                    (Some(category), true) => {
                        let mut words = engine.cache().get_all().await?;
                        words.retain(|w| w.category.to_lowercase() == category.to_lowercase());
                        words
                    }
                    (None, true) => engine.cache().get_all().await?,
                    (None, false) => active,
                };

                if words.is_empty() {
                    println!("No words found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&words)?);
                    }
                    OutputFormat::Text => print_table(&words),
                }
                Ok(())
            }

            WordsSubcommand::Show { word, format } => {
                let entry = match engine.cache().get(word).await? {
                    Some(entry) => Some(entry),
                    None => {
                        engine.get_all_words(false).await?;
                        engine.cache().get(word).await?
                    }
                };

                match entry {
                    Some(entry) => {
                        match format {
                            OutputFormat::Json => {
                                println!("{}", serde_json::to_string_pretty(&entry)?);
                            }
                            OutputFormat::Text => {
                                println!("{}", entry);
                            }
                        }
                        Ok(())
                    }
                    None => Err(format!("Word not found: {}", word).into()),
                }
            }

            WordsSubcommand::Add {
                file,
                word,
                meaning,
                category,
            } => {
                let entries = match (file, word) {
                    (Some(path), _) => read_entries(path)?,
                    (None, Some(word)) => {
                        let mut entry = WordEntry::new(word.trim());
                        if let Some(meaning) = meaning {
                            entry = entry.with_meaning(meaning);
                        }
                        if let Some(category) = category {
                            entry = entry.with_category(category);
                        }
                        vec![entry]
                    }
                    (None, None) => return Err("Provide --file or --word".into()),
                };

                let requested = entries.len();
                let added = engine.add_words(entries).await?;

                for entry in &added {
                    println!("Added: {}", entry.word);
                }
                let skipped = requested - added.len();
                if skipped > 0 {
                    println!("Skipped {} word(s) already present", skipped);
                }
                if !engine.is_online() {
                    println!("Offline: changes queued and will sync when online.");
                }
                Ok(())
            }

            WordsSubcommand::Update {
                word,
                file,
                meaning,
                category,
                notes,
            } => {
                let has_updates =
                    file.is_some() || meaning.is_some() || category.is_some() || notes.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide --file or at least one option.".into());
                }

                let mut entry = match file {
                    Some(path) => read_entry(path)?,
                    None => engine
                        .cache()
                        .get(word)
                        .await?
                        .ok_or_else(|| format!("Word not found: {}", word))?,
                };
                if let Some(meaning) = meaning {
                    entry.meaning = meaning.clone();
                }
                if let Some(category) = category {
                    entry.category = category.clone();
                }
                if let Some(notes) = notes {
                    entry.notes = notes.clone();
                }

                let updated = engine.update_word(word, entry).await?;
                println!("Updated word:");
                println!("{}", updated);
                Ok(())
            }

            WordsSubcommand::Delete { word, force } => {
                if !force && !confirm(&format!("Delete word '{}'?", word))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                engine.delete_word(word).await?;
                println!("Deleted word: {}", word);
                Ok(())
            }

            WordsSubcommand::Due { format } => {
                let words = engine.get_all_words(false).await?;
                let due = due_words(&words, Local::now().date_naive());

                if due.is_empty() {
                    println!("Nothing due today");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&due)?);
                    }
                    OutputFormat::Text => print_table(&due),
                }
                Ok(())
            }

            WordsSubcommand::Review { word, correct, .. } => {
                let updated = engine.review_word(word, *correct).await?;
                println!(
                    "Recorded {} answer for '{}' (strength {}, {} correct / {} wrong)",
                    if *correct { "correct" } else { "wrong" },
                    updated.word,
                    updated.memory_strength,
                    updated.correct_reviews,
                    updated.wrong_reviews
                );
                Ok(())
            }
        }
    }
}

fn print_table(words: &[WordEntry]) {
    println!("{:<24}  {:<16}  {:>4}  MEANING", "WORD", "CATEGORY", "VER");
    println!("{}", "-".repeat(80));
    for entry in words {
        let mut meaning: String = entry.meaning.chars().take(30).collect();
        if entry.meaning.chars().count() > 30 {
            meaning.push_str("...");
        }
        let marker = if entry.is_deleted { " (deleted)" } else { "" };
        println!(
            "{:<24}  {:<16}  {:>4}  {}{}",
            entry.word, entry.category, entry.version, meaning, marker
        );
    }
    println!("\nTotal: {} word(s)", words.len());
}

/// Reads either a single entry or an array of entries.
fn read_entries(path: &Path) -> Result<Vec<WordEntry>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;

    let entries = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(entries)
}

fn read_entry(path: &Path) -> Result<WordEntry, Box<dyn std::error::Error>> {
    let mut entries = read_entries(path)?;
    if entries.len() != 1 {
        return Err(format!("Expected exactly one entry in '{}'", path.display()).into());
    }
    Ok(entries.remove(0))
}
