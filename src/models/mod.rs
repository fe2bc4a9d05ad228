mod operation;
pub mod review;
mod word;

pub use operation::{OperationKind, PendingOperation};
pub use review::due_words;
pub use word::{normalize_key, Phonetic, UsageExample, WordEntry, TIMESTAMP_FORMAT};
