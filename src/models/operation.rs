use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::word::WordEntry;

/// A mutation recorded while offline, replayed once the sheet is reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingOperation {
    Add { data: Vec<WordEntry> },
    Update { word: String, data: WordEntry },
    Delete { word: String },
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingOperation::Add { .. } => OperationKind::Add,
            PendingOperation::Update { .. } => OperationKind::Update,
            PendingOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    /// The addressed word, for update and delete.
    pub fn word(&self) -> Option<&str> {
        match self {
            PendingOperation::Add { .. } => None,
            PendingOperation::Update { word, .. } | PendingOperation::Delete { word } => {
                Some(word)
            }
        }
    }
}

impl fmt::Display for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOperation::Add { data } => {
                let words: Vec<&str> = data.iter().map(|w| w.word.as_str()).collect();
                write!(f, "add {}", words.join(", "))
            }
            PendingOperation::Update { word, .. } => write!(f, "update {}", word),
            PendingOperation::Delete { word } => write!(f, "delete {}", word),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Add => write!(f, "add"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(OperationKind::Add),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            _ => Err(format!(
                "Invalid operation kind '{}'. Valid options: add, update, delete",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_kind_from_str() {
        assert_eq!(OperationKind::from_str("add").unwrap(), OperationKind::Add);
        assert_eq!(
            OperationKind::from_str("UPDATE").unwrap(),
            OperationKind::Update
        );
        assert!(OperationKind::from_str("upsert").is_err());
    }

    #[test]
    fn test_operation_json_is_tagged() {
        let op = PendingOperation::Delete {
            word: "apple".to_string(),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"{"type":"delete","word":"apple"}"#);

        let parsed: PendingOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn test_operation_word_and_kind() {
        let add = PendingOperation::Add {
            data: vec![WordEntry::new("zenith")],
        };
        let update = PendingOperation::Update {
            word: "apple".to_string(),
            data: WordEntry::new("apple"),
        };

        assert_eq!(add.kind(), OperationKind::Add);
        assert_eq!(add.word(), None);
        assert_eq!(update.kind(), OperationKind::Update);
        assert_eq!(update.word(), Some("apple"));
        assert_eq!(format!("{}", add), "add zenith");
    }
}
