//! Question -> answer lookup, filled once at startup from a JSON snapshot.
//!
//! The cache is never written after construction. Fresh pipeline answers are
//! not stored back, so a repeated question runs the full pipeline again.

use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// One record of the persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question: String,
    pub result: String,
}

#[derive(Debug, Default)]
pub struct AnswerCache {
    answers: HashMap<String, String>,
}

impl AnswerCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Later records win when a question appears more than once.
    pub fn from_records(records: impl IntoIterator<Item = AnswerRecord>) -> Self {
        let mut answers = HashMap::new();
        for record in records {
            answers.insert(record.question, record.result);
        }
        Self { answers }
    }

    /// Loads the snapshot at `path`. A missing file yields an empty cache.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::empty());
        };
        if !path.exists() {
            info!(path = %path.display(), "Answer snapshot not found, starting with empty cache");
            return Ok(Self::empty());
        }

        let content = fs::read_to_string(path)?;
        let records: Vec<AnswerRecord> = serde_json::from_str(&content).map_err(|err| {
            AppError::ParseError(format!(
                "Failed to parse answer snapshot {}: {}",
                path.display(),
                err
            ))
        })?;

        let cache = Self::from_records(records);
        info!(
            path = %path.display(),
            entries = cache.len(),
            "Loaded answer snapshot"
        );
        Ok(cache)
    }

    /// Exact, case- and whitespace-sensitive lookup.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
