use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::utils::gemini::AnswerOutcome;

pub const QUESTION_PLACEHOLDER: &str = "N/A Question";
pub const ANSWER_PLACEHOLDER: &str = "N/A Answer";

/// A saved question/answer pair.
///
/// Both fields are optional so records coming from loosely-shaped JSON still
/// render; missing values fall back to placeholders and non-string values are
/// kept in their JSON text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub answer: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

impl QaRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            answer: Some(answer.into()),
        }
    }

    pub fn question_or_placeholder(&self) -> &str {
        self.question.as_deref().unwrap_or(QUESTION_PLACEHOLDER)
    }

    pub fn answer_or_placeholder(&self) -> &str {
        self.answer.as_deref().unwrap_or(ANSWER_PLACEHOLDER)
    }
}

/// Ordered, append-only list of saved answers with a single bulk clear.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<QaRecord>,
}

impl Ledger {
    pub fn append(&mut self, record: QaRecord) {
        self.records.push(record);
    }

    /// Removes every record and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        removed
    }

    pub fn records(&self) -> &[QaRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Renders the ledger as numbered `Q{n}` / `A{n}` lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, record) in self.records.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str(&format!(
                "Q{n}: {}\nA{n}: {}\n",
                record.question_or_placeholder(),
                record.answer_or_placeholder(),
                n = idx + 1
            ));
        }
        out
    }
}

/// The document currently loaded into the session.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Where the document came from (file path or URL), for display only.
    pub source: String,
    pub text: String,
    pub page_count: usize,
}

/// Latest answer returned by the answer service, not yet saved.
#[derive(Debug)]
pub struct PendingAnswer {
    pub question: String,
    pub outcome: AnswerOutcome,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SaveError {
    #[error("There is no answer to save. Ask a question first.")]
    NothingPending,

    #[error("The last answer is not eligible for saving: {0}")]
    NotSaveable(String),
}

/// Per-client state threaded through every tool call.
#[derive(Debug, Default)]
pub struct Session {
    document: Option<LoadedDocument>,
    pending: Option<PendingAnswer>,
    ledger: Ledger,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the document, the pending answer and every saved answer.
    pub fn reset(&mut self) {
        debug!(
            saved = self.ledger.len(),
            had_document = self.document.is_some(),
            "Resetting session state"
        );
        *self = Self::default();
    }

    /// Replaces the loaded document. Any pending answer belonged to the old one and is discarded.
    pub fn load_document(&mut self, document: LoadedDocument) {
        self.pending = None;
        self.document = Some(document);
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    /// Stores a fresh answer, replacing whatever was pending.
    pub fn set_pending(&mut self, question: String, outcome: AnswerOutcome) -> &PendingAnswer {
        self.pending.insert(PendingAnswer { question, outcome })
    }

    pub fn pending(&self) -> Option<&PendingAnswer> {
        self.pending.as_ref()
    }

    /// Commits the pending answer into the ledger.
    ///
    /// Failed answers are rejected and stay pending; a successful save consumes
    /// the pending answer so it cannot be saved twice.
    pub fn save_pending(&mut self) -> Result<&QaRecord, SaveError> {
        let pending = self.pending.as_ref().ok_or(SaveError::NothingPending)?;
        if !pending.outcome.is_saveable() {
            return Err(SaveError::NotSaveable(pending.outcome.text().to_string()));
        }

        let pending = self.pending.take().ok_or(SaveError::NothingPending)?;
        let record = QaRecord::new(pending.question, pending.outcome.text());
        self.ledger.append(record);
        info!(saved = self.ledger.len(), "Answer saved");
        Ok(&self.ledger.records[self.ledger.len() - 1])
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn clear_ledger(&mut self) -> usize {
        self.ledger.clear()
    }
}
