//! Financial report records and the dataset loader.
//!
//! The dataset is a JSON array of FinQA-style records. Older records carry
//! their question/answer pair under `qa`; newer ones use `qa_0`. Loading
//! renames the legacy key so every record exposes the pair as `qa_0`.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

/// Legacy key for the question/answer pair.
pub const LEGACY_QA_KEY: &str = "qa";

/// Normalized key for the question/answer pair.
pub const QA_KEY: &str = "qa_0";

/// A question with its ground-truth answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// One financial document record.
///
/// The table and question/answer pair are kept as raw JSON so malformed
/// records survive loading and fail at the stage that first needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Dataset identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Narrative segments before the table.
    #[serde(default)]
    pub pre_text: Option<Vec<String>>,
    /// Narrative segments after the table.
    #[serde(default)]
    pub post_text: Option<Vec<String>>,
    /// Table grid: first row holds headers, first column holds row labels.
    #[serde(default)]
    pub table: Option<Value>,
    /// The question/answer pair.
    #[serde(default, rename = "qa_0")]
    pub qa: Option<Value>,
    /// Any other dataset fields, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text of a scalar cell or answer. Strings are taken verbatim, null is empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Report {
    /// Build a well-formed report from its parts.
    pub fn new(
        pre_text: Vec<String>,
        post_text: Vec<String>,
        table: Vec<Vec<String>>,
        qa: QaPair,
    ) -> Self {
        Self {
            id: None,
            pre_text: Some(pre_text),
            post_text: Some(post_text),
            table: Some(Value::from(table)),
            qa: Some(json!({ "question": qa.question, "answer": qa.answer })),
            extra: Map::new(),
        }
    }

    /// Attach a dataset identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Narrative passages in document order: `pre_text` then `post_text`.
    pub fn passages(&self) -> Result<Vec<&str>> {
        let pre = self.pre_text.as_ref().ok_or(RagError::MissingField("pre_text"))?;
        let post = self
            .post_text
            .as_ref()
            .ok_or(RagError::MissingField("post_text"))?;
        Ok(pre.iter().chain(post.iter()).map(String::as_str).collect())
    }

    /// The table grid with every cell as text.
    ///
    /// Numeric and boolean cells are stringified; a row that is not an array
    /// becomes a single-cell row.
    pub fn table(&self) -> Result<Vec<Vec<String>>> {
        let rows = self
            .table
            .as_ref()
            .and_then(Value::as_array)
            .ok_or(RagError::MissingField("table"))?;

        Ok(rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(value_text).collect(),
                other => vec![value_text(other)],
            })
            .collect())
    }

    /// The question/answer pair.
    pub fn qa(&self) -> Result<QaPair> {
        let qa = self
            .qa
            .as_ref()
            .and_then(Value::as_object)
            .ok_or(RagError::MissingField(QA_KEY))?;

        let field = |name: &'static str| {
            qa.get(name)
                .filter(|v| !v.is_null())
                .map(value_text)
                .ok_or(RagError::MissingField(name))
        };

        Ok(QaPair {
            question: field("question")?,
            answer: field("answer")?,
        })
    }

    /// The question alone, when the record has one.
    pub fn question(&self) -> Option<String> {
        self.qa
            .as_ref()?
            .get("question")
            .filter(|v| !v.is_null())
            .map(value_text)
    }
}

/// Move a legacy `qa` entry to `qa_0`. Returns true if the record changed.
///
/// When both keys are present the legacy value overwrites the normalized one.
pub fn normalize_record(record: &mut Value) -> bool {
    let Some(object) = record.as_object_mut() else {
        return false;
    };
    match object.remove(LEGACY_QA_KEY) {
        Some(qa) => {
            object.insert(QA_KEY.to_string(), qa);
            true
        }
        None => false,
    }
}

/// Parse and normalize a dataset held in memory.
pub fn parse_reports(content: &str) -> Result<Vec<Report>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| RagError::Load(format!("invalid JSON: {}", e)))?;

    let Value::Array(records) = value else {
        return Err(RagError::Load(
            "expected a JSON array of report records".to_string(),
        ));
    };

    records
        .into_iter()
        .enumerate()
        .map(|(position, mut record)| {
            normalize_record(&mut record);
            serde_json::from_value(record)
                .map_err(|e| RagError::Load(format!("record {}: {}", position, e)))
        })
        .collect()
}

/// Load the dataset file at `path`.
pub fn load_reports(path: &Path) -> Result<Vec<Report>> {
    let content = fs::read_to_string(path)
        .map_err(|e| RagError::Load(format!("cannot read '{}': {}", path.display(), e)))?;
    let reports = parse_reports(&content)?;
    tracing::info!(path = %path.display(), reports = reports.len(), "loaded dataset");
    Ok(reports)
}
