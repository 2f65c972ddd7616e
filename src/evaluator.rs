//! LLM-as-judge grading of generated answers.
//!
//! Each prediction is graded against its ground truth with a fixed rubric:
//! 1 for a fully correct answer, 0.5 for an answer within ±0.5 of the
//! reference, 0 otherwise. The ground truth is always sent as the correct
//! answer and the generated text as the student answer.

use crate::error::{RagError, Result};
use crate::llm::{Prompts, TextGenerator, extract_json, fill_template};
use crate::runner::PredictionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A rubric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Score {
    Zero,
    Half,
    Full,
}

impl Score {
    pub fn value(self) -> f64 {
        match self {
            Score::Zero => 0.0,
            Score::Half => 0.5,
            Score::Full => 1.0,
        }
    }

    /// Map a numeric score onto the rubric, rejecting anything off-scale.
    pub fn from_value(value: f64) -> Option<Self> {
        [Score::Zero, Score::Half, Score::Full]
            .into_iter()
            .find(|score| (score.value() - value).abs() < 1e-9)
    }
}

impl TryFrom<f64> for Score {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        Score::from_value(value).ok_or_else(|| format!("score {} is not one of 0, 0.5, 1", value))
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Zero => write!(f, "0"),
            Score::Half => write!(f, "0.5"),
            Score::Full => write!(f, "1"),
        }
    }
}

/// The grader's verdict on one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: Score,
    pub explanation: String,
}

/// A prediction together with its grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub actual_answer: String,
    pub expected_answer: String,
    pub score: Score,
    pub explanation: String,
}

impl EvaluationRecord {
    pub fn new(prediction: PredictionRecord, grade: Grade) -> Self {
        Self {
            question: prediction.question,
            actual_answer: prediction.actual_answer,
            expected_answer: prediction.expected_answer,
            score: grade.score,
            explanation: grade.explanation,
        }
    }
}

/// One row of the summary: how many records got a score, and their share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub score: Score,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percentage (%)")]
    pub percentage: f64,
}

/// Score distribution over an evaluation run, ascending by score.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryReport {
    pub rows: Vec<SummaryRow>,
    pub total: usize,
}

impl SummaryReport {
    /// Average score across all records, or `None` for an empty run.
    pub fn mean_score(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let sum: f64 = self
            .rows
            .iter()
            .map(|row| row.score.value() * row.count as f64)
            .sum();
        Some(sum / self.total as f64)
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>5}  {:>6}  {:>14}", "score", "Count", "Percentage (%)")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>5}  {:>6}  {:>14.1}",
                row.score.to_string(),
                row.count,
                row.percentage
            )?;
        }
        write!(f, "{:>5}  {:>6}", "total", self.total)
    }
}

/// Grades predictions with a language model.
pub struct AnswerEvaluator {
    grader: Arc<dyn TextGenerator>,
    rubric: String,
    input_template: String,
}

impl AnswerEvaluator {
    /// Create an evaluator using the financial QA rubric.
    pub fn new(grader: Arc<dyn TextGenerator>) -> Self {
        Self {
            grader,
            rubric: Prompts::grading_rubric().to_string(),
            input_template: Prompts::grading_input().to_string(),
        }
    }

    fn grading_prompt(&self, record: &PredictionRecord) -> String {
        fill_template(
            &self.input_template,
            &[
                ("question", record.question.as_str()),
                ("correct_answer", record.expected_answer.as_str()),
                ("student_answer", record.actual_answer.as_str()),
            ],
        )
    }

    /// Grade one prediction.
    ///
    /// A generated answer identical to the reference (ignoring surrounding
    /// whitespace) scores 1 without consulting the model.
    pub async fn evaluate(&self, record: &PredictionRecord) -> Result<Grade> {
        if record.actual_answer.trim() == record.expected_answer.trim() {
            return Ok(Grade {
                score: Score::Full,
                explanation: "The student answer matches the ground truth answer exactly."
                    .to_string(),
            });
        }

        let prompt = self.grading_prompt(record);
        let response = self
            .grader
            .generate(Some(&self.rubric), &prompt)
            .await
            .map_err(|e| RagError::Generation(format!("grading call failed: {}", e)))?;

        Self::parse_grade(&response)
    }

    /// Grade every prediction in order. The first failure aborts the run.
    pub async fn run(&self, records: &[PredictionRecord]) -> Result<Vec<EvaluationRecord>> {
        let mut evaluations = Vec::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            let grade = self.evaluate(record).await?;
            tracing::info!(
                record = position + 1,
                total = records.len(),
                score = %grade.score,
                "graded answer"
            );
            evaluations.push(EvaluationRecord::new(record.clone(), grade));
        }

        Ok(evaluations)
    }

    /// Count records per score and each score's share of the total.
    pub fn create_report(evaluations: &[EvaluationRecord]) -> SummaryReport {
        let mut counts: BTreeMap<Score, usize> = BTreeMap::new();
        for evaluation in evaluations {
            *counts.entry(evaluation.score).or_default() += 1;
        }

        let total = evaluations.len();
        let rows = counts
            .into_iter()
            .map(|(score, count)| SummaryRow {
                score,
                count,
                percentage: count as f64 / total as f64 * 100.0,
            })
            .collect();

        SummaryReport { rows, total }
    }

    /// Parse the grader's JSON reply into a grade.
    fn parse_grade(response: &str) -> Result<Grade> {
        #[derive(Deserialize)]
        struct RawGrade {
            #[serde(alias = "Score")]
            score: Option<Value>,
            #[serde(alias = "Explanation")]
            explanation: Option<String>,
        }

        let malformed = |reason: &str| {
            RagError::MalformedGradingResponse(format!("{}. Response: {}", reason, response))
        };

        let raw: RawGrade = serde_json::from_str(extract_json(response))
            .map_err(|e| malformed(&format!("not a JSON object ({})", e)))?;

        let value = match raw.score {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| malformed("missing numeric score"))?;

        let score = Score::from_value(value)
            .ok_or_else(|| malformed(&format!("score {} is not one of 0, 0.5, 1", value)))?;

        let explanation = raw
            .explanation
            .ok_or_else(|| malformed("missing explanation"))?;

        Ok(Grade { score, explanation })
    }
}
