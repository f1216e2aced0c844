use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub const UNREADABLE_REASON: &str = "File not readable";
pub const PARSE_FAILURE_REASON: &str = "Could not parse";
pub const QUESTIONS_PARSE_FAILURE: &str = "Could not parse questions";
pub const DEFAULT_PRICE_PER_1K_TOKENS: f64 = 0.0015;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
    Zip,
}

impl DocumentFormat {
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "zip" => Self::Zip,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename);
        Self {
            filename,
            bytes,
            format,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Questions {
    Suggested(String),
    Screening {
        truth_check: String,
        fit_check: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevanceAssessment {
    pub score: f64,
    pub reason: String,
    pub raw_response: String,
    pub questions: Option<Questions>,
    pub token_count: u64,
    /// Set when the model answered outside the configured score range.
    pub out_of_range: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AssessmentOutcome {
    Scored(RelevanceAssessment),
    Unreadable,
    ParseFailure { raw_response: String, token_count: u64 },
    ServiceFailure { message: String },
}

impl AssessmentOutcome {
    pub fn score(&self) -> f64 {
        match self {
            Self::Scored(assessment) => assessment.score,
            _ => 0.0,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Scored(assessment) => assessment.reason.clone(),
            Self::Unreadable => UNREADABLE_REASON.to_string(),
            Self::ParseFailure { .. } => PARSE_FAILURE_REASON.to_string(),
            Self::ServiceFailure { message } => format!("Service unavailable: {message}"),
        }
    }

    /// Tokens billed for the call that produced this outcome.
    pub fn token_count(&self) -> u64 {
        match self {
            Self::Scored(assessment) => assessment.token_count,
            Self::ParseFailure { token_count, .. } => *token_count,
            Self::Unreadable | Self::ServiceFailure { .. } => 0,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateResult {
    pub filename: String,
    pub outcome: AssessmentOutcome,
    pub section: Option<String>,
    pub questions: Option<Questions>,
    pub tokens_spent: u64,
}

impl CandidateResult {
    pub fn unreadable(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            outcome: AssessmentOutcome::Unreadable,
            section: None,
            questions: None,
            tokens_spent: 0,
        }
    }

    pub fn score(&self) -> f64 {
        self.outcome.score()
    }

    pub fn reason(&self) -> String {
        self.outcome.reason()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    results: Vec<CandidateResult>,
    total_tokens: u64,
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            results: Vec::new(),
            total_tokens: 0,
        }
    }

    pub fn push(&mut self, result: CandidateResult) {
        self.total_tokens = self.total_tokens.saturating_add(result.tokens_spent);
        self.results.push(result);
    }

    /// Results in processing order.
    pub fn results(&self) -> &[CandidateResult] {
        &self.results
    }

    pub fn get(&self, filename: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|result| result.filename == filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.get(filename).is_some()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results sorted by score, highest first. Equal scores keep processing order.
    pub fn ranked(&self) -> Vec<&CandidateResult> {
        let mut ranked = self.results.iter().collect::<Vec<_>>();
        ranked.sort_by(|left, right| right.score().total_cmp(&left.score()));
        ranked
    }

    pub fn estimated_cost(&self, price_per_thousand: f64) -> f64 {
        estimate_cost(self.total_tokens, price_per_thousand)
    }

    pub fn clear(&mut self) {
        self.results.clear();
        self.total_tokens = 0;
    }

    /// Swaps in a new outcome for one row. With `refresh_questions` the row's
    /// questions are replaced by the ones the new outcome carries, or cleared
    /// when it carries none.
    pub(crate) fn replace_outcome(
        &mut self,
        filename: &str,
        outcome: AssessmentOutcome,
        section: String,
        refresh_questions: bool,
    ) -> bool {
        let Some(entry) = self.results.iter_mut().find(|result| result.filename == filename) else {
            return false;
        };

        let cost = outcome.token_count();
        if refresh_questions {
            entry.questions = match &outcome {
                AssessmentOutcome::Scored(assessment) => assessment.questions.clone(),
                _ => None,
            };
        }
        entry.outcome = outcome;
        entry.section = Some(section);
        entry.tokens_spent = entry.tokens_spent.saturating_add(cost);
        self.total_tokens = self.total_tokens.saturating_add(cost);
        true
    }

    pub(crate) fn attach_questions(
        &mut self,
        filename: &str,
        questions: Questions,
        token_count: u64,
    ) -> bool {
        let Some(entry) = self.results.iter_mut().find(|result| result.filename == filename) else {
            return false;
        };

        entry.questions = Some(questions);
        entry.tokens_spent = entry.tokens_spent.saturating_add(token_count);
        self.total_tokens = self.total_tokens.saturating_add(token_count);
        true
    }
}

pub fn estimate_cost(tokens: u64, price_per_thousand: f64) -> f64 {
    tokens as f64 / 1000.0 * price_per_thousand
}

pub fn cost_caption(tokens: u64, price_per_thousand: f64) -> String {
    format!(
        "Estimated tokens: {tokens} | Cost: ${:.4}",
        estimate_cost(tokens, price_per_thousand)
    )
}
