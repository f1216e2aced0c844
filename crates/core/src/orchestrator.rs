use crate::extractor::TextExtractor;
use crate::models::{AssessmentOutcome, BatchRun, CandidateResult, Document};
use crate::relevance::{QuestionReply, RelevanceClient};
use crate::slicer::{SectionSlicer, SlicerConfig};
use crate::traits::TextGenerator;
use crate::{GenerationError, ScreeningError};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_DOCUMENTS: usize = 20;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionMode {
    #[default]
    None,
    /// One combined call returns score, reason and suggested questions.
    Suggested,
    /// A second call per scored candidate returns truth-check and fit-check sets.
    Screening,
}

#[derive(Debug, Clone)]
pub struct ScreeningOptions {
    pub max_documents: usize,
    pub question_mode: QuestionMode,
    pub call_timeout: Duration,
    pub slicer: SlicerConfig,
}

impl Default for ScreeningOptions {
    fn default() -> Self {
        Self {
            max_documents: DEFAULT_MAX_DOCUMENTS,
            question_mode: QuestionMode::None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            slicer: SlicerConfig::default(),
        }
    }
}

pub struct ScreeningCoordinator<E, G> {
    extractor: E,
    client: RelevanceClient<G>,
    slicer: SectionSlicer,
    options: ScreeningOptions,
}

impl<E, G> ScreeningCoordinator<E, G>
where
    E: TextExtractor,
    G: TextGenerator,
{
    pub fn new(
        extractor: E,
        client: RelevanceClient<G>,
        options: ScreeningOptions,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor,
            client,
            slicer: SectionSlicer::new(options.slicer.clone())?,
            options,
        })
    }

    pub fn slicer(&self) -> &SectionSlicer {
        &self.slicer
    }

    pub fn options(&self) -> &ScreeningOptions {
        &self.options
    }

    /// Screens every document in order. Per-document failures become flagged
    /// rows; only invalid input fails the run, and it does so before any
    /// document is touched.
    pub async fn run(
        &self,
        job_description: &str,
        documents: Vec<Document>,
    ) -> Result<BatchRun, ScreeningError> {
        self.validate(job_description, &documents)?;

        let mut run = BatchRun::new();
        info!(run_id = %run.id, documents = documents.len(), "screening started");

        for document in documents {
            let result = self.screen_document(job_description, &document).await;
            debug!(
                filename = %result.filename,
                score = result.score(),
                tokens = result.tokens_spent,
                "candidate screened"
            );
            run.push(result);
        }

        info!(
            run_id = %run.id,
            candidates = run.len(),
            total_tokens = run.total_tokens(),
            "screening finished"
        );
        Ok(run)
    }

    /// Re-assesses one candidate against a (possibly edited) section and
    /// replaces only that row. The new call's cost is added to the run. On
    /// error the run is left untouched.
    pub async fn rescore(
        &self,
        run: &mut BatchRun,
        job_description: &str,
        filename: &str,
        section: &str,
    ) -> Result<(), ScreeningError> {
        if job_description.trim().is_empty() {
            return Err(ScreeningError::EmptyJobDescription);
        }
        if !run.contains(filename) {
            return Err(ScreeningError::UnknownCandidate(filename.to_string()));
        }

        let outcome = self.assess(job_description, section).await;
        info!(
            %filename,
            score = outcome.score(),
            tokens = outcome.token_count(),
            "candidate rescored"
        );
        let refresh_questions = self.options.question_mode == QuestionMode::Suggested;
        run.replace_outcome(filename, outcome, section.to_string(), refresh_questions);
        Ok(())
    }

    /// Generates truth-check and fit-check questions for shortlisted candidates.
    pub async fn shortlist_questions(
        &self,
        run: &mut BatchRun,
        job_description: &str,
        shortlist: &[String],
    ) -> Result<(), ScreeningError> {
        if job_description.trim().is_empty() {
            return Err(ScreeningError::EmptyJobDescription);
        }
        if shortlist.is_empty() {
            return Err(ScreeningError::EmptyShortlist);
        }
        if let Some(unknown) = shortlist.iter().find(|name| !run.contains(name)) {
            return Err(ScreeningError::UnknownCandidate(unknown.clone()));
        }

        for filename in shortlist {
            let Some(section) = run.get(filename).and_then(|result| result.section.clone()) else {
                warn!(%filename, "no section text for shortlisted candidate, skipping questions");
                continue;
            };

            let reply = self
                .fetch_screening_questions(job_description, &section, filename)
                .await;
            if let Some(reply) = reply {
                run.attach_questions(filename, reply.questions, reply.token_count);
            }
        }

        Ok(())
    }

    fn validate(&self, job_description: &str, documents: &[Document]) -> Result<(), ScreeningError> {
        if job_description.trim().is_empty() {
            return Err(ScreeningError::EmptyJobDescription);
        }
        let count = documents.len();
        if count == 0 {
            return Err(ScreeningError::NoDocuments);
        }
        if count > self.options.max_documents {
            return Err(ScreeningError::BatchTooLarge {
                count,
                cap: self.options.max_documents,
            });
        }

        let mut names = HashSet::with_capacity(count);
        if let Some(duplicate) = documents
            .iter()
            .find(|document| !names.insert(document.filename.as_str()))
        {
            return Err(ScreeningError::DuplicateFilename(duplicate.filename.clone()));
        }
        Ok(())
    }

    async fn screen_document(&self, job_description: &str, document: &Document) -> CandidateResult {
        let text = self.extractor.extract(document);
        if text.trim().is_empty() {
            warn!(filename = %document.filename, "no text extracted, skipping scoring");
            return CandidateResult::unreadable(document.filename.clone());
        }

        let section = self.slicer.slice(&text);
        let outcome = self.assess(job_description, &section).await;
        let mut tokens_spent = outcome.token_count();

        let mut questions = match &outcome {
            AssessmentOutcome::Scored(assessment) => assessment.questions.clone(),
            _ => None,
        };

        if self.options.question_mode == QuestionMode::Screening && outcome.is_scored() {
            if let Some(reply) = self
                .fetch_screening_questions(job_description, &section, &document.filename)
                .await
            {
                tokens_spent = tokens_spent.saturating_add(reply.token_count);
                questions = Some(reply.questions);
            }
        }

        CandidateResult {
            filename: document.filename.clone(),
            outcome,
            section: Some(section),
            questions,
            tokens_spent,
        }
    }

    async fn assess(&self, job_description: &str, section: &str) -> AssessmentOutcome {
        let call = async {
            match self.options.question_mode {
                QuestionMode::Suggested => {
                    self.client.score_with_questions(job_description, section).await
                }
                QuestionMode::None | QuestionMode::Screening => {
                    self.client.score(job_description, section).await
                }
            }
        };

        match self.bounded(call).await {
            Ok(outcome) => outcome,
            Err(message) => {
                warn!(%message, "scoring call failed");
                AssessmentOutcome::ServiceFailure { message }
            }
        }
    }

    async fn fetch_screening_questions(
        &self,
        job_description: &str,
        section: &str,
        filename: &str,
    ) -> Option<QuestionReply> {
        let call = self.client.screening_questions(job_description, section);
        match self.bounded(call).await {
            Ok(reply) => Some(reply),
            Err(message) => {
                warn!(%filename, %message, "question generation failed");
                None
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GenerationError>>,
    ) -> Result<T, String> {
        match tokio::time::timeout(self.options.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err(format!(
                "timed out after {}s",
                self.options.call_timeout.as_secs_f32()
            )),
        }
    }
}
