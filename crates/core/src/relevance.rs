use crate::models::{AssessmentOutcome, Questions, RelevanceAssessment, QUESTIONS_PARSE_FAILURE};
use crate::prompts;
use crate::traits::TextGenerator;
use crate::GenerationError;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

pub const DEFAULT_SCORE_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_QUESTION_TEMPERATURE: f32 = 0.5;

const SCORE_LABEL: &str = "Score:";
const REASON_LABEL: &str = "Reason:";
const QUESTIONS_LABEL: &str = "Questions:";
const FIT_CHECK_HEADING: &str = "Fit Check Questions:";

/// What to do with a score the model placed outside the expected range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    #[default]
    Clamp,
    Flag,
    Accept,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub score_temperature: f32,
    pub question_temperature: f32,
    pub score_policy: ScorePolicy,
    pub score_range: RangeInclusive<f64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            score_temperature: DEFAULT_SCORE_TEMPERATURE,
            question_temperature: DEFAULT_QUESTION_TEMPERATURE,
            score_policy: ScorePolicy::Clamp,
            score_range: 1.0..=10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReply {
    pub questions: Questions,
    pub raw_response: String,
    pub token_count: u64,
}

pub struct RelevanceClient<G> {
    generator: G,
    options: ClientOptions,
}

impl<G> RelevanceClient<G>
where
    G: TextGenerator,
{
    pub fn new(generator: G, options: ClientOptions) -> Self {
        Self { generator, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Scores a section. Unparseable output is an `Ok(ParseFailure)`; only
    /// a failed call is an error.
    pub async fn score(
        &self,
        job_description: &str,
        section: &str,
    ) -> Result<AssessmentOutcome, GenerationError> {
        let prompt = prompts::score_prompt(job_description, section);
        let generation = self
            .generator
            .generate(&prompt, self.options.score_temperature)
            .await?;

        Ok(self.assess(generation.text, generation.token_usage, None))
    }

    /// Scores a section and asks for suggested questions in the same call.
    pub async fn score_with_questions(
        &self,
        job_description: &str,
        section: &str,
    ) -> Result<AssessmentOutcome, GenerationError> {
        let prompt = prompts::score_with_questions_prompt(job_description, section);
        let generation = self
            .generator
            .generate(&prompt, self.options.score_temperature)
            .await?;

        let questions = parse_questions_block(&generation.text).map(Questions::Suggested);
        Ok(self.assess(generation.text, generation.token_usage, questions))
    }

    /// Standalone suggested questions for a section that was already scored.
    /// The screening loop gets its suggested questions from the combined
    /// score call instead, so this is for callers asking after the fact.
    pub async fn questions(
        &self,
        job_description: &str,
        section: &str,
    ) -> Result<QuestionReply, GenerationError> {
        let prompt = prompts::questions_prompt(job_description, section);
        let generation = self
            .generator
            .generate(&prompt, self.options.question_temperature)
            .await?;

        Ok(QuestionReply {
            questions: Questions::Suggested(generation.text.trim().to_string()),
            raw_response: generation.text,
            token_count: generation.token_usage,
        })
    }

    pub async fn screening_questions(
        &self,
        job_description: &str,
        section: &str,
    ) -> Result<QuestionReply, GenerationError> {
        let prompt = prompts::screening_questions_prompt(job_description, section);
        let generation = self
            .generator
            .generate(&prompt, self.options.question_temperature)
            .await?;

        Ok(QuestionReply {
            questions: split_screening_questions(&generation.text),
            raw_response: generation.text,
            token_count: generation.token_usage,
        })
    }

    fn assess(
        &self,
        raw_response: String,
        token_count: u64,
        questions: Option<Questions>,
    ) -> AssessmentOutcome {
        let Some((score, reason)) = parse_score_reply(&raw_response) else {
            warn!(tokens = token_count, "could not parse score reply");
            return AssessmentOutcome::ParseFailure {
                raw_response,
                token_count,
            };
        };

        let (score, out_of_range) = self.apply_policy(score);
        debug!(score, out_of_range, tokens = token_count, "section scored");

        AssessmentOutcome::Scored(RelevanceAssessment {
            score,
            reason,
            raw_response,
            questions,
            token_count,
            out_of_range,
        })
    }

    fn apply_policy(&self, score: f64) -> (f64, bool) {
        let range = &self.options.score_range;
        if range.contains(&score) {
            return (score, false);
        }

        match self.options.score_policy {
            ScorePolicy::Clamp => {
                warn!(score, "score outside range, clamping");
                (score.clamp(*range.start(), *range.end()), true)
            }
            ScorePolicy::Flag => {
                warn!(score, "score outside range");
                (score, true)
            }
            ScorePolicy::Accept => (score, false),
        }
    }
}

/// Reads `Score:` and `Reason:` from the first lines that carry them.
pub fn parse_score_reply(text: &str) -> Option<(f64, String)> {
    let score_line = text.lines().find(|line| line.contains(SCORE_LABEL))?;
    let reason_line = text.lines().find(|line| line.contains(REASON_LABEL))?;

    let score = after_first_colon(score_line)?.parse::<f64>().ok()?;
    if !score.is_finite() {
        return None;
    }
    let reason = after_first_colon(reason_line)?.to_string();

    Some((score, reason))
}

fn after_first_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}

/// Everything after the first `Questions:` line, if there is any.
pub fn parse_questions_block(text: &str) -> Option<String> {
    let mut lines = text.lines();
    let heading = lines.find(|line| line.contains(QUESTIONS_LABEL))?;

    let mut block = after_first_colon(heading)
        .filter(|inline| !inline.is_empty())
        .map(|inline| vec![inline])
        .unwrap_or_default();
    block.extend(lines);

    let joined = block.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

pub fn split_screening_questions(text: &str) -> Questions {
    match text.split_once(FIT_CHECK_HEADING) {
        Some((truth, fit)) => Questions::Screening {
            truth_check: truth.trim().to_string(),
            fit_check: fit.trim().to_string(),
        },
        None => Questions::Screening {
            truth_check: QUESTIONS_PARSE_FAILURE.to_string(),
            fit_check: QUESTIONS_PARSE_FAILURE.to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::traits::Generation;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every call.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        replies: Mutex<Vec<Result<Generation, GenerationError>>>,
        pub(crate) calls: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(replies: Vec<Result<Generation, GenerationError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn reply(text: &str, token_usage: u64) -> Result<Generation, GenerationError> {
            Ok(Generation {
                text: text.to_string(),
                token_usage,
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, temperature: f32) -> Result<Generation, GenerationError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((prompt.to_string(), temperature));
            self.replies
                .lock()
                .expect("replies lock")
                .pop()
                .unwrap_or(Err(GenerationError::EmptyContent))
        }
    }

    fn client(replies: Vec<Result<Generation, GenerationError>>) -> RelevanceClient<ScriptedGenerator> {
        RelevanceClient::new(ScriptedGenerator::new(replies), ClientOptions::default())
    }

    #[test]
    fn score_and_reason_are_parsed() {
        assert_eq!(
            parse_score_reply("Score: 7\nReason: Good match"),
            Some((7.0, "Good match".to_string()))
        );
    }

    #[test]
    fn reason_keeps_text_after_first_colon() {
        assert_eq!(
            parse_score_reply("Here you go\nScore: 8.5\nReason: Strong: Rust, Go"),
            Some((8.5, "Strong: Rust, Go".to_string()))
        );
    }

    #[test]
    fn missing_reason_or_bad_number_is_unparsed() {
        assert_eq!(parse_score_reply("Score: 7"), None);
        assert_eq!(parse_score_reply("Score: seven\nReason: fine"), None);
        assert_eq!(parse_score_reply("Score: NaN\nReason: fine"), None);
    }

    #[tokio::test]
    async fn score_returns_assessment_with_usage() {
        let client = client(vec![ScriptedGenerator::reply("Score: 7\nReason: Good match", 150)]);

        let outcome = client.score("Rust engineer", "Built Rust services").await.expect("call ok");

        match outcome {
            AssessmentOutcome::Scored(assessment) => {
                assert_eq!(assessment.score, 7.0);
                assert_eq!(assessment.reason, "Good match");
                assert_eq!(assessment.token_count, 150);
                assert!(!assessment.out_of_range);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let calls = client.generator.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Rust engineer"));
        assert!(calls[0].0.contains("Built Rust services"));
        assert_eq!(calls[0].1, DEFAULT_SCORE_TEMPERATURE);
    }

    #[tokio::test]
    async fn missing_reason_line_is_a_parse_failure() {
        let client = client(vec![ScriptedGenerator::reply("Score: 7", 40)]);

        let outcome = client.score("jd", "cv").await.expect("call ok");

        assert_eq!(
            outcome,
            AssessmentOutcome::ParseFailure {
                raw_response: "Score: 7".to_string(),
                token_count: 40,
            }
        );
        assert_eq!(outcome.score(), 0.0);
        assert_eq!(outcome.reason(), "Could not parse");
    }

    #[tokio::test]
    async fn generator_errors_are_returned() {
        let client = client(vec![Err(GenerationError::Api {
            status: 429,
            message: "slow down".to_string(),
        })]);

        let result = client.score("jd", "cv").await;
        assert!(matches!(result, Err(GenerationError::Api { status: 429, .. })));
    }

    #[tokio::test]
    async fn out_of_range_scores_follow_policy() {
        let mut clamp = client(vec![ScriptedGenerator::reply("Score: 14\nReason: wow", 1)]);
        let outcome = clamp.score("jd", "cv").await.expect("call ok");
        assert_eq!(outcome.score(), 10.0);
        assert!(matches!(outcome, AssessmentOutcome::Scored(ref a) if a.out_of_range));

        clamp = RelevanceClient::new(
            ScriptedGenerator::new(vec![ScriptedGenerator::reply("Score: -2\nReason: no", 1)]),
            ClientOptions {
                score_policy: ScorePolicy::Flag,
                ..ClientOptions::default()
            },
        );
        let outcome = clamp.score("jd", "cv").await.expect("call ok");
        assert_eq!(outcome.score(), -2.0);
        assert!(matches!(outcome, AssessmentOutcome::Scored(ref a) if a.out_of_range));

        let accept = RelevanceClient::new(
            ScriptedGenerator::new(vec![ScriptedGenerator::reply("Score: 0\nReason: none", 1)]),
            ClientOptions {
                score_policy: ScorePolicy::Accept,
                ..ClientOptions::default()
            },
        );
        let outcome = accept.score("jd", "cv").await.expect("call ok");
        assert!(matches!(outcome, AssessmentOutcome::Scored(ref a) if !a.out_of_range && a.score == 0.0));
    }

    #[tokio::test]
    async fn combined_reply_carries_questions() {
        let reply = "Score: 6\nReason: Decent\nQuestions:\n1. What did you own?\n2. How did you test it?";
        let client = client(vec![ScriptedGenerator::reply(reply, 90)]);

        let outcome = client.score_with_questions("jd", "cv").await.expect("call ok");

        match outcome {
            AssessmentOutcome::Scored(assessment) => {
                assert_eq!(assessment.score, 6.0);
                assert_eq!(
                    assessment.questions,
                    Some(Questions::Suggested(
                        "1. What did you own?\n2. How did you test it?".to_string()
                    ))
                );
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn screening_questions_split_on_fit_heading() {
        let reply = "Truth Check Questions:\n1. Walk me through it\n\nFit Check Questions:\n1. How would you start?";
        let client = client(vec![ScriptedGenerator::reply(reply, 70)]);

        let answer = client.screening_questions("jd", "cv").await.expect("call ok");

        assert_eq!(answer.token_count, 70);
        assert_eq!(
            answer.questions,
            Questions::Screening {
                truth_check: "Truth Check Questions:\n1. Walk me through it".to_string(),
                fit_check: "1. How would you start?".to_string(),
            }
        );
        let calls = client.generator.calls.lock().expect("calls lock");
        assert_eq!(calls[0].1, DEFAULT_QUESTION_TEMPERATURE);
    }

    #[test]
    fn screening_questions_without_heading_use_sentinel() {
        assert_eq!(
            split_screening_questions("1. Something"),
            Questions::Screening {
                truth_check: "Could not parse questions".to_string(),
                fit_check: "Could not parse questions".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn suggested_questions_return_trimmed_text() {
        let client = client(vec![ScriptedGenerator::reply("\n1. Why Rust?\n", 30)]);

        let answer = client.questions("jd", "cv").await.expect("call ok");

        assert_eq!(answer.questions, Questions::Suggested("1. Why Rust?".to_string()));
        assert_eq!(answer.raw_response, "\n1. Why Rust?\n");
    }
}
