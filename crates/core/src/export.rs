use crate::models::{BatchRun, CandidateResult, Questions};

const BASE_COLUMNS: [&str; 3] = ["Filename", "Score", "Reason"];
const SUGGESTED_COLUMN: &str = "Suggested Interview Questions";
const SCREENING_COLUMNS: [&str; 2] = ["Truth Check Questions", "Fit Check Questions"];

/// Writes the ranked results as CSV. Question columns appear only when at
/// least one candidate has questions of that kind.
pub fn write_csv<W: std::io::Write>(run: &BatchRun, writer: W) -> Result<(), csv::Error> {
    let ranked = run.ranked();
    let with_suggested = ranked
        .iter()
        .any(|result| matches!(result.questions, Some(Questions::Suggested(_))));
    let with_screening = ranked
        .iter()
        .any(|result| matches!(result.questions, Some(Questions::Screening { .. })));

    let mut header = BASE_COLUMNS.to_vec();
    if with_suggested {
        header.push(SUGGESTED_COLUMN);
    }
    if with_screening {
        header.extend(SCREENING_COLUMNS);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&header)?;

    for result in ranked {
        let mut record = vec![
            result.filename.clone(),
            format_score(result),
            result.reason(),
        ];

        if with_suggested {
            record.push(match &result.questions {
                Some(Questions::Suggested(text)) => text.clone(),
                _ => String::new(),
            });
        }
        if with_screening {
            let (truth, fit) = match &result.questions {
                Some(Questions::Screening {
                    truth_check,
                    fit_check,
                }) => (truth_check.clone(), fit_check.clone()),
                _ => (String::new(), String::new()),
            };
            record.push(truth);
            record.push(fit);
        }

        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(run: &BatchRun) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(run, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn format_score(result: &CandidateResult) -> String {
    let score = result.score();
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        score.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssessmentOutcome, RelevanceAssessment};

    fn scored(filename: &str, score: f64, reason: &str, questions: Option<Questions>) -> CandidateResult {
        CandidateResult {
            filename: filename.to_string(),
            outcome: AssessmentOutcome::Scored(RelevanceAssessment {
                score,
                reason: reason.to_string(),
                raw_response: String::new(),
                questions: None,
                token_count: 10,
                out_of_range: false,
            }),
            section: None,
            questions,
            tokens_spent: 10,
        }
    }

    #[test]
    fn csv_has_header_and_ranked_rows() {
        let mut run = BatchRun::new();
        run.push(scored("low.pdf", 4.0, "Some overlap", None));
        run.push(CandidateResult::unreadable("scan.pdf"));
        run.push(scored("high.pdf", 8.5, "Strong, direct match", None));

        let csv = to_csv_string(&run).expect("csv renders");

        assert_eq!(
            csv,
            "Filename,Score,Reason\n\
             high.pdf,8.5,\"Strong, direct match\"\n\
             low.pdf,4,Some overlap\n\
             scan.pdf,0,File not readable\n"
        );
    }

    #[test]
    fn question_columns_follow_question_kinds() {
        let mut run = BatchRun::new();
        run.push(scored(
            "a.pdf",
            7.0,
            "ok",
            Some(Questions::Screening {
                truth_check: "1. How?".to_string(),
                fit_check: "1. Why?".to_string(),
            }),
        ));
        run.push(scored("b.pdf", 6.0, "ok", None));

        let csv = to_csv_string(&run).expect("csv renders");
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("Filename,Score,Reason,Truth Check Questions,Fit Check Questions")
        );
        assert_eq!(lines.next(), Some("a.pdf,7,ok,1. How?,1. Why?"));
        assert_eq!(lines.next(), Some("b.pdf,6,ok,,"));
    }

    #[test]
    fn multiline_questions_are_quoted() {
        let mut run = BatchRun::new();
        run.push(scored(
            "a.pdf",
            5.0,
            "ok",
            Some(Questions::Suggested("1. One\n2. Two".to_string())),
        ));

        let csv = to_csv_string(&run).expect("csv renders");
        assert_eq!(
            csv,
            "Filename,Score,Reason,Suggested Interview Questions\na.pdf,5,ok,\"1. One\n2. Two\"\n"
        );
    }
}
