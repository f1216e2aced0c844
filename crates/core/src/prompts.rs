//! Prompt templates sent to the text generator. Inputs are embedded verbatim.

pub const SCORE_SYSTEM_HINT: &str =
    "Compare the following resume experience against the job description and rate the relevance from 1 to 10.";

pub fn score_prompt(job_description: &str, section: &str) -> String {
    format!(
        "{SCORE_SYSTEM_HINT} Return only:\n\n\
         Score: X\n\
         Reason: ...\n\n\
         Job Description:\n{job_description}\n\n\
         Resume:\n{section}\n"
    )
}

pub fn score_with_questions_prompt(job_description: &str, section: &str) -> String {
    format!(
        "{SCORE_SYSTEM_HINT} Then suggest 3-5 interview questions that probe the \
         candidate's claimed experience against the role. Return only:\n\n\
         Score: X\n\
         Reason: ...\n\
         Questions:\n\
         1. ...\n\n\
         Job Description:\n{job_description}\n\n\
         Resume:\n{section}\n"
    )
}

pub fn questions_prompt(job_description: &str, section: &str) -> String {
    format!(
        "Suggest 3-5 interview questions for this candidate based on the job description \
         and their resume experience. Return a numbered list only.\n\n\
         Job Description:\n{job_description}\n\n\
         Resume:\n{section}\n"
    )
}

pub fn screening_questions_prompt(job_description: &str, section: &str) -> String {
    format!(
        "Generate two sets of interview questions based on the job description and resume experience.\n\n\
         Set 1: Truth Check Questions\n\
         - 3-5 questions that help verify if the candidate truly did what they claimed\n\
         - Include short cues: \"What to listen for\"\n\n\
         Set 2: Fit Check Questions\n\
         - 3-5 questions to assess whether the candidate can perform well in the role\n\
         - Include short cues: \"What to listen for\"\n\n\
         Format:\n\
         Truth Check Questions:\n\
         1. <question>\n   What to listen for: <cue>\n\n\
         Fit Check Questions:\n\
         1. <question>\n   What to listen for: <cue>\n\n\
         Job Description:\n{job_description}\n\n\
         Resume:\n{section}\n"
    )
}
