use regex::{Regex, RegexBuilder};

pub const START_HEADINGS: [&str; 6] = [
    "experience",
    "work history",
    "projects",
    "employment",
    "roles",
    "professional experience",
];

pub const END_HEADINGS: [&str; 9] = [
    "education",
    "certifications",
    "skills",
    "summary",
    "career summary",
    "objective",
    "languages",
    "interests",
    "profile",
];

pub const DEFAULT_MAX_SECTION_LINES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingMatch {
    /// The trimmed line is the heading, optionally followed by a colon.
    #[default]
    WholeLine,
    /// The heading phrase appears anywhere in the line. Prose such as
    /// "five years of experience" will open a section in this mode.
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingRole {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct SlicerConfig {
    pub match_mode: HeadingMatch,
    pub max_lines: Option<usize>,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            match_mode: HeadingMatch::WholeLine,
            max_lines: Some(DEFAULT_MAX_SECTION_LINES),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionSlicer {
    start: Regex,
    end: Regex,
    max_lines: Option<usize>,
}

impl SectionSlicer {
    pub fn new(config: SlicerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            start: heading_regex(&START_HEADINGS, config.match_mode)?,
            end: heading_regex(&END_HEADINGS, config.match_mode)?,
            max_lines: config.max_lines,
        })
    }

    pub fn classify(&self, line: &str) -> Option<HeadingRole> {
        if self.start.is_match(line) {
            Some(HeadingRole::Start)
        } else if self.end.is_match(line) {
            Some(HeadingRole::End)
        } else {
            None
        }
    }

    /// Returns the experience block of a resume, or the whole text when no
    /// experience heading yields any content.
    pub fn slice(&self, full_text: &str) -> String {
        let mut capturing = false;
        let mut block: Vec<&str> = Vec::new();

        for line in full_text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            match self.classify(line) {
                Some(HeadingRole::Start) => {
                    capturing = true;
                    block.clear();
                }
                Some(HeadingRole::End) if capturing => break,
                _ if capturing => block.push(line),
                _ => {}
            }
        }

        if block.is_empty() {
            return full_text.to_string();
        }

        let keep_from = match self.max_lines {
            Some(max) if block.len() > max => block.len() - max,
            _ => 0,
        };
        block[keep_from..].join("\n")
    }
}

fn heading_regex(phrases: &[&str], mode: HeadingMatch) -> Result<Regex, regex::Error> {
    let alternation = phrases
        .iter()
        .map(|phrase| regex::escape(phrase).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = match mode {
        HeadingMatch::WholeLine => format!(r"^\s*(?:{alternation})\s*:?\s*$"),
        HeadingMatch::Substring => format!("(?:{alternation})"),
    };

    RegexBuilder::new(&pattern).case_insensitive(true).build()
}
