use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    Pdf(String),

    #[error("docx parse error: {0}")]
    Docx(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("generation returned empty content")]
    EmptyContent,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("job description is empty")]
    EmptyJobDescription,

    #[error("no documents to screen")]
    NoDocuments,

    #[error("batch of {count} documents exceeds the limit of {cap}")]
    BatchTooLarge { count: usize, cap: usize },

    #[error("more than one document is named {0}")]
    DuplicateFilename(String),

    #[error("no candidate named {0} in this run")]
    UnknownCandidate(String),

    #[error("shortlist is empty")]
    EmptyShortlist,
}

pub type Result<T, E = ScreeningError> = std::result::Result<T, E>;
