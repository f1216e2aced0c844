pub mod error;
pub mod export;
pub mod extractor;
pub mod generator;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod relevance;
pub mod slicer;
pub mod traits;

pub use error::{ExtractError, GenerationError, IngestError, ScreeningError};
pub use export::{to_csv_string, write_csv};
pub use extractor::{extract_document, zip_entries, DocumentExtractor, TextExtractor};
pub use generator::{ChatCompletionsGenerator, GeneratorConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use ingest::{
    discover_resume_files, disambiguate_filenames, load_document, load_documents, load_folder,
};
pub use models::{
    cost_caption, estimate_cost, AssessmentOutcome, BatchRun, CandidateResult, Document,
    DocumentFormat, Questions, RelevanceAssessment, DEFAULT_PRICE_PER_1K_TOKENS,
};
pub use orchestrator::{QuestionMode, ScreeningCoordinator, ScreeningOptions, DEFAULT_MAX_DOCUMENTS};
pub use relevance::{ClientOptions, QuestionReply, RelevanceClient, ScorePolicy};
pub use slicer::{HeadingMatch, SectionSlicer, SlicerConfig, DEFAULT_MAX_SECTION_LINES};
pub use traits::{Generation, TextGenerator};
