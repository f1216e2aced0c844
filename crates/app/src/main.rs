use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use resume_screen_core::{
    cost_caption, disambiguate_filenames, load_document, load_documents, load_folder, write_csv,
    BatchRun, ChatCompletionsGenerator, ClientOptions, Document, DocumentExtractor,
    GeneratorConfig, HeadingMatch, QuestionMode, Questions, RelevanceClient, ScorePolicy,
    ScreeningCoordinator, ScreeningOptions, SectionSlicer, SlicerConfig, TextExtractor,
    TextGenerator, DEFAULT_API_BASE, DEFAULT_MODEL,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "resume-screen", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Lines kept from the end of an experience section.
    #[arg(long, default_value = "1000", global = true)]
    max_section_lines: usize,

    /// How section headings are recognised.
    #[arg(long, value_enum, default_value_t = HeadingMode::WholeLine, global = true)]
    heading_match: HeadingMode,
}

#[derive(Subcommand)]
enum Command {
    /// Score resumes against a job description and print the ranking.
    Screen(ScreenArgs),
    /// Print the experience section the scorer would see for one file.
    Slice {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the raw text extracted from one file.
    Extract {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(clap::Args)]
struct ScreenArgs {
    /// Job description file (txt, pdf or docx).
    #[arg(long, conflicts_with = "jd_text", required_unless_present = "jd_text")]
    jd: Option<PathBuf>,

    /// Job description given inline.
    #[arg(long)]
    jd_text: Option<String>,

    /// Resume file (pdf, docx, txt or zip). Repeatable.
    #[arg(long = "resume")]
    resumes: Vec<PathBuf>,

    /// Folder searched recursively for resumes.
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Write the ranked results as CSV.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Interview questions to generate alongside the score.
    #[arg(long, value_enum, default_value_t = QuestionArg::None)]
    questions: QuestionArg,

    /// Generate truth/fit check questions for these filenames after scoring.
    #[arg(long, value_delimiter = ',')]
    shortlist: Vec<String>,

    /// Re-score one candidate with an edited section, as FILENAME=SECTION_FILE.
    #[arg(long)]
    rescore: Vec<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "RESUME_SCREEN_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    #[arg(long, env = "RESUME_SCREEN_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Per-call timeout in seconds.
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    #[arg(long, default_value = "20")]
    max_documents: usize,

    /// Price per thousand tokens used for the cost estimate.
    #[arg(long, default_value = "0.0015")]
    price_per_1k: f64,

    #[arg(long, value_enum, default_value_t = PolicyArg::Clamp)]
    score_policy: PolicyArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum HeadingMode {
    WholeLine,
    Substring,
}

#[derive(Clone, Copy, ValueEnum)]
enum QuestionArg {
    None,
    Suggested,
    Screening,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Clamp,
    Flag,
    Accept,
}

impl From<HeadingMode> for HeadingMatch {
    fn from(value: HeadingMode) -> Self {
        match value {
            HeadingMode::WholeLine => HeadingMatch::WholeLine,
            HeadingMode::Substring => HeadingMatch::Substring,
        }
    }
}

impl From<QuestionArg> for QuestionMode {
    fn from(value: QuestionArg) -> Self {
        match value {
            QuestionArg::None => QuestionMode::None,
            QuestionArg::Suggested => QuestionMode::Suggested,
            QuestionArg::Screening => QuestionMode::Screening,
        }
    }
}

impl From<PolicyArg> for ScorePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Clamp => ScorePolicy::Clamp,
            PolicyArg::Flag => ScorePolicy::Flag,
            PolicyArg::Accept => ScorePolicy::Accept,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "resume-screen boot"
    );

    let slicer_config = SlicerConfig {
        match_mode: cli.heading_match.into(),
        max_lines: Some(cli.max_section_lines),
    };

    match cli.command {
        Command::Screen(args) => screen(args, slicer_config).await?,
        Command::Slice { file } => {
            let text = extract_file(&file)?;
            let slicer = SectionSlicer::new(slicer_config)?;
            println!("{}", slicer.slice(&text));
        }
        Command::Extract { file } => {
            println!("{}", extract_file(&file)?);
        }
    }

    Ok(())
}

async fn screen(args: ScreenArgs, slicer: SlicerConfig) -> anyhow::Result<()> {
    let job_description = match (&args.jd, &args.jd_text) {
        (_, Some(text)) => text.clone(),
        (Some(path), None) => extract_file(path)?,
        (None, None) => bail!("either --jd or --jd-text is required"),
    };

    let edits = read_rescore_edits(&args.rescore)?;
    let documents = collect_documents(&args)?;
    info!(documents = documents.len(), "resumes loaded");

    let generator = ChatCompletionsGenerator::new(GeneratorConfig {
        api_base: args.api_base.clone(),
        api_key: args.api_key.clone(),
        model: args.model.clone(),
        request_timeout: Duration::from_secs(args.timeout_secs),
    })?;
    if args.api_key.is_none() {
        warn!("no API key configured, requests are sent unauthenticated");
    }

    let client = RelevanceClient::new(
        generator,
        ClientOptions {
            score_policy: args.score_policy.into(),
            ..ClientOptions::default()
        },
    );
    let coordinator = ScreeningCoordinator::new(
        DocumentExtractor,
        client,
        ScreeningOptions {
            max_documents: args.max_documents,
            question_mode: args.questions.into(),
            call_timeout: Duration::from_secs(args.timeout_secs),
            slicer,
        },
    )?;

    let mut run = coordinator.run(&job_description, documents).await?;
    apply_follow_ups(
        &coordinator,
        &mut run,
        &job_description,
        &edits,
        &args.shortlist,
    )
    .await;

    print_report(&run, args.price_per_1k);

    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_csv(&run, file)?;
        println!("results written to {}", path.display());
    }

    Ok(())
}

/// An edited experience section to re-score after the batch.
#[derive(Debug, PartialEq)]
struct RescoreEdit {
    filename: String,
    section: String,
}

/// Parses `FILENAME=SECTION_FILE` pairs and reads the section files up front,
/// so a bad argument fails before any scoring call is paid for.
fn read_rescore_edits(entries: &[String]) -> anyhow::Result<Vec<RescoreEdit>> {
    entries
        .iter()
        .map(|entry| {
            let (filename, section_path) = entry
                .split_once('=')
                .filter(|(filename, path)| !filename.is_empty() && !path.is_empty())
                .with_context(|| format!("--rescore expects FILENAME=SECTION_FILE, got {entry}"))?;
            let section = std::fs::read_to_string(section_path)
                .with_context(|| format!("reading edited section {section_path}"))?;
            Ok(RescoreEdit {
                filename: filename.to_string(),
                section,
            })
        })
        .collect()
}

/// Runs the requested rescores and shortlist questions. A failing follow-up
/// is logged and skipped; the scored batch is always kept.
async fn apply_follow_ups<E, G>(
    coordinator: &ScreeningCoordinator<E, G>,
    run: &mut BatchRun,
    job_description: &str,
    edits: &[RescoreEdit],
    shortlist: &[String],
) where
    E: TextExtractor,
    G: TextGenerator,
{
    for edit in edits {
        if let Err(error) = coordinator
            .rescore(run, job_description, &edit.filename, &edit.section)
            .await
        {
            warn!(filename = %edit.filename, %error, "rescore skipped");
        }
    }

    if !shortlist.is_empty() {
        if let Err(error) = coordinator
            .shortlist_questions(run, job_description, shortlist)
            .await
        {
            warn!(%error, "shortlist questions skipped");
        }
    }
}

fn collect_documents(args: &ScreenArgs) -> anyhow::Result<Vec<Document>> {
    let mut documents = load_documents(&args.resumes)?;
    if let Some(folder) = &args.folder {
        documents.extend(load_folder(folder)?);
    }
    disambiguate_filenames(&mut documents);
    Ok(documents)
}

fn extract_file(path: &Path) -> anyhow::Result<String> {
    let document = load_document(path)?;
    let text = DocumentExtractor.extract(&document);
    if text.trim().is_empty() {
        bail!("no readable text in {}", path.display());
    }
    Ok(text)
}

fn print_report(run: &BatchRun, price_per_1k: f64) {
    println!("run: {} ({} candidates)", run.id, run.len());

    for (rank, result) in run.ranked().into_iter().enumerate() {
        println!(
            "{:>2}. {:<40} score={:<5} {}",
            rank + 1,
            result.filename,
            result.score(),
            result.reason()
        );

        match &result.questions {
            Some(Questions::Suggested(text)) => println!("    questions:\n{text}"),
            Some(Questions::Screening {
                truth_check,
                fit_check,
            }) => {
                println!("    truth check:\n{truth_check}");
                println!("    fit check:\n{fit_check}");
            }
            None => {}
        }
    }

    println!("{}", cost_caption(run.total_tokens(), price_per_1k));
}
