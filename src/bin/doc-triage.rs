//! CLI binary for doc-triage.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TriageConfig` / `OcrConfig` and prints results as JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc_triage::{
    evaluate, write_report, Document, DocumentClassifier, DocumentType, InvoiceExtractor,
    OcrConfig, Pipeline, ProgressCallback, Stage, TextExtractor, TriageConfig,
    TriageProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage, plus one
/// log line per finished stage.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Triage");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TriageProgressCallback for CliProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_invoice_skipped(&self, document_type: DocumentType) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            dim("–"),
            "invoice extraction",
            dim(&format!("skipped ({document_type})")),
        ));
    }

    fn on_pipeline_complete(&self, document_type: DocumentType, total_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(document_type.as_str()),
            dim(&format!("{total_ms}ms total")),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full pipeline on a scanned PDF (OCR → classify → invoice fields)
  doc-triage run "Invoice INV-0911.pdf"

  # Same, on text that was already extracted, writing the report to a file
  doc-triage run --text test_cases/sample_invoice.txt -o report.json

  # OCR only
  doc-triage extract-text scan.pdf

  # Classify or extract a single document
  doc-triage classify --text test_cases/sample_invoice.txt
  doc-triage extract-invoice scan.pdf

  # Score the classifier against hand-labelled expectations
  doc-triage eval --text test_cases/sample_invoice.txt \
      --expected test_cases/sample_invoice.expected.json

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY          API key for the default provider
  DOC_TRIAGE_PROVIDER        Override provider (anthropic, openai, gemini, …)
  DOC_TRIAGE_MODEL           Override model ID
  AZURE_DOC_INTEL_ENDPOINT   Document Intelligence endpoint (OCR)
  AZURE_DOC_INTEL_KEY        Document Intelligence access key (OCR)
"#;

/// Classify business documents and extract invoice fields with OCR + LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "doc-triage",
    version,
    about = "Classify business documents and extract invoice fields with OCR + LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    ocr: OcrArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC_TRIAGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "DOC_TRIAGE_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "DOC_TRIAGE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID.
    #[arg(long, global = true, env = "DOC_TRIAGE_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(long, global = true, env = "DOC_TRIAGE_PROVIDER")]
    provider: Option<String>,

    /// Prompt version tag recorded in result metadata.
    #[arg(long, global = true, env = "DOC_TRIAGE_PROMPT_VERSION")]
    prompt_version: Option<String>,

    /// Per-model-call timeout in seconds.
    #[arg(long, global = true, env = "DOC_TRIAGE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// Document Intelligence endpoint URL.
    #[arg(long, global = true, env = "AZURE_DOC_INTEL_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Document Intelligence access key.
    #[arg(long, global = true, env = "AZURE_DOC_INTEL_KEY", hide_env_values = true)]
    ocr_key: Option<String>,

    /// Upper bound on OCR submit + analysis, in seconds.
    #[arg(long, global = true, env = "DOC_TRIAGE_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run OCR only and print the recognised text.
    ExtractText {
        /// Document to analyse (PDF or image).
        path: PathBuf,
    },

    /// Classify a document and print the ClassificationResult as JSON.
    Classify {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Extract invoice fields and print the InvoiceRecord as JSON.
    ExtractInvoice {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Full pipeline: OCR, classify, and extract invoice fields for invoices.
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Write the JSON report to this file instead of stdout.
        #[arg(short, long, env = "DOC_TRIAGE_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Classify a document and score the result against expected values.
    Eval {
        #[command(flatten)]
        input: InputArgs,

        /// JSON object of expected field values.
        #[arg(long)]
        expected: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Document to process.
    input: PathBuf,

    /// Treat INPUT as already-extracted UTF-8 text (skip OCR).
    #[arg(long)]
    text: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO logs
    // out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = if show_progress {
        Some(CliProgress::new())
    } else {
        None
    };

    let result = dispatch(&cli, progress.clone()).await;
    if let Some(ref p) = progress {
        p.finish();
    }
    result
}

async fn dispatch(cli: &Cli, progress: Option<Arc<CliProgress>>) -> Result<()> {
    let callback: Option<ProgressCallback> = progress
        .clone()
        .map(|p| p as Arc<dyn TriageProgressCallback>);

    match &cli.command {
        Command::ExtractText { path } => {
            let extractor = TextExtractor::from_config(&build_ocr_config(&cli.ocr)?)
                .context("Failed to configure OCR")?;
            stage_start(&callback, Stage::ExtractText);
            let start = std::time::Instant::now();
            let text = extractor
                .extract_text(path)
                .await
                .context("Text extraction failed")?;
            stage_complete(&callback, Stage::ExtractText, start);
            if let Some(ref p) = progress {
                p.finish();
            }
            println!("{text}");
            if !cli.quiet {
                eprintln!("{}", dim(&format!("[Total: {} characters]", text.chars().count())));
            }
        }

        Command::Classify { input } => {
            let config = build_config(cli, None)?;
            let classifier =
                DocumentClassifier::new(&config).context("Failed to configure classifier")?;
            let doc = load_document(input, &cli.ocr, &callback).await?;
            stage_start(&callback, Stage::Classify);
            let start = std::time::Instant::now();
            let result = classifier
                .classify(&doc.text)
                .await
                .context("Classification failed")?;
            stage_complete(&callback, Stage::Classify, start);
            if let Some(ref p) = progress {
                p.finish();
            }
            print_json(&result)?;
        }

        Command::ExtractInvoice { input } => {
            let config = build_config(cli, None)?;
            let extractor =
                InvoiceExtractor::new(&config).context("Failed to configure invoice extractor")?;
            let doc = load_document(input, &cli.ocr, &callback).await?;
            stage_start(&callback, Stage::ExtractInvoice);
            let start = std::time::Instant::now();
            let record = extractor
                .extract(&doc.text)
                .await
                .context("Invoice extraction failed")?;
            stage_complete(&callback, Stage::ExtractInvoice, start);
            if let Some(ref p) = progress {
                p.finish();
            }
            print_json(&record)?;
        }

        Command::Run { input, output } => {
            let config = build_config(cli, callback.clone())?;
            let report = if input.text {
                let pipeline =
                    Pipeline::from_config(&config, None).context("Failed to configure pipeline")?;
                let doc = Document::from_text_file(&input.input)
                    .await
                    .context("Failed to read text input")?;
                pipeline.run_document(&doc).await.context("Triage failed")?
            } else {
                let ocr = build_ocr_config(&cli.ocr)?;
                let pipeline = Pipeline::from_config(&config, Some(&ocr))
                    .context("Failed to configure pipeline")?;
                pipeline.run(&input.input).await.context("Triage failed")?
            };

            match output {
                Some(path) => {
                    write_report(&report, path)
                        .await
                        .context("Failed to write report")?;
                    if !cli.quiet {
                        eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
                None => print_json(&report)?,
            }
        }

        Command::Eval { input, expected } => {
            let expected_values = read_expected(expected).await?;
            let config = build_config(cli, None)?;
            let classifier =
                DocumentClassifier::new(&config).context("Failed to configure classifier")?;
            let doc = load_document(input, &cli.ocr, &callback).await?;
            stage_start(&callback, Stage::Classify);
            let start = std::time::Instant::now();
            let result = classifier
                .classify(&doc.text)
                .await
                .context("Classification failed")?;
            stage_complete(&callback, Stage::Classify, start);
            if let Some(ref p) = progress {
                p.finish();
            }

            let report = evaluate(&expected_values, &result).context("Failed to score result")?;
            if !cli.quiet {
                for score in &report.fields {
                    eprintln!(
                        "  [{}] {:<16} expected {}  got {}",
                        if score.matched { green("✓") } else { red("✗") },
                        score.field,
                        score.expected,
                        score.actual,
                    );
                }
                eprintln!(
                    "Accuracy: {:.0}% ({}/{} fields)",
                    report.accuracy * 100.0,
                    report.matched(),
                    report.fields.len()
                );
            }
            print_json(&report)?;
            if !report.passed {
                anyhow::bail!(
                    "Evaluation failed: accuracy {:.0}% is below the pass threshold",
                    report.accuracy * 100.0
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `TriageConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TriageConfig> {
    let mut builder = TriageConfig::builder().api_timeout_secs(cli.model.api_timeout);

    if let Some(ref model) = cli.model.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.model.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref version) = cli.model.prompt_version {
        builder = builder.prompt_version(version);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `OcrConfig`; both secrets are required.
fn build_ocr_config(args: &OcrArgs) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder().timeout_secs(args.ocr_timeout);
    if let Some(ref endpoint) = args.ocr_endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = args.ocr_key {
        builder = builder.api_key(key);
    }
    builder.build().context("OCR is not configured")
}

/// Load INPUT as text directly (`--text`) or through OCR.
async fn load_document(
    input: &InputArgs,
    ocr: &OcrArgs,
    progress: &Option<ProgressCallback>,
) -> Result<Document> {
    if input.text {
        return Document::from_text_file(&input.input)
            .await
            .context("Failed to read text input");
    }

    let extractor =
        TextExtractor::from_config(&build_ocr_config(ocr)?).context("Failed to configure OCR")?;
    stage_start(progress, Stage::ExtractText);
    let start = std::time::Instant::now();
    let doc = extractor
        .extract_document(&input.input)
        .await
        .context("Text extraction failed")?;
    stage_complete(progress, Stage::ExtractText, start);
    Ok(doc)
}

async fn read_expected(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read expected values from {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Expected values file is not valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("Expected values file must contain a JSON object"),
    }
}

fn stage_start(progress: &Option<ProgressCallback>, stage: Stage) {
    if let Some(cb) = progress {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(progress: &Option<ProgressCallback>, stage: Stage, start: std::time::Instant) {
    if let Some(cb) = progress {
        cb.on_stage_complete(stage, start.elapsed().as_millis() as u64);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
