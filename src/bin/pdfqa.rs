//! CLI binary for edgequake-pdfqa.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs one query (or an interactive loop) and prints the
//! verified answer.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfqa::{
    Pipeline, PipelineConfig, PipelineOutput, PipelineProgressCallback, PipelineRequest,
    ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per run, reused for the summarization
/// and verification fan-outs. Events arrive out of order from concurrent
/// tasks, so the bar only counts completions.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    rejected: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            rejected: AtomicUsize::new(0),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }

    fn start_spinner(&self) {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        self.rejected.store(0, Ordering::SeqCst);
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn activate_bar(&self, prefix: &'static str, unit: &str, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
        self.with_bar(|bar| {
            bar.set_style(style);
            bar.set_length(total as u64);
            bar.set_position(0);
            bar.set_prefix(prefix);
            bar.reset_eta();
        });
    }

    /// Remove the bar after a failed run.
    fn clear(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if stage == Stage::Start {
            self.start_spinner();
        }
        self.with_bar(|bar| bar.set_message(stage.next_step().to_string()));
    }

    fn on_summarization_start(&self, pages: usize) {
        self.activate_bar("Summarizing", "pages", pages);
    }

    fn on_page_summarized(&self, document_name: &str, page: u32, _done: usize, _total: usize) {
        self.with_bar(|bar| {
            bar.set_message(format!("{document_name} p.{page}"));
            bar.inc(1);
        });
    }

    fn on_verification_start(&self, results: usize) {
        self.activate_bar("Verifying", "results", results);
    }

    fn on_result_verified(&self, _done: usize, _total: usize, accepted: bool) {
        if !accepted {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
        self.with_bar(|bar| bar.inc(1));
    }

    fn on_truncated(&self, document_name: &str, kept_pages: usize, total_pages: usize) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {}: analysing the first {} of {} pages",
                cyan("⚠"),
                bold(document_name),
                kept_pages,
                total_pages
            ))
        });
    }

    fn on_pipeline_complete(&self, verified: usize) {
        self.clear();
        let rejected = self.rejected.load(Ordering::SeqCst);
        eprintln!(
            "{} {} verified result(s){}",
            if verified > 0 { green("✔") } else { cyan("⚠") },
            bold(&verified.to_string()),
            if rejected > 0 {
                dim(&format!("  ({rejected} rejected by verification)"))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One question over two reports
  pdfqa q3.pdf q4.pdf -Q "What drove revenue growth?"

  # Interactive session (type quit, exit, q or bye to leave)
  pdfqa annual-report.pdf

  # Documents from URLs, with display names
  pdfqa https://example.com/a.pdf --name "Annual Report" -Q "Customer satisfaction?"

  # JSON output with final state and token usage
  pdfqa --json report.pdf -Q "Key risks?" > answer.json

  # Use a specific model
  pdfqa --provider anthropic --model claude-sonnet-4-20250514 report.pdf -Q "..."

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system library)
"#;

/// Ask questions about PDF documents and get verified, cited answers.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Ask questions about PDF documents and get verified, cited answers",
    long_about = "Summarizes every page of the given PDFs, searches the summaries for points \
relevant to your question, and re-checks each point against the page it cites before showing it. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true, num_args = 1..)]
    documents: Vec<String>,

    /// Question to answer. Omit to start an interactive session.
    #[arg(short = 'Q', long, env = "PDFQA_QUERY")]
    query: Option<String>,

    /// Display name per document, in the same order (default: file name).
    #[arg(long = "name")]
    names: Vec<String>,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Maximum concurrent inference calls per stage (1–64).
    #[arg(short, long, env = "PDFQA_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Pages analysed per document, from the first page.
    #[arg(long, env = "PDFQA_MAX_PAGES", default_value_t = 10)]
    max_pages: usize,

    /// Number of relevant points the search step asks for.
    #[arg(long, env = "PDFQA_TOP_N", default_value_t = 10)]
    top_n: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFQA_PASSWORD")]
    password: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDFQA_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFQA_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Output structured JSON (PipelineOutput) instead of the answer text.
    #[arg(long, env = "PDFQA_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFQA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the answer and errors.
    #[arg(short, long, env = "PDFQA_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDFQA_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

const EXIT_WORDS: &[&str] = &["quit", "exit", "q", "bye"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters; keep library
    // logs to errors while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;
    let pipeline = Pipeline::from_config(config).context("Failed to set up the pipeline")?;

    match cli.query.clone() {
        Some(query) => {
            let output = ask(&pipeline, &cli, &query)
                .await
                .inspect_err(|_| clear_progress(progress.as_deref()))
                .context("Query failed")?;
            print_output(&cli, &output)?;
        }
        None => interactive(&pipeline, &cli, progress.as_deref()).await?,
    }

    Ok(())
}

fn clear_progress(progress: Option<&CliProgressCallback>) {
    if let Some(cb) = progress {
        cb.clear();
    }
}

/// Read questions from stdin until EOF or an exit word.
async fn interactive(pipeline: &Pipeline, cli: &Cli, progress: Option<&CliProgressCallback>) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Ask about {} document(s). Type quit, exit, q or bye to leave.",
                cli.documents.len()
            ))
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", cyan("❯"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let query = line.trim();
        if EXIT_WORDS.contains(&query.to_ascii_lowercase().as_str()) {
            break;
        }
        if query.is_empty() {
            continue;
        }

        match ask(pipeline, cli, query).await {
            Ok(output) => print_output(cli, &output)?,
            Err(e) => {
                clear_progress(progress);
                println!("{}", e.user_message());
                if !cli.quiet {
                    eprintln!("  {} {}", red("✗"), dim(&e.to_string()));
                }
            }
        }
    }

    if !cli.quiet {
        eprintln!("{}", dim("Goodbye."));
    }
    Ok(())
}

async fn ask(
    pipeline: &Pipeline,
    cli: &Cli,
    query: &str,
) -> std::result::Result<PipelineOutput, edgequake_pdfqa::PdfQaError> {
    let request = if cli.names.is_empty() {
        PipelineRequest::from_paths(cli.documents.clone(), query)
    } else {
        PipelineRequest::new(cli.documents.clone(), cli.names.clone(), query)
    };
    pipeline.run(&request).await
}

fn print_output(cli: &Cli, output: &PipelineOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for message in &output.messages {
        writeln!(handle, "{message}").context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        eprintln!(
            "   {} calls  /  {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.usage.calls.to_string()),
            dim(&output.stats.usage.input_tokens.to_string()),
            dim(&output.stats.usage.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .concurrency(cli.concurrency)
        .max_pages_per_document(cli.max_pages)
        .max_search_results(cli.top_n)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
