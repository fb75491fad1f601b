//! CLI binary for lingualeap.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `IntegrationConfig`, drives a run and writes the artifact.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lingualeap::{
    populate_files, write_artifact, ArtifactFormat, Integrator, IntegrationConfig, PipelineStage,
    ProgressCallback, ProgressObserver, RunFailure,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
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

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Renders run stages as a 0–100 bar.
struct CliProgressObserver {
    bar: ProgressBar,
}

impl CliProgressObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("LinguaLeap");
        bar.set_message(PipelineStage::Idle.label());
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ProgressObserver for CliProgressObserver {
    fn on_stage(&self, stage: PipelineStage, percent: u8) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(stage.label());
        if stage == PipelineStage::Completed {
            self.bar.finish_and_clear();
            eprintln!("{} {}", green("✔"), bold(stage.label()));
        }
    }

    fn on_failed(&self, stage: PipelineStage, failure: &RunFailure) {
        // A retry may follow; the bar stays live.
        self.bar.println(format!(
            "  {} {:?} failed [{}]  {}",
            red("✗"),
            stage,
            failure.kind,
            dim(&failure.message),
        ));
        self.bar.set_position(0);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Populate a Spanish template from an English ID card
  lingualeap populate id-card.pdf plantilla.docx --language Spanish

  # Plain-text output to a chosen path
  lingualeap populate id-card.pdf form.txt -l French --format text -o out/form_fr.txt

  # Documents from URLs, retry transient model outages twice
  lingualeap populate https://x.org/id.pdf https://x.org/form.docx -l German --max-retries 2

  # Run the HTTP API for a browser front end
  lingualeap serve --addr 0.0.0.0:8080

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY           Google Gemini API key (default provider)
  OPENAI_API_KEY           OpenAI API key
  ANTHROPIC_API_KEY        Anthropic API key
  LINGUALEAP_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  LINGUALEAP_MODEL         Override model ID
  PDFIUM_LIB_PATH          Path to libpdfium (or its directory)
  RUST_LOG                 Log filter, e.g. lingualeap=debug
"#;

/// Populate document templates with data from a PDF using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "lingualeap",
    version,
    about = "Populate a target-language template with data extracted from a PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LINGUALEAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LINGUALEAP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one integration and write the artifact.
    Populate(PopulateArgs),
    /// Serve the HTTP API (`POST /api/process`, `GET /health`).
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct PopulateArgs {
    /// Source PDF: local path or HTTP/HTTPS URL.
    pdf: String,

    /// Template (.docx or .txt): local path or HTTP/HTTPS URL.
    template: String,

    /// Language the template is written in, e.g. "Spanish".
    #[arg(short, long, env = "LINGUALEAP_LANGUAGE")]
    language: String,

    /// Write the artifact here instead of the suggested file name.
    #[arg(short, long, env = "LINGUALEAP_OUTPUT")]
    output: Option<PathBuf>,

    /// Artifact format.
    #[arg(long, env = "LINGUALEAP_FORMAT", value_enum, default_value = "docx")]
    format: FormatArg,

    /// Print the run output (content and stats) as JSON on stdout.
    #[arg(long, env = "LINGUALEAP_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "LINGUALEAP_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "LINGUALEAP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "LINGUALEAP_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    #[command(flatten)]
    model: ModelArgs,
}

/// Flags shared by every subcommand that talks to the model.
#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "LINGUALEAP_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "LINGUALEAP_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LINGUALEAP_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "LINGUALEAP_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "LINGUALEAP_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Deadline for the model call in seconds (none by default).
    #[arg(long, env = "LINGUALEAP_ORACLE_TIMEOUT")]
    oracle_timeout: Option<u64>,

    /// Whole-pipeline re-runs when the model is unavailable.
    #[arg(long, env = "LINGUALEAP_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Text,
}

impl From<FormatArg> for ArtifactFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => ArtifactFormat::Docx,
            FormatArg::Text => ArtifactFormat::PlainText,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for interactive populate runs.
    let show_progress = match &cli.command {
        Command::Populate(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Serve(_) => false,
    };
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

    match cli.command {
        Command::Populate(args) => populate(args, show_progress, cli.quiet).await,
        Command::Serve(args) => serve(args).await,
    }
}

async fn populate(args: PopulateArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressObserver::new() as Arc<dyn ProgressObserver>)
    } else {
        None
    };

    let mut builder = model_config(&args.model)
        .await?
        .artifact_format(args.format.into())
        .download_timeout_secs(args.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = populate_files(&args.pdf, &args.template, &args.language, &config)
        .await
        .context("Failed to process documents")?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(&output.artifact.file_name));
    write_artifact(&output.artifact, &path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !quiet {
        eprintln!(
            "{}  {}  {}ms  →  {}",
            green("✔"),
            output.artifact.media_type,
            output.stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
        );
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = model_config(&args.model)
        .await?
        .build()
        .context("Invalid configuration")?;
    let integrator = Integrator::from_config(&config).context("Failed to configure LLM provider")?;

    lingualeap::server::serve(args.addr, integrator)
        .await
        .context("Server stopped")?;
    Ok(())
}

/// Map the shared model flags onto a config builder.
async fn model_config(args: &ModelArgs) -> Result<lingualeap::IntegrationConfigBuilder> {
    let mut builder = IntegrationConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(secs) = args.oracle_timeout {
        builder = builder.oracle_timeout_secs(secs);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    Ok(builder)
}
