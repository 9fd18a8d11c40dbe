//! CLI binary for lecslide.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, `study`
//! runs the whole pipeline on a local file, `inspect` shows what extraction
//! sees without calling any LLM.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use lecslide::server::{self, AppState};
use lecslide::{
    export, extract, study_path, write_export, ExportFormat, LlmGenerator, ProgressCallback,
    ServerConfig, StudyConfig, StudyProgressCallback, TextGenerator,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

/// Live progress bar plus one log line per finished slide. Slides finish out
/// of order when several are enhanced at once.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting slides…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, slide_num: usize) -> f64 {
        self.start_times
            .lock()
            .remove(&slide_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl StudyProgressCallback for CliProgressCallback {
    fn on_study_start(&self, total_slides: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_slides as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Enhancing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Enhancing {total_slides} slides…"))
        ));
    }

    fn on_slide_start(&self, slide_num: usize, _total: usize) {
        self.start_times.lock().insert(slide_num, Instant::now());
        self.bar.set_message(format!("slide {slide_num}"));
    }

    fn on_slide_complete(&self, slide_num: usize, total: usize, question_count: usize) {
        let secs = self.elapsed_secs(slide_num);
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {:<14}  {}",
            green("✓"),
            slide_num,
            total,
            dim(&format!("{question_count:>2} questions")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_slide_error(&self, slide_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(slide_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}  {}",
            red("✗"),
            slide_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_study_complete(&self, total_slides: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if success_count == total_slides {
            eprintln!(
                "{} {} slides enhanced",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} stopped after {}/{} slides  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total_slides,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 3000
  lecslide serve

  # Study notes as Markdown on stdout
  lecslide study lecture01.pptx

  # PDF handout, explicit subject
  lecslide study lecture01.pdf -f pdf -o notes/lecture01.pdf --subject "Operating Systems"

  # See what extraction finds (no API key needed)
  lecslide inspect lecture01.ppt

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  LECSLIDE_HOST           Listen address for `serve` (default 0.0.0.0)
  LECSLIDE_PORT           Listen port for `serve` (default 3000)
  LECSLIDE_PUBLIC_URL     Base API URL used in download links
  LECSLIDE_FIXTURES       Serve the demo deck for unknown sessions (default on)
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
"#;

/// Turn lecture slides into AI-enhanced study materials.
#[derive(Parser, Debug)]
#[command(
    name = "lecslide",
    version,
    about = "Turn lecture slides (PDF, PPTX, PPT) into AI-enhanced study materials",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LECSLIDE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LECSLIDE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Extract, enhance and export a local slide deck.
    Study(StudyArgs),
    /// Print the slides extraction finds, without calling an LLM.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Slides enhanced at the same time.
    #[arg(short, long, env = "LECSLIDE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LECSLIDE_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per request.
    #[arg(long, env = "LECSLIDE_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Per-request LLM timeout in seconds (0 disables).
    #[arg(long, env = "LECSLIDE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "LECSLIDE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address.
    #[arg(long, env = "LECSLIDE_HOST")]
    host: Option<String>,

    /// Listen port.
    #[arg(long, env = "LECSLIDE_PORT")]
    port: Option<u16>,

    /// Only serve real sessions; unknown ids answer 404.
    #[arg(long)]
    no_fixtures: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct StudyArgs {
    /// Slide deck: .pdf, .pptx or .ppt.
    input: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "markdown")]
    format: FormatArg,

    /// Output file. Text formats go to stdout when omitted; PDF and DOCX
    /// default to `<input stem>_notes.<ext>`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Subject shown in the export header.
    #[arg(long, default_value = "General")]
    subject: String,

    /// Print the enhanced deck as JSON instead of exporting it.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "LECSLIDE_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Slide deck: .pdf, .pptx or .ppt.
    input: PathBuf,

    /// Print the extracted slides as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Markdown,
    Html,
    Pdf,
    Docx,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Docx => ExportFormat::Docx,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The progress bar replaces INFO logs during `study`.
    let show_progress = matches!(&cli.command, Command::Study(a) if !a.no_progress && !a.json) && !cli.quiet;
    let filter = if cli.verbose {
        "lecslide=debug,tower_http=debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "lecslide=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Study(args) => study(args, cli.quiet, show_progress).await,
        Command::Inspect(args) => inspect(args, cli.quiet).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut server_config = ServerConfig::from_env();
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if args.no_fixtures {
        server_config.fixtures = false;
    }

    let study_config = build_config(&args.llm, None).await?;
    let generator: Option<Arc<dyn TextGenerator>> = match LlmGenerator::from_config(&study_config) {
        Ok(g) => Some(Arc::new(g)),
        Err(e) => {
            tracing::warn!("{}", e);
            tracing::warn!("Uploads and regeneration will answer 503 until a provider is configured");
            None
        }
    };

    ensure_pdfium(false)?;
    let state = AppState::new(server_config, study_config, generator);
    server::serve(state).await.context("Server failed")
}

async fn study(args: StudyArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let format: ExportFormat = args.format.into();
    let needs_pdfium = is_pdf(&args.input) || (!args.json && format == ExportFormat::Pdf);
    if needs_pdfium {
        ensure_pdfium(quiet)?;
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StudyProgressCallback>)
    } else {
        None
    };
    let config = build_config(&args.llm, progress).await?;
    let generator: Arc<dyn TextGenerator> =
        Arc::new(LlmGenerator::from_config(&config).context("No LLM provider available")?);

    let started = Instant::now();
    let data = study_path(&args.input, &args.subject, generator, &config)
        .await
        .with_context(|| format!("Failed to study {}", args.input.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&data).context("Failed to serialise slides")?;
        println!("{json}");
        return Ok(());
    }

    let output = match (&args.output, format) {
        (Some(path), _) => Some(path.clone()),
        (None, ExportFormat::Pdf | ExportFormat::Docx) => Some(default_output(&args.input, format)),
        (None, _) => None,
    };

    match output {
        Some(path) => {
            write_export(&data, format, &path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!(
                    "{}  {} slides  {:.1}s  →  {}",
                    green("✔"),
                    data.slides.len(),
                    started.elapsed().as_secs_f64(),
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let bytes = export::render_async(data, format)
                .await
                .context("Export failed")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
            if !bytes.ends_with(b"\n") {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

async fn inspect(args: InspectArgs, quiet: bool) -> Result<()> {
    if is_pdf(&args.input) {
        ensure_pdfium(quiet)?;
    }
    let slides = extract::extract_file(&args.input)
        .await
        .with_context(|| format!("Failed to extract {}", args.input.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&slides).context("Failed to serialise slides")?
        );
        return Ok(());
    }

    println!("File:    {}", args.input.display());
    println!("Slides:  {}", slides.len());
    for (i, slide) in slides.iter().enumerate() {
        println!(
            "  {:>3}  {:<50}  {}",
            i + 1,
            slide.title,
            dim(&format!("{} chars", slide.content.chars().count()))
        );
    }
    Ok(())
}

/// Map CLI args to `StudyConfig`.
async fn build_config(llm: &LlmArgs, progress: Option<ProgressCallback>) -> Result<StudyConfig> {
    let mut builder = StudyConfig::builder()
        .slide_concurrency(llm.concurrency)
        .temperature(llm.temperature)
        .max_tokens(llm.max_tokens)
        .api_timeout_secs(llm.api_timeout);

    if let Some(ref model) = llm.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = llm.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = llm.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Download pdfium on first use, with a progress bar unless `quiet`.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn default_output(input: &Path, format: ExportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("lecture");
    PathBuf::from(format!("{stem}_notes.{}", format.extension()))
}
