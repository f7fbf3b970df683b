//! CLI binary for edgequake-essay2txt.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one document and prints the text (and, with
//! `--review`, the scoring report).

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_essay2txt::{
    pipeline::input::resolve_input, validate_essay_text, EssayReviewer, ExtractionConfig,
    ExtractionOutput, ExtractionProgressCallback, ExtractionRoute, Extractor, MediaKind,
    NormalizationMode, ProgressCallback, ReviewReport, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the extraction stages and logs each engine's answer.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, kind: MediaKind) {
        self.bar.set_prefix("Extracting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting essay text from {kind} document…"))
        ));
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_engine_complete(&self, engine: &str, chars: usize) {
        let mark = if chars > 0 { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} {:<10}  {}",
            mark,
            engine,
            dim(&format!("{chars:>5} chars"))
        ));
    }

    fn on_extraction_complete(&self, route: ExtractionRoute, chars: usize) {
        self.bar.finish_and_clear();
        let mark = if chars > 0 { green("✔") } else { red("✘") };
        eprintln!(
            "{} {} chars  {}",
            mark,
            bold(&chars.to_string()),
            dim(&format!("via {route}"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Photo of a handwritten essay (stdout)
  essay2txt redacao.jpg

  # Typed PDF to file
  essay2txt redacao.pdf -o redacao.txt

  # Clean flatbed scan: lighter image cleanup
  essay2txt --gentle scan.png

  # Extract, score, rewrite and compare
  essay2txt --review --topic "Desafios da mobilidade urbana" redacao.jpg --json

  # Declared type wins over extension and magic bytes
  essay2txt --content-type image/jpeg upload.bin

ROUTES:
  native_text   PDF with embedded text; no OCR
  primary       vision model answer longer than --quality-threshold chars
  fallback      Tesseract answer (vision answer too short)
  unsupported   not a pdf/jpeg/png, or empty
  unreadable    PDF could not be opened

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory or file of libpdfium
  TESSDATA_PREFIX         Tesseract language data (build with --features tesseract)
  RUST_LOG                Log filter, e.g. edgequake_essay2txt=debug
"#;

/// Extract handwritten or typed essay text from PDFs and photos.
#[derive(Parser, Debug)]
#[command(
    name = "essay2txt",
    version,
    about = "Extract essay text from PDFs and photos using a vision LLM with Tesseract fallback",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL (pdf, jpeg or png).
    input: String,

    /// Declared MIME type; overrides extension and magic bytes.
    #[arg(long)]
    content_type: Option<String>,

    /// Write the text to this file instead of stdout.
    #[arg(short, long, env = "ESSAY2TXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Light cleanup (denoise + deskew) instead of full binarisation.
    #[arg(long, env = "ESSAY2TXT_GENTLE")]
    gentle: bool,

    /// Rasterisation DPI for scanned PDFs (72–600).
    #[arg(long, env = "ESSAY2TXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Vision answers must be longer than this many characters.
    #[arg(long, env = "ESSAY2TXT_QUALITY_THRESHOLD", default_value_t = 50)]
    quality_threshold: usize,

    /// Reject results with fewer non-whitespace characters than this.
    #[arg(long, env = "ESSAY2TXT_MIN_CHARS", default_value_t = 20)]
    min_chars: usize,

    /// LLM model ID (e.g. gpt-4.1-nano, gemini-2.0-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Tesseract language code.
    #[arg(long, env = "ESSAY2TXT_TESSERACT_LANG", default_value = "por")]
    tesseract_lang: String,

    /// Tesseract tessdata directory.
    #[arg(long, env = "ESSAY2TXT_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Directory (or file) of libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Whole-pipeline timeout in seconds.
    #[arg(long, env = "ESSAY2TXT_TIMEOUT", default_value_t = 180)]
    timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ESSAY2TXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Also score the essay, rewrite it and score the rewrite.
    #[arg(long)]
    review: bool,

    /// Essay topic passed to the scorer.
    #[arg(long, requires = "review")]
    topic: Option<String>,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "ESSAY2TXT_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ESSAY2TXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ESSAY2TXT_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "ESSAY2TXT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    extraction: &'a ExtractionOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<&'a ReviewReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Extract under a caller-level timeout ─────────────────────────────
    let limit = Duration::from_secs(cli.timeout);
    let output = tokio::time::timeout(limit, run_extraction(&cli, &config))
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "Tempo esgotado após {}s ao extrair o texto da redação.",
                cli.timeout
            )
        })??;

    validate_essay_text(&output.text, config.min_essay_chars)?;

    // ── Optional review ──────────────────────────────────────────────────
    let review = if cli.review {
        let reviewer = EssayReviewer::from_config(&config)
            .await
            .context("Failed to set up the reviewer")?;
        let report = tokio::time::timeout(limit, reviewer.review(&output.text, cli.topic.as_deref()))
            .await
            .map_err(|_| anyhow::anyhow!("Tempo esgotado após {}s na correção.", cli.timeout))?
            .context("Review failed")?;
        Some(report)
    } else {
        None
    };

    // ── Emit ─────────────────────────────────────────────────────────────
    let rendered = if cli.json {
        serde_json::to_string_pretty(&JsonReport {
            extraction: &output,
            review: review.as_ref(),
        })
        .context("Failed to serialise output")?
    } else {
        render_text(&output, review.as_ref())
    };

    match cli.output {
        Some(ref path) => {
            tokio::fs::write(path, with_trailing_newline(rendered))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} chars  {}ms  →  {}",
                    green("✔"),
                    output.text.chars().count(),
                    output.duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(with_trailing_newline(rendered).as_bytes())
                .context("Failed to write to stdout")?;
            if !cli.quiet && !show_progress && !cli.json {
                eprintln!(
                    "Extracted {} chars via {} in {}ms",
                    output.text.chars().count(),
                    output.route,
                    output.duration_ms
                );
            }
        }
    }

    Ok(())
}

async fn run_extraction(cli: &Cli, config: &ExtractionConfig) -> Result<ExtractionOutput> {
    let document = resolve_input(
        &cli.input,
        cli.content_type.as_deref(),
        config.download_timeout_secs,
    )
    .await
    .context("Failed to read input")?;

    let extractor = Extractor::from_config(config)
        .await
        .context("Failed to set up the extraction pipeline")?;

    extractor
        .extract(&document)
        .await
        .context("Extraction failed")
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let normalization = if cli.gentle {
        NormalizationMode::Gentle
    } else {
        NormalizationMode::Aggressive
    };

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .normalization(normalization)
        .quality_threshold(cli.quality_threshold)
        .min_essay_chars(cli.min_chars)
        .tesseract_language(cli.tesseract_lang.clone())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn render_text(output: &ExtractionOutput, review: Option<&ReviewReport>) -> String {
    let Some(report) = review else {
        return output.text.clone();
    };

    let mut out = String::new();
    out.push_str(&report.original_text);
    out.push_str("\n\n── Texto corrigido ──\n\n");
    out.push_str(&report.rewritten_text);

    match report.comparison {
        Some(ref cmp) => {
            out.push_str("\n\n── Comparativo ──\n\n");
            for (comp, d) in &cmp.competencies {
                out.push_str(&format!(
                    "{comp}: {:>3} → {:>3} ({:+})\n",
                    d.original, d.rewritten, d.delta
                ));
            }
            out.push_str(&format!(
                "total: {} → {} ({:+})\n\n{}",
                cmp.total_original, cmp.total_rewritten, cmp.total_delta, cmp.summary
            ));
        }
        None => out.push_str("\n\n(avaliação indisponível: resposta do modelo não interpretável)"),
    }
    out
}

fn with_trailing_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}
