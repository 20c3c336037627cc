//! CLI binary for dochub-verify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `VerifierConfig`, stages the given files and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use dochub_verify::config::{DEFAULT_ENDPOINT, ENDPOINT_ENV};
use dochub_verify::prompts::IDENTITY_EXTRACTION_PROMPT;
use dochub_verify::{
    Field, Phase, ProgressCallback, SubmissionProgressCallback,
    VerificationOutcome, VerificationResult, Verifier, VerifierConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while the single verification request is in flight.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Verifying");
        Arc::new(Self { bar })
    }
}

impl SubmissionProgressCallback for CliProgressCallback {
    fn on_submit_start(&self, documents: usize, total_bytes: u64) {
        self.bar
            .set_message(format!("{documents} documents, {total_bytes} bytes"));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_submit_complete(&self, outcome: &VerificationOutcome, elapsed: Duration) {
        self.bar.finish_and_clear();
        let secs = dim(&format!("{:.1}s", elapsed.as_secs_f64()));
        match outcome {
            VerificationOutcome::Results(r) if r.is_empty() => {
                eprintln!("{} no records returned  {}", yellow("⚠"), secs)
            }
            VerificationOutcome::Results(r) => {
                eprintln!("{} {} records  {}", green("✔"), bold(&r.len().to_string()), secs)
            }
            VerificationOutcome::AnalysisMessage(_) | VerificationOutcome::Failure(_) => {
                eprintln!("{} verification did not succeed  {}", red("✘"), secs)
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Verify a passport scan against the local service
  dochub passport.jpg

  # Several documents in one request
  dochub front.png back.png licence.pdf

  # Remote service, 60 s deadline, JSON output
  dochub --endpoint https://verify.example.com/analyze-images --timeout 60 --json id.pdf

  # Download the document first
  dochub https://example.com/scans/id-card.png

  # Accept any image type, up to 20 MB per file
  dochub --allow 'image/*' --allow application/pdf --max-size-mb 20 scan.webp

ENVIRONMENT VARIABLES:
  DOCHUB_ENDPOINT          Extraction service URL (default http://localhost:8000/analyze-images)
  DOCHUB_TIMEOUT           Request deadline in seconds
  DOCHUB_MAX_SIZE_MB       Per-file size limit in megabytes
  DOCHUB_ALLOW             Comma-separated accepted MIME types (same as --allow)
  DOCHUB_LEGACY_ALIASES    Read lastname / dob keys (same as --legacy-aliases)
  DOCHUB_NO_PROGRESS       Disable the progress spinner
  DOCHUB_DOWNLOAD_TIMEOUT  Download timeout in seconds for URL inputs
  RUST_LOG                 Log filter, overrides -v / -q

EXIT STATUS:
  0  the service returned at least one record
  1  nothing could be staged, or the request failed, or no records came back
"#;

/// Extract identity fields from document images and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "dochub",
    version,
    about = "Extract name, surname and date of birth from identity documents",
    long_about = "Stage identity documents (local files or URLs), send them in one request to a \
document extraction service, and print the name, surname and date of birth read from each \
document with per-field confidence.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Extraction service URL.
    #[arg(long, env = ENDPOINT_ENV, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-file size limit in megabytes.
    #[arg(long, env = "DOCHUB_MAX_SIZE_MB", default_value_t = 10)]
    max_size_mb: u64,

    /// Accepted MIME type; repeat to allow several. `image/*` matches any image.
    #[arg(long = "allow", env = "DOCHUB_ALLOW", value_delimiter = ',')]
    allow: Vec<String>,

    /// Request deadline in seconds.
    #[arg(long, env = "DOCHUB_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Prompt text sent with the documents.
    #[arg(long, conflicts_with_all = ["prompt_file", "builtin_prompt"])]
    prompt: Option<String>,

    /// Read the prompt from a file.
    #[arg(long, conflicts_with = "builtin_prompt")]
    prompt_file: Option<PathBuf>,

    /// Send the bundled identity-extraction prompt.
    #[arg(long)]
    builtin_prompt: bool,

    /// Also read `lastname` / `dob` keys from older service versions.
    #[arg(long, env = "DOCHUB_LEGACY_ALIASES")]
    legacy_aliases: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCHUB_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "DOCHUB_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the user feedback; keep library INFO logs out of it.
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
        Some(CliProgressCallback::new() as Arc<dyn SubmissionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;
    let mut verifier = Verifier::new(&config).context("Failed to create verifier")?;

    // ── Stage documents ──────────────────────────────────────────────────
    let mut loaded = Vec::new();
    for (input, result) in cli
        .inputs
        .iter()
        .zip(verifier.load_documents(&cli.inputs[..]).await)
    {
        match result {
            Ok(doc) => loaded.push(doc),
            Err(e) => eprintln!("{} {}: {}", red("✗"), input, e),
        }
    }

    let report = verifier.add(loaded);
    for rejection in &report.rejections {
        eprintln!("{} {}", red("✗"), rejection);
    }
    if verifier.batch().is_empty() {
        eprintln!("{} no documents to verify", red("✘"));
        return Ok(ExitCode::FAILURE);
    }
    if !cli.quiet && !cli.json {
        for entry in verifier.batch().entries() {
            eprintln!(
                "  {} {}  {}",
                green("✓"),
                entry.document.name(),
                dim(&format!("{} · {} bytes", entry.document.mime_type(), entry.document.size()))
            );
        }
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let outcome = verifier.submit().await.context("Verification failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else {
        print_outcome(&outcome);
    }

    Ok(if verifier.phase() == Phase::Succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `VerifierConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<VerifierConfig> {
    let prompt = if let Some(ref p) = cli.prompt {
        p.clone()
    } else if let Some(ref path) = cli.prompt_file {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?
    } else if cli.builtin_prompt {
        IDENTITY_EXTRACTION_PROMPT.to_string()
    } else {
        String::new()
    };

    let max_bytes = cli
        .max_size_mb
        .checked_mul(1024 * 1024)
        .context("--max-size-mb is too large")?;

    let mut builder = VerifierConfig::builder()
        .endpoint(cli.endpoint.as_str())
        .max_bytes(max_bytes)
        .timeout_secs(cli.timeout)
        .prompt(prompt)
        .legacy_aliases(cli.legacy_aliases)
        .download_timeout_secs(cli.download_timeout);

    if !cli.allow.is_empty() {
        builder = builder.allowed_mime_types(cli.allow.iter());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_outcome(outcome: &VerificationOutcome) {
    match outcome {
        VerificationOutcome::Results(records) if records.is_empty() => {
            println!("No identity data found in the submitted documents.");
        }
        VerificationOutcome::Results(records) => {
            for (i, record) in records.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_record(i + 1, record);
            }
        }
        VerificationOutcome::AnalysisMessage(message) => {
            println!("{} {}", yellow("Analysis:"), message);
        }
        VerificationOutcome::Failure(reason) => {
            println!("{} {}", red("Error:"), reason);
        }
    }
}

fn print_record(n: usize, record: &VerificationResult) {
    println!("{}", bold(&format!("Document {n}")));
    for field in Field::ALL {
        let value = if record.is_unknown(field) {
            yellow("unknown")
        } else {
            record.value(field).to_string()
        };
        println!(
            "  {:<14} {:<32} {}",
            field.label(),
            value,
            dim(&format!("{:.0}%", record.confidence(field) * 100.0))
        );
    }
}
