//! CLI binary for nocap.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! `Orchestrator`, runs one submission, and prints the verdict.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nocap::{
    AnalysisMode, AnalysisResult, ClientConfig, CredentialSupplier, EnvCredential,
    ImageFileCamera, NoCapError, Observer, Orchestrator, StaticCredential, SubmissionObserver,
    SubmissionState, TextVariant,
};
use std::io::{self, Read};
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner for every mode, switching to a percentage
/// bar once an upload mode starts ticking.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("nocap");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_style(style);
    }
}

impl SubmissionObserver for CliObserver {
    fn on_state_change(&self, mode: AnalysisMode, state: SubmissionState) {
        match state {
            SubmissionState::Preparing => self.bar.set_message(format!("Preparing {mode}…")),
            SubmissionState::Submitting => {
                if mode.has_progress() {
                    self.activate_bar();
                    self.bar.set_message("Uploading and analyzing…");
                } else {
                    self.bar.set_message("Analyzing…");
                }
            }
            SubmissionState::AwaitingResponse => {}
            SubmissionState::Success => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold("Analysis complete!"));
            }
            SubmissionState::Failed => {
                self.bar.finish_and_clear();
            }
            SubmissionState::Idle => {}
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_error(&self, error: &NoCapError) {
        self.bar.println(format!("{} {}", red("✗"), red(&error.to_string())));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Is it fax or cap?
  nocap text "The sky is green"

  # Deep dive with sources
  nocap deep-dive "Drinking coffee cures colds"

  # Classify the headline of a page
  nocap website https://example.com/news/story

  # Read the claim from stdin
  echo "The moon is made of cheese" | nocap text -

  # Analyse a document (.txt or .pdf)
  nocap document ./press-release.pdf

  # Human vs machine image check
  nocap image ./meme.png
  nocap image --camera /run/snapshot/latest.jpg

  # Structured output
  nocap --json text "Water boils at 50°C"

ENVIRONMENT VARIABLES:
  NOCAP_BACKEND   Base URL of the analysis service (default http://localhost:5000)
  NOCAP_TOKEN     Bearer ID token, read right before the request is sent
"#;

/// Check text, websites, documents and images for fax or cap.
#[derive(Parser, Debug)]
#[command(
    name = "nocap",
    version,
    about = "Check text, websites, documents and images for fax or cap",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the analysis service.
    #[arg(long, global = true, env = "NOCAP_BACKEND", default_value = nocap::config::DEFAULT_BASE_URL)]
    backend: String,

    /// Bearer token. If omitted, NOCAP_TOKEN is read at submit time.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Whole-request timeout in seconds (default: wait indefinitely).
    #[arg(long, global = true, env = "NOCAP_TIMEOUT")]
    timeout: Option<u64>,

    /// Output the normalized result as JSON.
    #[arg(long, global = true, env = "NOCAP_JSON")]
    json: bool,

    /// Disable progress display.
    #[arg(long, global = true, env = "NOCAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOCAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, global = true, env = "NOCAP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a piece of text as fax or cap.
    Text(TextArgs),
    /// Investigate a claim and return a narrative answer with sources.
    DeepDive {
        /// Claim to investigate ("-" reads stdin).
        text: Vec<String>,
    },
    /// Classify the headline of a web page.
    Website {
        /// Page URL (forwarded as-is).
        url: String,
    },
    /// Classify a .txt or .pdf document.
    Document {
        /// Path to the document.
        path: PathBuf,
    },
    /// Score an image as human- or machine-generated.
    Image(ImageArgs),
}

#[derive(Args, Debug)]
struct TextArgs {
    /// Text to check ("-" reads stdin).
    text: Vec<String>,

    /// Switch to the deep-dive narrative mode.
    #[arg(long, conflicts_with = "website")]
    deep_dive: bool,

    /// Treat the text as a URL.
    #[arg(long)]
    website: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ImageArgs {
    /// Image file to upload.
    path: Option<PathBuf>,

    /// Capture one frame from a file-backed camera source instead.
    #[arg(long, value_name = "STILL")]
    camera: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display gives all the feedback that matters, so library
    // logs are quieted while it is active.
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

    // ── Build orchestrator ───────────────────────────────────────────────
    let config = build_config(&cli)?;
    let mut orchestrator = Orchestrator::new(config).context("Failed to create client")?;
    if show_progress {
        orchestrator = orchestrator.with_observer(CliObserver::new() as Observer);
    }

    let credentials: Box<dyn CredentialSupplier> = match cli.token {
        Some(ref t) => Box::new(StaticCredential::new(t.clone())),
        None => Box::new(EnvCredential::default()),
    };

    // ── Prepare input ────────────────────────────────────────────────────
    match &cli.command {
        Command::Text(args) => {
            orchestrator.select_mode(AnalysisMode::Text);
            if args.deep_dive {
                orchestrator.toggle(TextVariant::DeepDive);
            } else if args.website {
                orchestrator.toggle(TextVariant::Website);
            }
            orchestrator.set_text(read_text(&args.text)?);
        }
        Command::DeepDive { text } => {
            orchestrator.select_mode(AnalysisMode::DeepDive);
            orchestrator.set_text(read_text(text)?);
        }
        Command::Website { url } => {
            orchestrator.select_mode(AnalysisMode::Website);
            orchestrator.set_text(url.clone());
        }
        Command::Document { path } => {
            orchestrator.select_mode(AnalysisMode::Document);
            orchestrator
                .choose_file(path)
                .await
                .with_context(|| format!("Failed to load document {}", path.display()))?;
        }
        Command::Image(args) => {
            orchestrator.select_mode(AnalysisMode::Image);
            if let Some(ref still) = args.camera {
                orchestrator
                    .capture_from_camera(Arc::new(ImageFileCamera::new(still)))
                    .await
                    .context("Camera capture failed")?;
            } else if let Some(ref path) = args.path {
                orchestrator
                    .choose_file(path)
                    .await
                    .with_context(|| format!("Failed to load image {}", path.display()))?;
            }
        }
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let mode = orchestrator.mode();
    let result = orchestrator
        .submit(credentials.as_ref())
        .await
        .with_context(|| format!("{mode} analysis failed"))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        print_result(&result);
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().base_url(&cli.backend);
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

/// Join positional words, or read stdin when given a lone "-".
fn read_text(words: &[String]) -> Result<String> {
    if words.len() == 1 && words[0] == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read text from stdin")?;
        return Ok(buf.trim_end().to_string());
    }
    Ok(words.join(" "))
}

fn print_result(result: &AnalysisResult) {
    match result {
        AnalysisResult::Score { label, score } => {
            match label {
                Some(l) => println!("That's total {} bro", bold(&l.to_string())),
                None => println!("{}", dim("(the service returned an unrecognised label)")),
            }
            if *score > 0.0 {
                println!("I'm {:.2}% sure about this one", score * 100.0);
            }
        }
        AnalysisResult::DualScore {
            human,
            machine,
            verdict,
            image_url,
        } => {
            println!("{}", bold("Analysis Results"));
            println!("Human Score:   {human}");
            println!("Machine Score: {machine}");
            println!("Verdict:       {}", cyan(&verdict.to_string()));
            if let Some(url) = image_url {
                println!("{}", dim(url));
            }
        }
        AnalysisResult::Narrative { text } => {
            println!("{}", bold("Deep Dive Results"));
            if let Some(n) = result.narrative() {
                if let Some(answer) = n.answer() {
                    println!("Answer: {}", cyan(answer));
                    for source in n.sources() {
                        println!("  {} {}", dim("•"), source);
                    }
                    return;
                }
            }
            println!("{text}");
        }
    }
}
