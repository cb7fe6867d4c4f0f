//! `assess`: terminal front end for the assessment service.
//!
//! Runs the registration, OTP and four-step questionnaire interactively,
//! and offers read-only views of a step or a session for an existing
//! session id.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod wizard;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assessment_client::{AssessmentClient, ClientConfig, NominatimGeocoder};
use assessment_core::api::SessionSummary;
use assessment_core::schema::{FieldInput, StepDefinition, StepLayout};
use assessment_core::{FormData, FormValue, Progress, SessionId, StepNumber};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BANNER: &str = "◆ Digital Maturity Assessment";

fn print_banner() {
    println!();
    println!("  {CYAN}{BOLD}{BANNER}{RESET}");
    println!("  {DIM}Four short steps. Your scores at the end.{RESET}");
    println!();
}

// ── CLI structure ────────────────────────────────────────────────────

/// Digital maturity assessment in the terminal.
#[derive(Parser)]
#[command(
    name = "assess",
    version,
    about = "Assessment CLI: register, verify your OTP, answer four steps, get scored",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         ASSESSMENT_API_BASE_URL   Service address (default: http://localhost:8000)\n  \
         ASSESSMENT_GEOCODER_URL   Reverse geocoder (default: https://nominatim.openstreetmap.org)\n  \
         ASSESSMENT_LOG            Log filter, e.g. debug\n\n\
         {DIM}Examples:{RESET}\n  \
         assess wizard\n  \
         assess wizard --latitude 12.97 --longitude 77.59\n  \
         assess questions 2 --session 5f0c...\n  \
         assess summary --session 5f0c..."
    ),
)]
struct Cli {
    /// Assessment service address.
    #[arg(long, env = "ASSESSMENT_API_BASE_URL")]
    api_url: Option<String>,

    /// Reverse geocoder address used for postcode detection.
    #[arg(long, env = "ASSESSMENT_GEOCODER_URL")]
    geocoder_url: Option<String>,

    /// Per-request timeout in seconds (default: none).
    #[arg(long)]
    timeout: Option<u64>,

    /// Log requests and state changes to stderr.
    #[arg(long, short, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the assessment interactively.
    Wizard {
        /// Device latitude, used to fill postcode fields.
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        /// Device longitude, used to fill postcode fields.
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
    /// Show the questions of one step and any saved answers.
    Questions {
        /// Step number (1-4).
        #[arg(value_parser = clap::value_parser!(u32).range(1..=4))]
        step: u32,
        /// Session id from a verified registration.
        #[arg(long)]
        session: String,
    },
    /// Show progress and scores of a session.
    Summary {
        /// Session id from a registration.
        #[arg(long)]
        session: String,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn progress_bar(percent: u8) -> String {
    let width = 20;
    let filled = usize::from(percent.min(100)) * width / 100;
    let empty = width - filled;
    format!(
        "{CYAN}[{}{DIM}{}]{RESET}",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

fn display_value(value: &FormValue) -> String {
    match value {
        FormValue::Flag(true) => "yes".to_owned(),
        FormValue::Flag(false) => "no".to_owned(),
        FormValue::Text(text) => text.clone(),
        FormValue::Choices(choices) => choices.join(", "),
    }
}

fn print_step(step: StepNumber, definition: &StepDefinition, saved: Option<&FormData>) {
    let title = definition.title.as_deref().unwrap_or("untitled step");
    header("📝", &format!("Step {step}: {title}"));

    let answer = |key: &str| {
        saved
            .and_then(|s| s.get(key))
            .filter(|v| v.is_filled())
            .map(display_value)
    };

    match &definition.layout {
        StepLayout::Fields(fields) => {
            for field in fields {
                let marker = if field.required { "*" } else { " " };
                let value = answer(&field.key).unwrap_or_else(|| format!("{DIM}-{RESET}"));
                kv_line(&format!("{marker}{}", field.label), &value);
                if let FieldInput::Dropdown { options } = &field.input {
                    let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
                    println!("  {DIM}{:<20} one of: {}{RESET}", "", values.join(", "));
                }
            }
        }
        StepLayout::Questions(questions) => {
            for (i, question) in questions.iter().enumerate() {
                println!("  {BOLD}{}. {}{RESET}", i + 1, question.text);
                if let Some(sub) = &question.sub_question {
                    println!("     {sub}");
                }
                for option in question.kind.options() {
                    println!("     {DIM}- {} ({}){RESET}", option.label, option.value);
                }
                if let Some(value) = answer(&question.key) {
                    println!("     {GREEN}answered:{RESET} {value}");
                }
            }
        }
    }
    println!();
}

fn print_summary(summary: &SessionSummary) {
    header("📊", "Assessment Summary");
    kv_line("Session", summary.session_id.as_str());
    kv_line("Name", &summary.name);
    let progress = Progress::from_percent(summary.progress_percent);
    kv_line(
        "Progress",
        &format!("{} {progress}", progress_bar(progress.percent())),
    );

    let completed = if summary.completed {
        format!("{GREEN}yes{RESET}")
    } else {
        format!("{YELLOW}no{RESET} (step {})", summary.current_step)
    };
    kv_line("Completed", &completed);
    if !summary.survey_code.is_empty() {
        kv_line("Survey code", &summary.survey_code);
    }

    if let Some(scores) = &summary.scores {
        println!();
        kv_line("Overall score", &format!("{BOLD}{}{RESET}", scores.overall_score));
        kv_line("Digital customers", &scores.digital_customers_score.to_string());
        kv_line("Digital operations", &scores.digital_operations_score.to_string());
        kv_line("Digital workplace", &scores.digital_workplace_score.to_string());
        kv_line("Industry average", &scores.industry_average.to_string());
        println!();
        println!("  {}", scores.message);
    }
    println!();
}

// ── Main ─────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "assessment_core=debug,assessment_client=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("ASSESSMENT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = AssessmentClient::with_config(ClientConfig {
        base_url: cli.api_url.unwrap_or_default(),
        timeout: cli.timeout.map(Duration::from_secs),
        user_agent: String::new(),
    })
    .context("invalid client configuration")?;

    match cli.command {
        Commands::Wizard {
            latitude,
            longitude,
        } => {
            let geocoder = NominatimGeocoder::new(cli.geocoder_url.as_deref().unwrap_or(""))
                .context("invalid geocoder configuration")?;
            let coords = latitude.zip(longitude);
            wizard::run(client, &geocoder, coords).await
        }
        Commands::Questions { step, session } => cmd_questions(&client, step, &session).await,
        Commands::Summary { session } => cmd_summary(&client, &session).await,
    }
}

async fn cmd_questions(client: &AssessmentClient, step: u32, session: &str) -> Result<()> {
    let step = StepNumber::new(step).context("step must be between 1 and 4")?;
    let payload = client
        .questions(&SessionId::new(session), step)
        .await
        .with_context(|| format!("could not load step {step}"))?;

    let (definition, saved) = payload.into_parts();
    let definition = definition.context("the service sent an empty step")?;
    print_step(step, &definition, saved.as_ref());
    Ok(())
}

async fn cmd_summary(client: &AssessmentClient, session: &str) -> Result<()> {
    let summary = client
        .session_summary(&SessionId::new(session))
        .await
        .context("could not load the session")?;
    print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        let bar = progress_bar(50);
        assert_eq!(bar.matches('█').count(), 10);
        assert_eq!(bar.matches('░').count(), 10);
        assert_eq!(progress_bar(200).matches('█').count(), 20);
    }

    #[test]
    fn values_render_for_humans() {
        assert_eq!(display_value(&FormValue::Flag(true)), "yes");
        assert_eq!(
            display_value(&FormValue::Choices(vec!["a".to_owned(), "b".to_owned()])),
            "a, b"
        );
    }
}
