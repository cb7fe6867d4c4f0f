//! Interactive assessment: registration, OTP, the four steps, summary.
//!
//! Every screen is driven through [`PhaseController`]; this module only
//! turns terminal input into controller calls and controller state into
//! output. Failures are shown inline and the same screen is asked again.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use assessment_client::{AssessmentClient, NominatimGeocoder};
use assessment_core::schema::{
    ChoiceOption, Field, FieldInput, Question, QuestionKind, StepLayout,
};
use assessment_core::countdown::format_mm_ss;
use assessment_core::{Phase, PhaseController, Registration};

use crate::{
    BOLD, CYAN, DIM, RESET, display_value, header, print_banner, print_summary, progress_bar,
    success, warning,
};

// ── Prompting ────────────────────────────────────────────────────────

struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String> {
        print!("  {CYAN}?{RESET} {label}: ");
        std::io::stdout().flush().context("failed to write prompt")?;
        match self.lines.next_line().await.context("failed to read input")? {
            Some(line) => Ok(line.trim().to_owned()),
            None => bail!("input closed before the assessment was finished"),
        }
    }

    async fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.ask(&format!("{label} [y/N]")).await?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

// ── Choice parsing ───────────────────────────────────────────────────

/// Resolve one choice given as a 1-based number or an option value.
fn parse_choice(input: &str, options: &[ChoiceOption]) -> Option<String> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| options.get(i))
            .map(|o| o.value.clone());
    }
    options
        .iter()
        .find(|o| o.value.eq_ignore_ascii_case(input))
        .map(|o| o.value.clone())
}

/// Resolve a comma-separated list of choices. Duplicates collapse.
fn parse_choices(input: &str, options: &[ChoiceOption]) -> Option<Vec<String>> {
    let mut picked: Vec<String> = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value = parse_choice(part, options)?;
        if !picked.contains(&value) {
            picked.push(value);
        }
    }
    (!picked.is_empty()).then_some(picked)
}

fn print_options(options: &[ChoiceOption]) {
    for (i, option) in options.iter().enumerate() {
        println!("     {DIM}{:>2}.{RESET} {}", i + 1, option.label);
    }
}

// ── Screens ──────────────────────────────────────────────────────────

/// Run the whole assessment against `client`.
pub async fn run(
    client: AssessmentClient,
    geocoder: &NominatimGeocoder,
    coords: Option<(f64, f64)>,
) -> Result<()> {
    let mut flow = PhaseController::new(Arc::new(client.clone()));
    let mut prompt = Prompter::new();

    print_banner();
    register(&mut flow, &mut prompt).await?;
    verify(&mut flow, &mut prompt).await?;

    while matches!(flow.phase(), Phase::Steps(_)) {
        answer_step(&mut flow, &mut prompt, geocoder, coords).await?;
    }

    success("Assessment complete. Thank you!");
    println!();
    if let Some(session_id) = flow.session_id() {
        match client.session_summary(session_id).await {
            Ok(summary) => print_summary(&summary),
            Err(e) => warning(&format!("Could not load your scores: {e}")),
        }
    }
    Ok(())
}

async fn register(flow: &mut PhaseController, prompt: &mut Prompter) -> Result<()> {
    header("👤", "Registration");
    while matches!(flow.phase(), Phase::PreRegistration) {
        let registration = Registration {
            name: prompt.ask("Name").await?,
            phone: prompt.ask("Phone").await?,
            email: prompt.ask("E-mail").await?,
            terms_accepted: prompt.confirm("Accept the terms and conditions?").await?,
        };
        match flow.start(&registration).await {
            Ok(()) => success(&format!("A one-time code was sent to {}", registration.phone)),
            Err(e) => warning(&e.to_string()),
        }
    }
    println!();
    Ok(())
}

async fn verify(flow: &mut PhaseController, prompt: &mut Prompter) -> Result<()> {
    header("🔑", "Verification");
    while matches!(flow.phase(), Phase::Otp { .. }) {
        let hint = otp_hint(flow.otp_remaining().unwrap_or(0));
        let code = prompt.ask(&format!("Enter the 6-digit code ({hint})")).await?;
        match flow.verify_otp(&code).await {
            Ok(()) => success("Verified"),
            Err(e) => warning(&e.to_string()),
        }
    }
    println!();
    Ok(())
}

async fn answer_step(
    flow: &mut PhaseController,
    prompt: &mut Prompter,
    geocoder: &NominatimGeocoder,
    coords: Option<(f64, f64)>,
) -> Result<()> {
    let Some(definition) = flow.step_definition().cloned() else {
        warning(flow.last_error().unwrap_or("Failed to load questions"));
        prompt.ask("Press Enter to retry").await?;
        if let Err(e) = flow.load_step().await {
            tracing::debug!(error = %e, "step reload failed");
        }
        return Ok(());
    };

    let step = flow
        .current_step()
        .map_or_else(String::new, |s| s.to_string());
    let progress = flow.progress();
    let title = definition.title.as_deref().unwrap_or("");
    header("📝", &format!("Step {step} of 4  {title}"));
    println!("  {} {progress}", progress_bar(progress.percent()));
    println!("  {DIM}Press Enter to keep the value shown in brackets.{RESET}");
    println!();

    match &definition.layout {
        StepLayout::Fields(fields) => {
            for field in fields {
                ask_field(flow, prompt, field, geocoder, coords).await?;
            }
        }
        StepLayout::Questions(questions) => {
            for (i, question) in questions.iter().enumerate() {
                ask_question(flow, prompt, i + 1, question).await?;
            }
        }
    }

    match flow.submit_step().await {
        Ok(()) => success("Saved"),
        Err(e) => warning(&e.to_string()),
    }
    println!();
    Ok(())
}

fn otp_hint(remaining: u64) -> String {
    if remaining > 0 {
        format!("expires in {}", format_mm_ss(remaining))
    } else {
        "expired, you may still try it".to_owned()
    }
}

fn current_answer(flow: &PhaseController, key: &str) -> Option<String> {
    flow.answers()
        .and_then(|a| a.get(key))
        .filter(|v| v.is_filled())
        .map(display_value)
}

fn with_current(label: &str, current: Option<&str>) -> String {
    match current {
        Some(value) => format!("{label} [{value}]"),
        None => label.to_owned(),
    }
}

async fn ask_field(
    flow: &mut PhaseController,
    prompt: &mut Prompter,
    field: &Field,
    geocoder: &NominatimGeocoder,
    coords: Option<(f64, f64)>,
) -> Result<()> {
    if field.detect_location && current_answer(flow, &field.key).is_none() {
        if let Some((lat, lon)) = coords {
            match flow.detect_location(&field.key, lat, lon, geocoder).await {
                Ok(true) => println!("  {DIM}Detected {} from your location{RESET}", field.label),
                Ok(false) => println!("  {DIM}Could not detect {} from your location{RESET}", field.label),
                Err(e) => warning(&e.to_string()),
            }
        }
    }

    loop {
        let current = current_answer(flow, &field.key);
        let label = with_current(&field.label, current.as_deref());
        match &field.input {
            FieldInput::Text => {
                let input = prompt.ask(&label).await?;
                if !input.is_empty() {
                    flow.set_answer(&field.key, input)?;
                }
                return Ok(());
            }
            FieldInput::Dropdown { options } => {
                println!("  {BOLD}{}{RESET}", field.label);
                print_options(options);
                let input = prompt.ask(&label).await?;
                if input.is_empty() {
                    return Ok(());
                }
                if let Some(value) = parse_choice(&input, options) {
                    flow.set_answer(&field.key, value)?;
                    return Ok(());
                }
                warning("Pick one of the listed numbers");
            }
        }
    }
}

async fn ask_question(
    flow: &mut PhaseController,
    prompt: &mut Prompter,
    number: usize,
    question: &Question,
) -> Result<()> {
    println!("  {BOLD}{number}. {}{RESET}", question.text);
    if let Some(sub) = &question.sub_question {
        println!("     {sub}");
    }
    if let Some(hint) = &question.hint {
        println!("     {DIM}{hint}{RESET}");
    }
    let options = question.kind.options();
    print_options(options);

    let multi = matches!(question.kind, QuestionKind::Checkbox { .. });
    let label = if multi {
        "Choose one or more (e.g. 1,3)"
    } else {
        "Choose one"
    };

    let chosen = loop {
        let current = current_answer(flow, &question.key);
        let input = prompt.ask(&with_current(label, current.as_deref())).await?;
        if input.is_empty() {
            break None;
        }
        let parsed = if multi {
            parse_choices(&input, options)
        } else {
            parse_choice(&input, options).map(|v| vec![v])
        };
        match parsed {
            Some(values) => break Some(values),
            None => warning("Pick from the listed numbers"),
        }
    };

    if let Some(values) = chosen {
        let wants_other = options
            .iter()
            .any(|o| o.has_other && values.contains(&o.value));
        if multi {
            flow.set_answer(&question.key, values)?;
        } else if let Some(value) = values.into_iter().next() {
            flow.set_answer(&question.key, value)?;
        }
        if wants_other {
            let text = prompt.ask("Please specify").await?;
            flow.set_other_text(&question.key, &text)?;
        }
    }
    println!();
    Ok(())
}
