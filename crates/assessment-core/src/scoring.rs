//! Digital-maturity scoring of a completed assessment.
//!
//! Three sub-scores (customers, workplace, operations) are averaged from
//! per-question scores looked up in fixed weighting tables, then averaged
//! again into the overall score. All arithmetic is integer with truncation.

use serde::{Deserialize, Serialize};

use crate::form::{FormData, FormValue};

/// Benchmark shown next to the overall score.
pub const INDUSTRY_AVERAGE: u32 = 55;

/// Prefix of the human-readable survey reference.
pub const SURVEY_CODE_PREFIX: &str = "PIR";

const SELLING_CHANNELS: &[(&str, u32)] = &[
    ("offline", 10),
    ("mobile", 25),
    ("website", 25),
    ("ecommerce", 25),
    ("social", 20),
    ("whatsapp", 20),
];

const COMMUNICATION_CHANNELS: &[(&str, u32)] =
    &[("intranet", 30), ("email", 20), ("whatsapp", 15), ("mobile", 15)];

const CONNECTIVITY: &[(&str, u32)] = &[
    ("ill", 35),
    ("sdwan", 30),
    ("wifi", 20),
    ("broadband", 15),
    ("none", 0),
];

const ADOPTION: &[(&str, u32)] = &[
    ("no_plans", 0),
    ("planned", 25),
    ("implementing", 60),
    ("in_use", 100),
];

const TRAINING: &[(&str, u32)] = &[
    ("never", 0),
    ("rarely", 20),
    ("sometimes", 50),
    ("regularly", 100),
];

const IOT: &[(&str, u32)] = &[("no", 0), ("planning", 30), ("limited", 60), ("extensive", 100)];

const IT_NETWORK: &[(&str, u32)] = &[
    ("in_house", 40),
    ("managed", 70),
    ("hybrid", 80),
    ("outsourced", 60),
];

const AI_ML_USAGE: &[(&str, u32)] = &[
    ("no_plans", 0),
    ("planning", 30),
    ("implementation", 70),
    ("adopted", 100),
];

const DEFAULT_CUSTOMERS: u32 = 40;
const DEFAULT_WORKPLACE: u32 = 45;
const DEFAULT_OPERATIONS: u32 = 50;

/// The report card for one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub overall_score: u32,
    pub digital_customers_score: u32,
    pub digital_workplace_score: u32,
    pub digital_operations_score: u32,
    pub industry_average: u32,
    pub message: String,
}

/// Score the answers of steps 2, 3 and 4.
pub fn score(step2: &FormData, step3: &FormData, step4: &FormData) -> ScoreCard {
    let customers = {
        let mut scores = Vec::new();
        let channels = choices(step2, "selling_channels");
        if !channels.is_empty() {
            scores.push(checkbox_score(&channels, SELLING_CHANNELS));
        }
        if list_contains(step2, "digital_priorities", "channels") {
            scores.push(25);
        } else if step2.get("digital_priorities").is_some_and(is_present) {
            scores.push(10);
        }
        if list_contains(step2, "ai_ml_processes", "customer") {
            scores.push(30);
        }
        average_or(&scores, DEFAULT_CUSTOMERS)
    };

    let workplace = {
        let mut scores = Vec::new();
        let channels = choices(step4, "communication_channels");
        if !channels.is_empty() {
            scores.push(checkbox_score(&channels, COMMUNICATION_CHANNELS));
        }
        for key in ["google_workspace", "hrms", "microsoft_365"] {
            scores.push(radio_score(step4, key, ADOPTION));
        }
        scores.push(radio_score(step2, "training_frequency", TRAINING));
        average_or(&scores, DEFAULT_WORKPLACE)
    };

    let operations = {
        let mut scores = Vec::new();
        let connectivity = choices(step3, "internet_connectivity");
        if !connectivity.is_empty() {
            scores.push(checkbox_score(&connectivity, CONNECTIVITY));
        }
        for key in ["secure_email", "secure_browsing", "cloud_firewall", "onprem_firewall"] {
            scores.push(radio_score(step3, key, ADOPTION));
        }
        scores.push(radio_score(step3, "iot_usage", IOT));
        scores.push(radio_score(step2, "it_network", IT_NETWORK));
        scores.push(radio_score(step2, "ai_ml_usage", AI_ML_USAGE));
        average_or(&scores, DEFAULT_OPERATIONS)
    };

    let overall = ((customers + workplace + operations) / 3).min(100);

    ScoreCard {
        overall_score: overall,
        digital_customers_score: customers.min(100),
        digital_workplace_score: workplace.min(100),
        digital_operations_score: operations.min(100),
        industry_average: INDUSTRY_AVERAGE,
        message: score_message(overall).to_owned(),
    }
}

/// Headline sentence for an overall score.
pub fn score_message(overall: u32) -> &'static str {
    match overall {
        80.. => {
            "Your business shows excellent digital maturity! You're well-positioned for future growth."
        }
        60..=79 => {
            "Your business has made good progress on its digital journey. There are opportunities to strengthen further."
        }
        40..=59 => {
            "Your business has begun its digital transformation. We can help you accelerate and fill the gaps."
        }
        _ => "There's significant opportunity to digitally transform your business. Let's get started!",
    }
}

/// Short reference such as `PIR-1A2B3C4D` derived from a session id.
pub fn survey_code(session_id: &str) -> String {
    let head: String = session_id
        .chars()
        .filter(|c| *c != '-')
        .take(8)
        .collect();
    format!("{SURVEY_CODE_PREFIX}-{}", head.to_uppercase())
}

/// Checkbox answer as a list; a lone string counts as one choice.
fn choices(data: &FormData, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(FormValue::Choices(c)) => c.clone(),
        Some(FormValue::Text(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Whether `key` holds a real list containing `item`. A lone string does
/// not count.
fn list_contains(data: &FormData, key: &str, item: &str) -> bool {
    matches!(data.get(key), Some(FormValue::Choices(c)) if c.iter().any(|v| v == item))
}

/// Any non-empty answer, whitespace included.
fn is_present(value: &FormValue) -> bool {
    match value {
        FormValue::Flag(b) => *b,
        FormValue::Text(s) => !s.is_empty(),
        FormValue::Choices(c) => !c.is_empty(),
    }
}

fn lookup(table: &[(&str, u32)], value: &str) -> u32 {
    table
        .iter()
        .find(|(k, _)| *k == value)
        .map_or(0, |(_, score)| *score)
}

fn radio_score(data: &FormData, key: &str, table: &[(&str, u32)]) -> u32 {
    data.get(key)
        .and_then(FormValue::as_text)
        .map_or(0, |v| lookup(table, v))
}

fn checkbox_score(values: &[String], table: &[(&str, u32)]) -> u32 {
    let max: u32 = table.iter().map(|(_, s)| s).sum();
    if values.is_empty() || max == 0 {
        return 0;
    }
    let total: u32 = values.iter().map(|v| lookup(table, v)).sum();
    (total * 100 / max).min(100)
}

fn average_or(scores: &[u32], default: u32) -> u32 {
    match u32::try_from(scores.len()) {
        Ok(n) if n > 0 => scores.iter().sum::<u32>() / n,
        _ => default,
    }
}
