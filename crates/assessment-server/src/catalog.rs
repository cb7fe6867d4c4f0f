//! The question catalog served on `GET /api/assessment/questions/{step}/`.
//!
//! Step 1 collects the company profile; steps 2–4 ask about digital
//! strategy, operations, and workplace. Option values line up with the
//! weighting tables in [`assessment_core::scoring`].

use assessment_core::schema::{
    ChoiceOption, Field, FieldInput, Question, QuestionKind, StepDefinition, StepLayout,
};
use assessment_core::types::StepNumber;

/// Placeholder in the step-1 title replaced by the registrant's name.
const NAME_PLACEHOLDER: &str = "{name}";

/// The four step definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: Vec<StepDefinition>,
}

impl Catalog {
    /// The standard digital-maturity questionnaire.
    pub fn standard() -> Self {
        Self {
            steps: vec![profile(), strategy(), operations(), workplace()],
        }
    }

    /// Definition of `step` personalised for `name`, or `None` for a step
    /// outside `1..=4`.
    pub fn definition(&self, step: StepNumber, name: &str) -> Option<StepDefinition> {
        if step.is_complete() {
            return None;
        }
        let mut def = self.steps.get(usize::from(step.get()) - 1)?.clone();
        if let Some(title) = def.title.as_mut() {
            *title = title.replace(NAME_PLACEHOLDER, name);
        }
        Some(def)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ── Builders ─────────────────────────────────────────────────────────

fn options(pairs: &[(&str, &str)]) -> Vec<ChoiceOption> {
    pairs.iter().map(|(v, l)| ChoiceOption::new(*v, *l)).collect()
}

fn text_field(key: &str, label: &str) -> Field {
    Field {
        key: key.to_owned(),
        label: label.to_owned(),
        placeholder: Some(label.to_owned()),
        required: true,
        detect_location: false,
        input: FieldInput::Text,
    }
}

fn dropdown_field(key: &str, label: &str, placeholder: &str, choices: &[(&str, &str)]) -> Field {
    Field {
        key: key.to_owned(),
        label: label.to_owned(),
        placeholder: Some(placeholder.to_owned()),
        required: true,
        detect_location: false,
        input: FieldInput::Dropdown {
            options: options(choices),
        },
    }
}

fn question(key: &str, text: &str, kind: QuestionKind) -> Question {
    Question {
        key: key.to_owned(),
        text: text.to_owned(),
        hint: None,
        sub_question: None,
        required: true,
        kind,
    }
}

fn radio(key: &str, text: &str, choices: &[(&str, &str)]) -> Question {
    question(key, text, QuestionKind::Radio { options: options(choices) })
}

fn checkbox(key: &str, text: &str, options: Vec<ChoiceOption>) -> Question {
    question(key, text, QuestionKind::Checkbox { options })
}

fn dropdown(key: &str, text: &str, choices: &[(&str, &str)]) -> Question {
    question(key, text, QuestionKind::Dropdown { options: options(choices) })
}

fn step(title: &str, layout: StepLayout) -> StepDefinition {
    StepDefinition {
        title: Some(title.to_owned()),
        layout,
    }
}

const MULTI_SELECT_HINT: &str = "(You can select more than one option)";

const ADOPTION: &[(&str, &str)] = &[
    ("no_plans", "No plans"),
    ("planned", "Being planned"),
    ("implementing", "Being implemented"),
    ("in_use", "Already in use"),
];

// ── Steps ────────────────────────────────────────────────────────────

fn profile() -> StepDefinition {
    let mut pincode = text_field("pincode", "pincode");
    pincode.detect_location = true;

    step(
        "hello! {name}, please fill out your details",
        StepLayout::Fields(vec![
            text_field("company_name", "company name"),
            dropdown_field(
                "role",
                "select role",
                "select role",
                &[
                    ("owner", "Owner"),
                    ("manager", "Manager"),
                    ("director", "Director"),
                    ("executive", "Executive"),
                    ("other", "Other"),
                ],
            ),
            dropdown_field(
                "industry",
                "industry",
                "industry",
                &[
                    ("it", "IT/Software"),
                    ("finance", "Finance"),
                    ("healthcare", "Healthcare"),
                    ("retail", "Retail"),
                    ("manufacturing", "Manufacturing"),
                    ("other", "Other"),
                ],
            ),
            dropdown_field(
                "core_business",
                "core business",
                "core business",
                &[("b2b", "B2B"), ("b2c", "B2C"), ("both", "Both"), ("other", "Other")],
            ),
            dropdown_field(
                "turnover",
                "indicative turnover (inr)",
                "indicative turnover",
                &[
                    ("0-10", "Under 10 Lakhs"),
                    ("10-50", "10 Lakhs - 50 Lakhs"),
                    ("50-100", "50 Lakhs - 1 Crore"),
                    ("1-10", "1 Crore - 10 Crore"),
                    ("10+", "Above 10 Crore"),
                ],
            ),
            pincode,
            dropdown_field(
                "employees",
                "number of employees",
                "number of employees",
                &[
                    ("1-10", "1-10"),
                    ("11-50", "11-50"),
                    ("51-100", "51-100"),
                    ("101-500", "101-500"),
                    ("500+", "500+"),
                ],
            ),
            dropdown_field(
                "office_locations",
                "no. of office locations",
                "No. of office locations",
                &[("1", "1"), ("2-5", "2-5"), ("6-10", "6-10"), ("10+", "10+")],
            ),
            dropdown_field(
                "age",
                "select age",
                "select age",
                &[
                    ("18-25", "18-25"),
                    ("26-35", "26-35"),
                    ("36-45", "36-45"),
                    ("46-55", "46-55"),
                    ("55+", "55+"),
                ],
            ),
            dropdown_field(
                "gender",
                "select gender",
                "select gender",
                &[
                    ("male", "Male"),
                    ("female", "Female"),
                    ("other", "Other"),
                    ("prefer_not", "Prefer not to say"),
                ],
            ),
        ]),
    )
}

fn strategy() -> StepDefinition {
    let mut ai_processes = options(&[
        ("customer", "In customer acquisition, engagement and servicing"),
        ("operations", "In business operations and process optimization/automation"),
        ("productivity", "To enhance workplace productivity and collaboration"),
    ]);
    ai_processes.push(ChoiceOption::new("others", "Others").with_other());

    step(
        "let's understand your digital strategy & management style...",
        StepLayout::Questions(vec![
            checkbox(
                "digital_priorities",
                "What are the top digital priorities for your business in the present year? *",
                options(&[
                    ("channels", "Digitalizing channels of acquiring and engaging customers"),
                    (
                        "operations",
                        "Digitalizing business operations, processes and technical infrastructure",
                    ),
                    ("office", "Digitalizing office operations to improve employee productivity"),
                    ("none", "None of the above"),
                ]),
            ),
            radio(
                "ai_ml_usage",
                "Do you use AI or ML in any of your business processes? *",
                &[
                    ("no_plans", "No plans"),
                    ("planning", "In planning"),
                    ("implementation", "In implementation"),
                    ("adopted", "Already adopted"),
                ],
            ),
            checkbox(
                "ai_ml_processes",
                "In which of the processes do you use AI or ML in your organization? *",
                ai_processes,
            ),
            checkbox(
                "selling_channels",
                "Which channels do you use for selling your products & services? *",
                options(&[
                    ("offline", "Offline channels"),
                    ("mobile", "Mobile applications"),
                    ("website", "Own website"),
                    ("ecommerce", "Other e-commerce platforms"),
                    ("social", "Social media marketplace"),
                    ("whatsapp", "WhatsApp Business"),
                ]),
            ),
            dropdown(
                "it_network",
                "How is your IT Network setup managed? *",
                &[
                    ("in_house", "In-house"),
                    ("managed", "Managed service provider"),
                    ("hybrid", "Hybrid"),
                    ("outsourced", "Fully outsourced"),
                ],
            ),
            radio(
                "training_frequency",
                "How often is training provided for your employees to improve their digital skills? *",
                &[
                    ("never", "Never"),
                    ("rarely", "Rarely"),
                    ("sometimes", "Sometimes"),
                    ("regularly", "Regularly"),
                ],
            ),
        ]),
    )
}

fn operations() -> StepDefinition {
    let connectivity = Question {
        hint: Some(MULTI_SELECT_HINT.to_owned()),
        ..checkbox(
            "internet_connectivity",
            "What types of internet connectivity are available across your office locations? *",
            options(&[
                ("ill", "Internet Leased Lines (ILL)"),
                ("sdwan", "Hybrid SD-WAN"),
                ("wifi", "Enterprise Wi-Fi"),
                ("broadband", "Broadband"),
                ("none", "None of the above"),
            ]),
        )
    };
    let secure_email = Question {
        sub_question: Some("Secure Email Communication *".to_owned()),
        ..radio(
            "secure_email",
            "What is the usage status of the following digital security measure to protect your business? *",
            ADOPTION,
        )
    };
    let iot = Question {
        hint: Some(
            "(IoT connects everyday devices to the internet, enabling smarter functions such as \
             tracking and monitoring assets like machinery, inventory, and personnel across \
             warehouses, shops, and plants)"
                .to_owned(),
        ),
        ..dropdown(
            "iot_usage",
            "Do you use IoT (Internet of Things) in your business operations? *",
            &[
                ("no", "No"),
                ("planning", "Planning to use"),
                ("limited", "Limited use"),
                ("extensive", "Extensive use"),
            ],
        )
    };

    step(
        "tell us about your company's digital operations...",
        StepLayout::Questions(vec![
            connectivity,
            secure_email,
            radio("secure_browsing", "Secure Internet Browsing Activity *", ADOPTION),
            radio("cloud_firewall", "Cloud Firewall *", ADOPTION),
            radio("onprem_firewall", "Managed On Premise Firewall *", ADOPTION),
            iot,
        ]),
    )
}

fn workplace() -> StepDefinition {
    let channels = Question {
        hint: Some(MULTI_SELECT_HINT.to_owned()),
        ..checkbox(
            "communication_channels",
            "What communication channels do you use to make sure your team can always communicate digitally? *",
            options(&[
                ("intranet", "Corporate intranet platform (workplace)"),
                ("email", "Emails"),
                ("whatsapp", "WhatsApp Business account"),
                ("mobile", "Company-paid mobile postpaid connections"),
            ]),
        )
    };
    let google = Question {
        sub_question: Some("Google Workspace *".to_owned()),
        ..radio(
            "google_workspace",
            "Do you use any of the following employee productivity and automation application? *",
            ADOPTION,
        )
    };

    step(
        "let's know more about your company's digital workspace...",
        StepLayout::Questions(vec![
            channels,
            google,
            radio("hrms", "HRMS For Automating HR Processes *", ADOPTION),
            radio("microsoft_365", "Microsoft 365 *", ADOPTION),
        ]),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use assessment_core::types::STEP_COUNT;

    use super::*;

    fn at(n: u32) -> StepNumber {
        StepNumber::new(n).unwrap()
    }

    #[test]
    fn has_one_definition_per_step() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), usize::from(STEP_COUNT));
        assert!(catalog.definition(StepNumber::COMPLETE, "A").is_none());
    }

    #[test]
    fn profile_is_personalised_and_field_based() {
        let def = Catalog::standard().definition(at(1), "Asha").unwrap();
        assert_eq!(def.title.as_deref(), Some("hello! Asha, please fill out your details"));
        assert!(def.is_field_based());
        assert_eq!(def.required_keys().len(), 10);
        assert!(def.field("pincode").unwrap().detect_location);
    }

    #[test]
    fn question_steps_have_expected_sizes() {
        let catalog = Catalog::standard();
        let sizes: Vec<usize> = (2..=4)
            .map(|n| catalog.definition(at(n), "A").unwrap().required_keys().len())
            .collect();
        assert_eq!(sizes, vec![6, 6, 4]);
    }

    #[test]
    fn ai_processes_invite_other_text() {
        let def = Catalog::standard().definition(at(2), "A").unwrap();
        assert_eq!(
            def.question("ai_ml_processes").unwrap().other_key().as_deref(),
            Some("ai_ml_processes_other")
        );
        assert!(def.answer_keys().contains(&"ai_ml_processes_other".to_owned()));
    }
}
