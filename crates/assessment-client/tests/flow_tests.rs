//! End-to-end tests: the client and the phase controller against a live
//! assessment server on an ephemeral port.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::extract::Query;
use axum::routing::get;

use assessment_client::{AssessmentClient, ClientConfig, ClientError, NominatimGeocoder};
use assessment_core::api::{Registration, VerifyOtpRequest};
use assessment_core::schema::{FieldInput, QuestionKind, StepDefinition, StepLayout};
use assessment_core::{LocationLookup, Phase, PhaseController, StepNumber};
use assessment_server::config::ServerConfig;
use assessment_server::delivery::Outbox;
use assessment_server::routes::build_router;
use assessment_server::state::AppState;

struct Server {
    base_url: String,
    outbox: Arc<Outbox>,
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_server() -> Server {
    let config = ServerConfig::default();
    let outbox = Arc::new(Outbox::new());
    let state = Arc::new(AppState::with_delivery(&config, outbox.clone()));
    let base_url = serve(build_router(state, &config)).await;
    Server { base_url, outbox }
}

fn client(base_url: &str) -> AssessmentClient {
    AssessmentClient::with_config(ClientConfig {
        base_url: base_url.to_owned(),
        ..ClientConfig::default()
    })
    .unwrap()
}

fn registration() -> Registration {
    Registration {
        name: "Asha".to_owned(),
        phone: "9999999999".to_owned(),
        email: "asha@example.com".to_owned(),
        terms_accepted: true,
    }
}

/// Answer every required input with its first option, or a fixed text.
fn fill_step(flow: &mut PhaseController, definition: &StepDefinition) {
    match &definition.layout {
        StepLayout::Fields(fields) => {
            for field in fields.iter().filter(|f| f.required) {
                match &field.input {
                    FieldInput::Text => flow.set_answer(&field.key, "560001").unwrap(),
                    FieldInput::Dropdown { options } => {
                        flow.set_answer(&field.key, options[0].value.as_str()).unwrap();
                    }
                }
            }
        }
        StepLayout::Questions(questions) => {
            for question in questions.iter().filter(|q| q.required) {
                let first = question.kind.options()[0].value.as_str();
                match &question.kind {
                    QuestionKind::Checkbox { .. } => {
                        flow.toggle_choice(&question.key, first).unwrap();
                    }
                    QuestionKind::Radio { .. } | QuestionKind::Dropdown { .. } => {
                        flow.set_answer(&question.key, first).unwrap();
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn controller_completes_the_assessment() {
    let server = spawn_server().await;
    let api = client(&server.base_url);
    let mut flow = PhaseController::new(Arc::new(api.clone()));

    flow.start(&registration()).await.unwrap();
    let session_id = flow.session_id().unwrap().clone();
    assert!(flow.otp_remaining().is_some_and(|s| s > 290));

    let otp = server.outbox.latest(session_id.as_str()).unwrap();
    flow.verify_otp(&otp).await.unwrap();
    assert_eq!(flow.current_step(), StepNumber::new(1));
    assert_eq!(flow.progress().percent(), 0);

    let title = flow.step_definition().unwrap().title.clone().unwrap();
    assert!(title.contains("Asha"));

    for expected_next in 2..=5 {
        let definition = flow.step_definition().unwrap().clone();
        fill_step(&mut flow, &definition);
        assert!(flow.is_step_complete());
        flow.submit_step().await.unwrap();

        if expected_next <= 4 {
            assert_eq!(flow.current_step(), StepNumber::new(expected_next));
            assert!(flow.step_definition().is_some(), "step {expected_next} loaded");
        }
    }

    assert!(matches!(flow.phase(), Phase::Complete { .. }));
    assert_eq!(flow.progress().percent(), 100);

    let summary = api.session_summary(&session_id).await.unwrap();
    assert!(summary.completed);
    assert_eq!(summary.progress_percent, 100);
    assert!(summary.scores.is_some());
}

#[tokio::test]
async fn wrong_otp_surfaces_server_message() {
    let server = spawn_server().await;
    let mut flow = PhaseController::new(Arc::new(client(&server.base_url)));

    flow.start(&registration()).await.unwrap();
    let session_id = flow.session_id().unwrap().clone();
    let otp = server.outbox.latest(session_id.as_str()).unwrap();
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    assert!(flow.verify_otp(wrong).await.is_err());
    assert_eq!(flow.last_error(), Some("Invalid OTP"));
    assert!(matches!(flow.phase(), Phase::Otp { .. }));

    flow.verify_otp(&otp).await.unwrap();
    assert!(matches!(flow.phase(), Phase::Steps(_)));
}

#[tokio::test]
async fn rejected_registration_maps_to_api_error() {
    let server = spawn_server().await;
    let api = client(&server.base_url);

    let mut reg = registration();
    reg.terms_accepted = false;
    let err = api.start(&reg).await.unwrap_err();

    assert!(matches!(
        &err,
        ClientError::Api { status_code: 400, message }
            if message == "You must accept the terms and conditions"
    ));
}

#[tokio::test]
async fn locked_steps_are_refused() {
    let server = spawn_server().await;
    let api = client(&server.base_url);

    let started = api.start(&registration()).await.unwrap();
    let otp = server.outbox.latest(started.session_id.as_str()).unwrap();
    api.verify_otp(&VerifyOtpRequest {
        session_id: started.session_id.clone(),
        otp,
    })
    .await
    .unwrap();

    let err = api
        .questions(&started.session_id, StepNumber::new(3).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status_code: 400, .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let mut flow = PhaseController::new(Arc::new(client("http://127.0.0.1:9")));

    assert!(flow.start(&registration()).await.is_err());
    assert_eq!(flow.last_error(), Some("Failed to start"));
    assert!(matches!(flow.phase(), Phase::PreRegistration));
}

// ── Reverse geocoding ────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ReverseQuery {
    lat: f64,
    format: String,
}

async fn stub_geocoder() -> String {
    let router = Router::new().route(
        "/reverse",
        get(|Query(q): Query<ReverseQuery>| async move {
            assert_eq!(q.format, "json");
            if q.lat > 0.0 {
                axum::Json(serde_json::json!({"address": {"postcode": " 560001 "}}))
            } else {
                axum::Json(serde_json::json!({"address": {}}))
            }
        }),
    );
    serve(router).await
}

#[tokio::test]
async fn geocoder_reads_postcode() {
    let geocoder = NominatimGeocoder::new(&stub_geocoder().await).unwrap();

    assert_eq!(
        geocoder.postcode(12.97, 77.59).await.as_deref(),
        Some("560001")
    );
    assert_eq!(geocoder.postcode(-1.0, 0.0).await, None);
}

#[tokio::test]
async fn geocoder_failure_is_silent() {
    let geocoder = NominatimGeocoder::new("http://127.0.0.1:9").unwrap();
    assert_eq!(geocoder.postcode(12.97, 77.59).await, None);
}

#[tokio::test]
async fn detect_location_fills_pincode() {
    let server = spawn_server().await;
    let geocoder = NominatimGeocoder::new(&stub_geocoder().await).unwrap();
    let mut flow = PhaseController::new(Arc::new(client(&server.base_url)));

    flow.start(&registration()).await.unwrap();
    let id = flow.session_id().unwrap().as_str().to_owned();
    flow.verify_otp(&server.outbox.latest(&id).unwrap())
        .await
        .unwrap();

    let filled = flow
        .detect_location("pincode", 12.97, 77.59, &geocoder)
        .await
        .unwrap();
    assert!(filled);
    assert_eq!(
        flow.answers()
            .unwrap()
            .get("pincode")
            .and_then(|v| v.as_text()),
        Some("560001")
    );
}
