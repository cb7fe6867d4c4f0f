//! Core library for the digital-maturity assessment.
//!
//! Contains the phase controller that drives an assessment from
//! pre-registration through OTP verification and four question steps, the
//! step schema and answer model, the OTP countdown, the service contract
//! shared by the client and the server, and report-card scoring. This crate
//! performs no I/O of its own; transports implement [`api::AssessmentApi`].

pub mod api;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod form;
pub mod schema;
pub mod scoring;
pub mod types;

pub use api::{AssessmentApi, LocationLookup, Registration};
pub use controller::{Phase, PhaseController, StepState};
pub use error::{ApiError, FlowError};
pub use form::{FormData, FormValue};
pub use schema::StepDefinition;
pub use types::{Progress, SessionId, StepNumber};
