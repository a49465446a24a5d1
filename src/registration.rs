//! Patient registration wizard.
//!
//! Three form steps followed by submission:
//! `Step(Identity) → Step(Address) → Step(Medical) → Submitting → Done`.
//!
//! Whether "Next" requires the current step to validate is a policy
//! (`StepGating`); submission always requires the whole record to validate.
//! A failed submission still completes the flow. The outcome carries the
//! error so the caller can choose to proceed optimistically.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::{RegistrationSubmitter, SubmissionError};
use crate::models::{
    ContactType, FormStep, PatientRegistrationData, RegistrationField, RegistrationStatus,
    UserData,
};
use crate::storage::{prefs, LocalStore};
use crate::validation::{self, FieldErrors};

/// Whether advancing past a step requires that step to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepGating {
    /// "Next" always advances; errors surface only at submission.
    #[default]
    Ungated,
    /// "Next" is refused while the current step has errors.
    Gated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum WizardState {
    Step(FormStep),
    Submitting,
    Done,
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardState::Step(step) => write!(f, "step {}", step.number()),
            WizardState::Submitting => f.write_str("submitting"),
            WizardState::Done => f.write_str("done"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Step {step} has {} invalid field(s)", .errors.len())]
    InvalidStep { step: u8, errors: FieldErrors },

    #[error("Registration has {} invalid field(s)", .0.len())]
    Incomplete(FieldErrors),

    #[error("Cannot {action} while at {state}")]
    InvalidTransition {
        action: &'static str,
        state: WizardState,
    },
}

/// What the completed flow hands back to its caller.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub user: UserData,
    pub record: PatientRegistrationData,
    pub submission: Result<(), SubmissionError>,
}

impl RegistrationOutcome {
    pub fn status(&self) -> RegistrationStatus {
        if self.submission.is_ok() {
            RegistrationStatus::Completed
        } else {
            RegistrationStatus::SubmissionFailed
        }
    }

    pub fn persist(&self, store: &LocalStore) -> bool {
        persist_onboarding(store, &self.user, self.status())
    }
}

/// Save the user and registration status for the next visit.
pub fn persist_onboarding(
    store: &LocalStore,
    user: &UserData,
    status: RegistrationStatus,
) -> bool {
    let saved = prefs::save_onboarding(store, user, status);
    if saved {
        tracing::debug!(status = %status, "Onboarding state saved");
    }
    saved
}

/// Derive the chat identity from a registration record: email is the
/// preferred contact, phone otherwise.
pub fn derive_user_data(data: &PatientRegistrationData) -> UserData {
    let email = data.email.trim();
    let (contact, contact_type) = if email.is_empty() {
        (validation::normalize_phone(data.phone.trim()), ContactType::Phone)
    } else {
        (email.to_string(), ContactType::Email)
    };
    UserData {
        name: data.full_name.trim().to_string(),
        contact,
        contact_type,
        is_onboarded: true,
    }
}

/// Holds the wizard in `Submitting` while the submitter runs. Dropped
/// unsettled (the submit future was abandoned, or it failed) it puts the
/// wizard back on the last form step.
struct SubmitGuard<'a> {
    state: &'a mut WizardState,
    settled: bool,
}

impl<'a> SubmitGuard<'a> {
    fn begin(state: &'a mut WizardState) -> Self {
        *state = WizardState::Submitting;
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, state: WizardState) {
        *self.state = state;
        self.settled = true;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.state = WizardState::Step(FormStep::Medical);
        }
    }
}

pub struct RegistrationWizard {
    data: PatientRegistrationData,
    state: WizardState,
    gating: StepGating,
    today: NaiveDate,
}

impl RegistrationWizard {
    pub fn new(gating: StepGating) -> Self {
        Self::with_today(gating, validation::today())
    }

    /// Wizard validating dates against a fixed `today`.
    pub fn with_today(gating: StepGating, today: NaiveDate) -> Self {
        Self {
            data: PatientRegistrationData::default(),
            state: WizardState::Step(FormStep::Identity),
            gating,
            today,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn data(&self) -> &PatientRegistrationData {
        &self.data
    }

    pub fn gating(&self) -> StepGating {
        self.gating
    }

    fn current_step(&self, action: &'static str) -> Result<FormStep, RegistrationError> {
        match self.state {
            WizardState::Step(step) => Ok(step),
            state => Err(RegistrationError::InvalidTransition { action, state }),
        }
    }

    /// Update one field. Only allowed before submission.
    pub fn set_field(
        &mut self,
        field: RegistrationField,
        value: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        self.current_step("edit")?;
        self.data.set(field, value);
        Ok(())
    }

    /// Errors for the step currently shown (empty outside the form steps).
    pub fn current_errors(&self) -> FieldErrors {
        match self.state {
            WizardState::Step(step) => {
                validation::validate_registration_step(step, &self.data, self.today)
            }
            _ => FieldErrors::new(),
        }
    }

    pub fn next(&mut self) -> Result<FormStep, RegistrationError> {
        let step = self.current_step("advance")?;
        let target = match step {
            FormStep::Identity => FormStep::Address,
            FormStep::Address => FormStep::Medical,
            FormStep::Medical => {
                return Err(RegistrationError::InvalidTransition {
                    action: "advance",
                    state: self.state,
                })
            }
        };

        if self.gating == StepGating::Gated {
            let errors = validation::validate_registration_step(step, &self.data, self.today);
            if !errors.is_empty() {
                return Err(RegistrationError::InvalidStep {
                    step: step.number(),
                    errors,
                });
            }
        }

        self.state = WizardState::Step(target);
        Ok(target)
    }

    pub fn previous(&mut self) -> Result<FormStep, RegistrationError> {
        let target = match self.current_step("go back")? {
            FormStep::Identity => {
                return Err(RegistrationError::InvalidTransition {
                    action: "go back",
                    state: self.state,
                })
            }
            FormStep::Address => FormStep::Identity,
            FormStep::Medical => FormStep::Address,
        };
        self.state = WizardState::Step(target);
        Ok(target)
    }

    /// Validate the whole record, stamp it, and hand it to `submitter` once.
    ///
    /// Validation errors keep the wizard on the last step. Once validation
    /// passes the flow always reaches `Done`, whatever the submitter returns.
    pub async fn submit<S: RegistrationSubmitter>(
        &mut self,
        submitter: &S,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if self.current_step("submit")? != FormStep::Medical {
            return Err(RegistrationError::InvalidTransition {
                action: "submit",
                state: self.state,
            });
        }

        let errors = validation::validate_complete_registration(&self.data, self.today);
        if !errors.is_empty() {
            tracing::debug!(
                error_count = errors.len(),
                "Registration submit blocked by validation"
            );
            return Err(RegistrationError::Incomplete(errors));
        }

        let guard = SubmitGuard::begin(&mut self.state);
        let outcome = submit_record(self.data.clone(), submitter, self.today).await?;
        guard.settle(WizardState::Done);
        self.data = outcome.record.clone();
        Ok(outcome)
    }
}

/// Validate a complete record, stamp it, and deliver it once.
///
/// Delivery failures are reported in the outcome, never as an error.
pub async fn submit_record<S: RegistrationSubmitter>(
    mut data: PatientRegistrationData,
    submitter: &S,
    today: NaiveDate,
) -> Result<RegistrationOutcome, RegistrationError> {
    let errors = validation::validate_complete_registration(&data, today);
    if !errors.is_empty() {
        return Err(RegistrationError::Incomplete(errors));
    }

    data.submitted_at = Some(Utc::now().to_rfc3339());

    let submission = submitter.submit(&data).await;
    match &submission {
        Ok(()) => tracing::info!("Patient registration submitted"),
        Err(e) => tracing::warn!(error = %e, "Patient registration not delivered, continuing"),
    }

    Ok(RegistrationOutcome {
        user: derive_user_data(&data),
        record: data,
        submission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::gateway::GatewayError;

    struct RecordingSubmitter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingSubmitter {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl RegistrationSubmitter for RecordingSubmitter {
        async fn submit(&self, data: &PatientRegistrationData) -> Result<(), SubmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(data.submitted_at.is_some());
            if self.fail {
                Err(GatewayError::Connection("connection refused".into()).into())
            } else {
                Ok(())
            }
        }
    }

    /// Never answers.
    struct StalledSubmitter;

    impl RegistrationSubmitter for StalledSubmitter {
        async fn submit(&self, _data: &PatientRegistrationData) -> Result<(), SubmissionError> {
            std::future::pending().await
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn fill_valid(wizard: &mut RegistrationWizard) {
        use RegistrationField::*;
        wizard.set_field(FullName, "Rohan Gupta").unwrap();
        wizard.set_field(Phone, "+91 91234 56789").unwrap();
        wizard.set_field(DateOfBirth, "1988-07-01").unwrap();
        wizard.set_field(Address, "221 Park Street, Kolkata 700016").unwrap();
    }

    #[test]
    fn ungated_next_advances_despite_errors() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        assert!(!wizard.current_errors().is_empty());
        assert_eq!(wizard.next().unwrap(), FormStep::Address);
        assert_eq!(wizard.next().unwrap(), FormStep::Medical);
        assert_eq!(wizard.state(), WizardState::Step(FormStep::Medical));
    }

    #[test]
    fn gated_next_refuses_invalid_step() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Gated, today());
        let err = wizard.next().unwrap_err();
        match err {
            RegistrationError::InvalidStep { step, errors } => {
                assert_eq!(step, 1);
                assert!(errors.contains_key(&RegistrationField::FullName));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(wizard.state(), WizardState::Step(FormStep::Identity));

        fill_valid(&mut wizard);
        assert_eq!(wizard.next().unwrap(), FormStep::Address);
        assert_eq!(wizard.next().unwrap(), FormStep::Medical);
    }

    #[test]
    fn previous_allowed_except_from_first_step() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        assert!(matches!(
            wizard.previous(),
            Err(RegistrationError::InvalidTransition { .. })
        ));
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.previous().unwrap(), FormStep::Address);
        assert_eq!(wizard.previous().unwrap(), FormStep::Identity);
    }

    #[test]
    fn next_from_last_step_is_invalid() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert!(matches!(
            wizard.next(),
            Err(RegistrationError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn submit_requires_last_step() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        fill_valid(&mut wizard);
        let submitter = RecordingSubmitter::new(false);
        assert!(matches!(
            wizard.submit(&submitter).await,
            Err(RegistrationError::InvalidTransition { .. })
        ));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_blocked_until_every_step_validates() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        wizard.next().unwrap();
        wizard.next().unwrap();

        let submitter = RecordingSubmitter::new(false);
        let err = wizard.submit(&submitter).await.unwrap_err();
        let RegistrationError::Incomplete(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key(&RegistrationField::FullName));
        assert!(errors.contains_key(&RegistrationField::Address));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wizard.state(), WizardState::Step(FormStep::Medical));
    }

    #[tokio::test]
    async fn successful_submission_produces_user() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Gated, today());
        fill_valid(&mut wizard);
        wizard
            .set_field(RegistrationField::Email, "rohan@example.com")
            .unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();

        let submitter = RecordingSubmitter::new(false);
        let outcome = wizard.submit(&submitter).await.unwrap();
        assert!(outcome.submission.is_ok());
        assert_eq!(outcome.status(), RegistrationStatus::Completed);
        assert_eq!(outcome.user.name, "Rohan Gupta");
        assert_eq!(outcome.user.contact, "rohan@example.com");
        assert_eq!(outcome.user.contact_type, ContactType::Email);
        assert!(outcome.user.is_onboarded);
        assert!(outcome.record.submitted_at.is_some());
        assert_eq!(wizard.state(), WizardState::Done);
    }

    #[tokio::test]
    async fn failed_submission_still_completes_with_user() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        fill_valid(&mut wizard);
        wizard.next().unwrap();
        wizard.next().unwrap();

        let submitter = RecordingSubmitter::new(true);
        let outcome = wizard.submit(&submitter).await.unwrap();
        assert!(outcome.submission.is_err());
        assert_eq!(outcome.status(), RegistrationStatus::SubmissionFailed);
        assert_eq!(outcome.user.name, "Rohan Gupta");
        assert_eq!(outcome.user.contact, "+919123456789");
        assert_eq!(outcome.user.contact_type, ContactType::Phone);
        assert_eq!(wizard.state(), WizardState::Done);

        let store = LocalStore::memory();
        assert!(outcome.persist(&store));
        assert_eq!(prefs::load_user_data(&store), Some(outcome.user.clone()));
        assert_eq!(
            prefs::load_registration_status(&store),
            RegistrationStatus::SubmissionFailed
        );
    }

    #[tokio::test]
    async fn record_is_frozen_after_submission() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        fill_valid(&mut wizard);
        wizard.next().unwrap();
        wizard.next().unwrap();
        let submitter = RecordingSubmitter::new(false);
        wizard.submit(&submitter).await.unwrap();

        assert!(wizard
            .set_field(RegistrationField::FullName, "Someone Else")
            .is_err());
        assert!(wizard.submit(&submitter).await.is_err());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
        assert!(wizard.current_errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submit_returns_to_last_step() {
        let mut wizard = RegistrationWizard::with_today(StepGating::Ungated, today());
        fill_valid(&mut wizard);
        wizard.next().unwrap();
        wizard.next().unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_secs(30), wizard.submit(&StalledSubmitter)).await;
        assert!(abandoned.is_err());
        assert_eq!(wizard.state(), WizardState::Step(FormStep::Medical));

        assert_eq!(wizard.previous().unwrap(), FormStep::Address);
        wizard
            .set_field(RegistrationField::Email, "rohan@example.com")
            .unwrap();
        wizard.next().unwrap();

        let submitter = RecordingSubmitter::new(false);
        let outcome = wizard.submit(&submitter).await.unwrap();
        assert!(outcome.submission.is_ok());
        assert_eq!(wizard.state(), WizardState::Done);
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_record_rejects_incomplete_data() {
        let submitter = RecordingSubmitter::new(false);
        let result = submit_record(PatientRegistrationData::default(), &submitter, today()).await;
        assert!(matches!(result, Err(RegistrationError::Incomplete(_))));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wizard_state_display() {
        assert_eq!(WizardState::Step(FormStep::Address).to_string(), "step 2");
        assert_eq!(WizardState::Done.to_string(), "done");
    }
}
