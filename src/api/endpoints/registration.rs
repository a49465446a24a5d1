//! Patient registration endpoints.
//!
//! - `POST /api/registration`: one-shot submission of the full form
//! - `GET /api/registration/wizard`: the visitor's step-by-step form
//! - `PUT /api/registration/wizard/fields`: update fields on the current step
//! - `POST /api/registration/wizard/next`, `/previous`: move between steps
//! - `POST /api/registration/wizard/submit`: validate and deliver
//!
//! Whether "next" requires the step to validate follows
//! `AppConfig::step_gating`. A completed registration restarts the visitor's
//! chat so the welcome greets the new user by name.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Local;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, VisitorContext};
use crate::dashboard::ActivityItem;
use crate::models::{PatientRegistrationData, RegistrationField, RegistrationStatus, UserData};
use crate::registration::{self, RegistrationOutcome, RegistrationWizard, StepGating, WizardState};
use crate::validation::FieldErrors;

#[derive(Serialize)]
pub struct RegistrationResponse {
    pub status: RegistrationStatus,
    pub user: UserData,
    /// Whether the clinic's webhook accepted the record.
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RegistrationOutcome> for RegistrationResponse {
    fn from(outcome: RegistrationOutcome) -> Self {
        Self {
            status: outcome.status(),
            delivered: outcome.submission.is_ok(),
            error: outcome.submission.as_ref().err().map(|e| e.to_string()),
            user: outcome.user,
        }
    }
}

#[derive(Serialize)]
pub struct WizardResponse {
    pub gating: StepGating,
    pub progress: WizardState,
    pub data: PatientRegistrationData,
    /// Problems on the step currently shown.
    pub errors: FieldErrors,
}

impl From<&RegistrationWizard> for WizardResponse {
    fn from(wizard: &RegistrationWizard) -> Self {
        Self {
            gating: wizard.gating(),
            progress: wizard.state(),
            data: wizard.data().clone(),
            errors: wizard.current_errors(),
        }
    }
}

/// Save onboarding for the visitor, greet them in a fresh chat, and log the
/// registration for the dashboard.
fn complete_onboarding(
    ctx: &ApiContext,
    visitor: &VisitorContext,
    outcome: &RegistrationOutcome,
) -> Result<(), ApiError> {
    if !outcome.persist(&ctx.visitor_store(&visitor.session_id)) {
        tracing::warn!(session_id = %visitor.session_id, "Onboarding state not persisted");
    }
    ctx.start_chat_for(&visitor.session_id, outcome.user.clone())?;
    ctx.record_registration(ActivityItem::patient_registered(
        &outcome.user.name,
        Local::now().naive_local(),
    ));
    Ok(())
}

/// Validates the record (400 with field errors), then submits it. A failed
/// delivery is reported in the body; onboarding proceeds either way.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
    Json(data): Json<PatientRegistrationData>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let today = crate::validation::today();
    let outcome = registration::submit_record(data, ctx.gateway.as_ref(), today).await?;
    complete_onboarding(&ctx, &visitor, &outcome)?;
    Ok(Json(outcome.into()))
}

// ═══════════════════════════════════════════
// Step-by-step wizard
// ═══════════════════════════════════════════

/// `GET /api/registration/wizard`
pub async fn wizard_state(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = ctx.wizard(&visitor.session_id)?;
    let wizard = wizard.lock().await;
    Ok(Json(WizardResponse::from(&*wizard)))
}

/// `PUT /api/registration/wizard/fields`
pub async fn wizard_fields(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
    Json(fields): Json<BTreeMap<RegistrationField, String>>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = ctx.wizard(&visitor.session_id)?;
    let mut wizard = wizard.lock().await;
    for (field, value) in fields {
        wizard.set_field(field, value)?;
    }
    Ok(Json(WizardResponse::from(&*wizard)))
}

/// `POST /api/registration/wizard/next`. Gated wizards answer 400 with the
/// step's field errors.
pub async fn wizard_next(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = ctx.wizard(&visitor.session_id)?;
    let mut wizard = wizard.lock().await;
    wizard.next()?;
    Ok(Json(WizardResponse::from(&*wizard)))
}

/// `POST /api/registration/wizard/previous`
pub async fn wizard_previous(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<WizardResponse>, ApiError> {
    let wizard = ctx.wizard(&visitor.session_id)?;
    let mut wizard = wizard.lock().await;
    wizard.previous()?;
    Ok(Json(WizardResponse::from(&*wizard)))
}

/// `POST /api/registration/wizard/submit`. Only from the last step.
pub async fn wizard_submit(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let wizard = ctx.wizard(&visitor.session_id)?;
    let mut wizard = wizard.lock().await;
    let outcome = wizard.submit(ctx.gateway.as_ref()).await?;
    drop(wizard);

    complete_onboarding(&ctx, &visitor, &outcome)?;
    Ok(Json(outcome.into()))
}
