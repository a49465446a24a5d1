//! Theme preference endpoints (`GET`/`PUT /api/preferences/theme`), kept per
//! visitor.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, VisitorContext};
use crate::models::Theme;
use crate::storage::prefs;

#[derive(Serialize, Deserialize)]
pub struct ThemePreference {
    pub theme: Theme,
}

pub async fn get_theme(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Json<ThemePreference> {
    Json(ThemePreference {
        theme: prefs::load_theme(&ctx.visitor_store(&visitor.session_id)),
    })
}

pub async fn set_theme(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
    Json(pref): Json<ThemePreference>,
) -> Result<Json<ThemePreference>, ApiError> {
    if !prefs::save_theme(&ctx.visitor_store(&visitor.session_id), pref.theme) {
        return Err(ApiError::Internal("theme preference not saved".into()));
    }
    Ok(Json(pref))
}
