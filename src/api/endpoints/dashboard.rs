//! `GET /api/dashboard`: booking stats and recent activity.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::bookings::{self, BookingRecord};
use crate::dashboard::{self, ActivityItem, DashboardStats};

const DEFAULT_FEED_LIMIT: usize = 10;
const MAX_FEED_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub limit: Option<usize>,
    /// Filters the upcoming list by name, phone or service.
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub upcoming: Vec<BookingRecord>,
    pub activity: Vec<ActivityItem>,
}

pub async fn overview(
    State(ctx): State<ApiContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let payload = ctx.gateway.fetch_booking_rows().await?;
    let records = bookings::parse_booking_rows(&payload)?;
    let today = crate::validation::today();
    let now = Local::now().naive_local();
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT);

    let upcoming_records: Vec<BookingRecord> = bookings::upcoming(&records, today)
        .into_iter()
        .cloned()
        .collect();
    let upcoming = match query.q.as_deref() {
        Some(q) => bookings::search(&upcoming_records, q)
            .into_iter()
            .cloned()
            .collect(),
        None => upcoming_records,
    };

    let mut activity = dashboard::activity_feed(&records, now, limit);
    activity.extend(ctx.recent_registrations());
    dashboard::sort_and_truncate(&mut activity, now, limit);

    tracing::debug!(records = records.len(), "Dashboard assembled");

    Ok(Json(DashboardResponse {
        stats: DashboardStats::from_records(&records, today),
        upcoming,
        activity,
    }))
}
