//! Appointment rows read from the clinic's spreadsheet.
//!
//! The values API returns `{"values": [[header...], [row...], ...]}`. The
//! header row is matched case-insensitively; rows missing a required column or
//! carrying an unparseable date or status are skipped with a warning. An
//! optional `Timestamp` column records when the row was logged.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;

use crate::models::BookingStatus;

#[derive(Error, Debug)]
pub enum BookingDataError {
    #[error("Booking data has no \"values\" array")]
    MissingValues,

    #[error("Booking data has no header row")]
    MissingHeader,

    #[error("Booking header lacks required column: {0}")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: String,
    pub patient_name: String,
    pub phone: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: BookingStatus,
    /// When the row was written to the sheet, if the sheet records it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_at: Option<NaiveDateTime>,
}

impl BookingRecord {
    /// Appointment date combined with its slot time.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(parse_slot_time(&self.time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Id,
    PatientName,
    Phone,
    Service,
    Date,
    Time,
    Status,
    LoggedAt,
}

impl Column {
    const REQUIRED: [Column; 3] = [Column::PatientName, Column::Date, Column::Status];

    fn from_header(header: &str) -> Option<Self> {
        let normalized: String = header
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "id" | "bookingid" | "appointmentid" => Some(Column::Id),
            "name" | "patient" | "patientname" => Some(Column::PatientName),
            "phone" | "mobile" | "contact" => Some(Column::Phone),
            "service" | "treatment" => Some(Column::Service),
            "date" | "appointmentdate" => Some(Column::Date),
            "time" | "slot" | "appointmenttime" => Some(Column::Time),
            "status" => Some(Column::Status),
            "timestamp" | "loggedat" | "createdat" | "bookedat" => Some(Column::LoggedAt),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::PatientName => "patient name",
            Column::Phone => "phone",
            Column::Service => "service",
            Column::Date => "date",
            Column::Time => "time",
            Column::Status => "status",
            Column::LoggedAt => "timestamp",
        }
    }
}

/// Accepts `YYYY-MM-DD` and the sheet's `DD/MM/YYYY`.
pub fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

/// `10:00 AM` style slot times, or 24-hour `14:30`. Unparseable values sort
/// as midnight.
pub fn parse_slot_time(value: &str) -> NaiveTime {
    let value = value.trim().to_uppercase();
    NaiveTime::parse_from_str(&value, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M"))
        .unwrap_or(NaiveTime::MIN)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` or the sheet's `DD/MM/YYYY HH:MM:SS`.
pub fn parse_logged_at(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%d/%m/%Y %H:%M:%S"))
        .ok()
}

fn cell_text(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a values-API payload into typed records.
pub fn parse_booking_rows(
    payload: &serde_json::Value,
) -> Result<Vec<BookingRecord>, BookingDataError> {
    let rows = payload
        .get("values")
        .and_then(|v| v.as_array())
        .ok_or(BookingDataError::MissingValues)?;

    let header = rows
        .first()
        .and_then(|h| h.as_array())
        .ok_or(BookingDataError::MissingHeader)?;

    let columns: HashMap<Column, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| Column::from_header(&cell_text(cell)).map(|c| (c, i)))
        .collect();

    for column in Column::REQUIRED {
        if !columns.contains_key(&column) {
            return Err(BookingDataError::MissingColumn(column.label()));
        }
    }

    let mut records = Vec::with_capacity(rows.len().saturating_sub(1));
    for (index, row) in rows.iter().enumerate().skip(1) {
        let Some(cells) = row.as_array() else {
            tracing::warn!(row = index, "Skipping non-array booking row");
            continue;
        };
        let get = |column: Column| -> String {
            columns
                .get(&column)
                .and_then(|&i| cells.get(i))
                .map(cell_text)
                .unwrap_or_default()
        };

        let patient_name = get(Column::PatientName);
        if patient_name.is_empty() {
            tracing::warn!(row = index, "Skipping booking row without patient name");
            continue;
        }
        let Some(date) = parse_sheet_date(&get(Column::Date)) else {
            tracing::warn!(
                row = index,
                date = %get(Column::Date),
                "Skipping booking row with invalid date"
            );
            continue;
        };
        let raw_status = get(Column::Status).to_lowercase();
        let Ok(status) = BookingStatus::from_str(&raw_status) else {
            tracing::warn!(
                row = index,
                status = %raw_status,
                "Skipping booking row with unknown status"
            );
            continue;
        };

        let id = match get(Column::Id) {
            id if id.is_empty() => format!("row-{index}"),
            id => id,
        };

        records.push(BookingRecord {
            id,
            patient_name,
            phone: get(Column::Phone),
            service: get(Column::Service),
            date,
            time: get(Column::Time),
            status,
            logged_at: parse_logged_at(&get(Column::LoggedAt)),
        });
    }

    tracing::debug!(
        parsed = records.len(),
        rows = rows.len().saturating_sub(1),
        "Parsed booking rows"
    );
    Ok(records)
}

// ═══════════════════════════════════════════
// Filters
// ═══════════════════════════════════════════

/// Confirmed or pending bookings on or after `today`, soonest first.
pub fn upcoming(records: &[BookingRecord], today: NaiveDate) -> Vec<&BookingRecord> {
    let mut out: Vec<_> = records
        .iter()
        .filter(|r| r.date >= today)
        .filter(|r| matches!(r.status, BookingStatus::Confirmed | BookingStatus::Pending))
        .collect();
    out.sort_by_key(|r| r.scheduled_at());
    out
}

pub fn on_date(records: &[BookingRecord], date: NaiveDate) -> Vec<&BookingRecord> {
    records.iter().filter(|r| r.date == date).collect()
}

pub fn with_status(records: &[BookingRecord], status: BookingStatus) -> Vec<&BookingRecord> {
    records.iter().filter(|r| r.status == status).collect()
}

/// Case-insensitive match over patient name, phone and service.
/// A blank query matches everything.
pub fn search<'a>(records: &'a [BookingRecord], query: &str) -> Vec<&'a BookingRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| {
            r.patient_name.to_lowercase().contains(&query)
                || r.phone.contains(&query)
                || r.service.to_lowercase().contains(&query)
        })
        .collect()
}
