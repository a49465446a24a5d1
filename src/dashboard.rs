//! Clinic dashboard: headline counts and a recent-activity feed derived from
//! booking records.
//!
//! Every activity timestamp is the moment the activity happened: when the
//! sheet logged the row, or, for sheets without a timestamp column, the
//! appointment slot. Items later than "now" have not happened yet and stay
//! out of the feed.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::bookings::BookingRecord;
use crate::models::BookingStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    /// Confirmed or pending, today or later.
    pub upcoming: usize,
    pub today: usize,
    pub pending: usize,
    pub cancelled: usize,
}

impl DashboardStats {
    pub fn from_records(records: &[BookingRecord], today: NaiveDate) -> Self {
        records.iter().fold(Self::default(), |mut stats, r| {
            stats.total += 1;
            let open = matches!(r.status, BookingStatus::Confirmed | BookingStatus::Pending);
            if open && r.date >= today {
                stats.upcoming += 1;
            }
            if r.date == today {
                stats.today += 1;
            }
            match r.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
                _ => {}
            }
            stats
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    AppointmentBooked,
    AppointmentCancelled,
    AppointmentCompleted,
    ReminderSent,
    PatientRegistered,
}

impl From<BookingStatus> for ActivityKind {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Confirmed => ActivityKind::AppointmentBooked,
            BookingStatus::Cancelled => ActivityKind::AppointmentCancelled,
            BookingStatus::Completed => ActivityKind::AppointmentCompleted,
            // Pending rows are waiting on the patient's reply to a reminder.
            BookingStatus::Pending => ActivityKind::ReminderSent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub title: String,
    /// When the activity happened.
    pub timestamp: NaiveDateTime,
}

impl ActivityItem {
    pub fn from_booking(record: &BookingRecord) -> Self {
        let kind = ActivityKind::from(record.status);
        let service = if record.service.is_empty() {
            "appointment"
        } else {
            record.service.as_str()
        };
        let title = match kind {
            ActivityKind::AppointmentBooked => {
                format!("{} booked {}", record.patient_name, service)
            }
            ActivityKind::AppointmentCancelled => {
                format!("{} cancelled {}", record.patient_name, service)
            }
            ActivityKind::AppointmentCompleted => {
                format!("{} completed {}", record.patient_name, service)
            }
            ActivityKind::ReminderSent => {
                format!("Reminder sent to {} for {}", record.patient_name, service)
            }
            ActivityKind::PatientRegistered => {
                format!("{} registered", record.patient_name)
            }
        };
        Self {
            kind,
            title,
            timestamp: record.logged_at.unwrap_or_else(|| record.scheduled_at()),
        }
    }

    pub fn patient_registered(name: &str, at: NaiveDateTime) -> Self {
        Self {
            kind: ActivityKind::PatientRegistered,
            title: format!("{name} registered"),
            timestamp: at,
        }
    }
}

/// Most recent `limit` items up to `now`, newest first.
pub fn activity_feed(
    records: &[BookingRecord],
    now: NaiveDateTime,
    limit: usize,
) -> Vec<ActivityItem> {
    let mut items: Vec<_> = records.iter().map(ActivityItem::from_booking).collect();
    sort_and_truncate(&mut items, now, limit);
    items
}

/// Drops items after `now`, then keeps the newest `limit`.
pub fn sort_and_truncate(items: &mut Vec<ActivityItem>, now: NaiveDateTime, limit: usize) {
    items.retain(|item| item.timestamp <= now);
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        id: &str,
        date: (i32, u32, u32),
        time: &str,
        status: BookingStatus,
    ) -> BookingRecord {
        BookingRecord {
            id: id.into(),
            patient_name: format!("Patient {id}"),
            phone: "9876543210".into(),
            service: "Cleaning".into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: time.into(),
            status,
            logged_at: None,
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn records() -> Vec<BookingRecord> {
        vec![
            record("a", (2026, 10, 16), "10:00 AM", BookingStatus::Confirmed),
            record("b", (2026, 10, 16), "2:30 PM", BookingStatus::Pending),
            record("c", (2026, 10, 12), "11:15 AM", BookingStatus::Completed),
            record("d", (2026, 10, 20), "3:45 pm", BookingStatus::Cancelled),
            record("e", (2026, 10, 22), "9:00 AM", BookingStatus::Confirmed),
        ]
    }

    #[test]
    fn stats_count_each_bucket() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let stats = DashboardStats::from_records(&records(), today);
        assert_eq!(
            stats,
            DashboardStats {
                total: 5,
                upcoming: 3,
                today: 2,
                pending: 1,
                cancelled: 1,
            }
        );
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(DashboardStats::from_records(&[], today), DashboardStats::default());
    }

    #[test]
    fn feed_is_newest_first_and_limited() {
        let feed = activity_feed(&records(), at(30, 0, 0), 3);
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].kind, ActivityKind::AppointmentBooked);
        assert_eq!(feed[0].title, "Patient e booked Cleaning");
        assert_eq!(feed[1].kind, ActivityKind::AppointmentCancelled);
        assert_eq!(feed[2].kind, ActivityKind::ReminderSent);
        assert_eq!(feed[2].title, "Reminder sent to Patient b for Cleaning");
    }

    #[test]
    fn future_appointments_are_not_recent_activity() {
        let feed = activity_feed(&records(), at(16, 12, 0), 10);
        let titles: Vec<_> = feed.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Patient a booked Cleaning", "Patient c completed Cleaning"]);
    }

    #[test]
    fn logged_time_wins_over_slot_time() {
        let mut booked = record("f", (2026, 11, 2), "9:00 AM", BookingStatus::Confirmed);
        booked.logged_at = Some(at(15, 18, 30));
        let feed = activity_feed(&[booked], at(16, 12, 0), 10);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].timestamp, at(15, 18, 30));
    }

    #[test]
    fn registration_items_merge_into_feed() {
        let now = at(16, 12, 0);
        let mut items = activity_feed(&records(), now, 10);
        items.push(ActivityItem::patient_registered("Meera Iyer", at(16, 11, 0)));
        sort_and_truncate(&mut items, now, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ActivityKind::PatientRegistered);
        assert_eq!(items[0].title, "Meera Iyer registered");
        assert_eq!(items[1].title, "Patient a booked Cleaning");
    }
}
