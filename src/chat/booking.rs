//! Keyword-driven appointment booking embedded in the chat.
//!
//! Two steps: a booking keyword opens the flow and lists the open slots; a
//! day keyword picks a date/time and confirms. The confirmation stays visible
//! for the reset delay, after which the flow reads as idle again.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Text that opens the booking flow.
const BOOKING_KEYWORDS: &[&str] = &["appointment", "schedule", "book"];

/// Text that answers the slot question while the flow is waiting.
const DATE_KEYWORDS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "today",
    "tomorrow",
    "next week",
];

const DEFAULT_DATE: &str = "tomorrow";
const DEFAULT_TIME: &str = "10:00 AM";

/// An open slot offered by the demo calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSlot {
    pub day_keyword: &'static str,
    pub date_label: &'static str,
    pub time_label: &'static str,
    time_keys: &'static [&'static str],
}

pub const AVAILABLE_SLOTS: [BookingSlot; 4] = [
    BookingSlot {
        day_keyword: "tomorrow",
        date_label: "tomorrow",
        time_label: "10:00 AM",
        time_keys: &["10:00", "10 am", "10am"],
    },
    BookingSlot {
        day_keyword: "tomorrow",
        date_label: "tomorrow",
        time_label: "2:30 PM",
        time_keys: &["2:30", "14:30"],
    },
    BookingSlot {
        day_keyword: "thursday",
        date_label: "Thursday, May 23",
        time_label: "11:15 AM",
        time_keys: &["11:15"],
    },
    BookingSlot {
        day_keyword: "friday",
        date_label: "Friday, May 24",
        time_label: "3:45 PM",
        time_keys: &["3:45", "15:45"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    Idle,
    AwaitingSlot,
    Confirmed,
}

impl BookingStage {
    pub fn as_u8(self) -> u8 {
        match self {
            BookingStage::Idle => 0,
            BookingStage::AwaitingSlot => 1,
            BookingStage::Confirmed => 2,
        }
    }
}

/// Observable booking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingState {
    pub active: bool,
    pub stage: BookingStage,
}

impl BookingState {
    pub const IDLE: BookingState = BookingState {
        active: false,
        stage: BookingStage::Idle,
    };
}

/// Reply produced by the booking flow instead of the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReply {
    pub content: String,
    pub is_confirmation: bool,
}

#[derive(Debug)]
pub struct BookingFlow {
    state: BookingState,
    reset_at: Option<Instant>,
    reset_delay: Duration,
}

impl BookingFlow {
    pub fn new(reset_delay: Duration) -> Self {
        Self {
            state: BookingState::IDLE,
            reset_at: None,
            reset_delay,
        }
    }

    /// Current state, applying a due reset first.
    pub fn state(&mut self, now: Instant) -> BookingState {
        if self.reset_at.is_some_and(|at| now >= at) {
            tracing::debug!("Booking confirmation shown, resetting flow");
            self.reset();
        }
        self.state
    }

    pub fn reset(&mut self) {
        self.state = BookingState::IDLE;
        self.reset_at = None;
    }

    /// Handle `text` if it belongs to the booking flow.
    pub fn intercept(&mut self, text: &str, now: Instant) -> Option<BookingReply> {
        let lower = text.to_lowercase();
        let state = self.state(now);

        if !state.active && contains_any(&lower, BOOKING_KEYWORDS) {
            self.state = BookingState {
                active: true,
                stage: BookingStage::AwaitingSlot,
            };
            return Some(BookingReply {
                content: slot_listing(),
                is_confirmation: false,
            });
        }

        if state.active
            && state.stage == BookingStage::AwaitingSlot
            && contains_any(&lower, DATE_KEYWORDS)
        {
            let (date, time) = extract_slot(&lower);
            self.state.stage = BookingStage::Confirmed;
            self.reset_at = Some(now + self.reset_delay);
            tracing::info!(date, time, "Appointment booked through chat");
            return Some(BookingReply {
                content: confirmation(date, time),
                is_confirmation: true,
            });
        }

        None
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Date and time labels picked by keyword, defaulting to tomorrow at 10:00 AM.
pub fn extract_slot(lower: &str) -> (&'static str, &'static str) {
    let date = AVAILABLE_SLOTS
        .iter()
        .find(|slot| lower.contains(slot.day_keyword))
        .map(|slot| slot.date_label)
        .unwrap_or(DEFAULT_DATE);
    let time = AVAILABLE_SLOTS
        .iter()
        .find(|slot| slot.time_keys.iter().any(|k| lower.contains(k)))
        .map(|slot| slot.time_label)
        .unwrap_or(DEFAULT_TIME);
    (date, time)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn slot_listing() -> String {
    let slots: Vec<String> = AVAILABLE_SLOTS
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            format!("{}. {} at {}", i + 1, capitalize(slot.date_label), slot.time_label)
        })
        .collect();
    format!(
        "I'd be happy to help you schedule an appointment! Here are our next available \
         slots:\n\n{}\n\nWhich day and time work best for you?",
        slots.join("\n")
    )
}

pub fn confirmation(date: &str, time: &str) -> String {
    format!(
        "Your appointment is confirmed for {date} at {time}. We'll send you a reminder before \
         your visit. Is there anything else I can help you with?"
    )
}
