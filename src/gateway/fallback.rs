use crate::config::ClinicProfile;

/// Topic picked by keyword when the conversational service is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTopic {
    Appointment,
    Emergency,
    Services,
    Hours,
    Location,
    Cost,
    General,
}

/// Checked in order; the first topic with a matching keyword wins.
const TOPIC_KEYWORDS: &[(FallbackTopic, &[&str])] = &[
    (FallbackTopic::Appointment, &["appointment", "book", "schedule"]),
    (
        FallbackTopic::Emergency,
        &["emergency", "urgent", "severe pain", "bleeding", "swelling", "broken tooth"],
    ),
    (
        FallbackTopic::Services,
        &["service", "treatment", "cleaning", "whitening", "implant", "root canal", "braces"],
    ),
    (FallbackTopic::Hours, &["hours", "timing", "open", "close"]),
    (FallbackTopic::Location, &["location", "address", "where", "direction"]),
    (FallbackTopic::Cost, &["cost", "price", "fee", "charge", "how much"]),
];

impl FallbackTopic {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(topic, _)| *topic)
            .unwrap_or(FallbackTopic::General)
    }
}

/// Canned replies built from the configured clinic details.
#[derive(Debug, Clone, Default)]
pub struct FallbackResponder {
    clinic: ClinicProfile,
}

impl FallbackResponder {
    pub fn new(clinic: ClinicProfile) -> Self {
        Self { clinic }
    }

    pub fn clinic(&self) -> &ClinicProfile {
        &self.clinic
    }

    pub fn respond(&self, message: &str) -> String {
        let clinic = &self.clinic;
        match FallbackTopic::classify(message) {
            FallbackTopic::Appointment => format!(
                "I'd be happy to help you book an appointment at {}. Just tell me a day that \
                 works for you, or call us at {} and our front desk will find a slot.",
                clinic.name, clinic.phone
            ),
            FallbackTopic::Emergency => format!(
                "If you're having a dental emergency, please call us right away at {}. \
                 For severe bleeding, facial swelling or trauma, visit the nearest emergency room.",
                clinic.phone
            ),
            FallbackTopic::Services => format!(
                "{} offers check-ups and cleaning, fillings, root canal treatment, crowns and \
                 bridges, implants, teeth whitening, and braces or clear aligners. Which one \
                 would you like to know more about?",
                clinic.name
            ),
            FallbackTopic::Hours => format!(
                "We're open {}. Sunday appointments are available for emergencies.",
                clinic.hours
            ),
            FallbackTopic::Location => format!(
                "You'll find us at {}. Call {} if you need directions.",
                clinic.address, clinic.phone
            ),
            FallbackTopic::Cost => format!(
                "Costs depend on the treatment. A consultation is the best way to get an exact \
                 estimate, and our team at {} can share current pricing.",
                clinic.phone
            ),
            FallbackTopic::General => format!(
                "Thanks for your message! I can help you with:\n\
                 • Booking an appointment\n\
                 • Our dental services\n\
                 • Clinic hours and location\n\
                 • Treatment costs\n\
                 • Dental emergencies\n\n\
                 What would you like to know? You can also reach {} at {}.",
                clinic.name, clinic.phone
            ),
        }
    }
}
