//! Patient-registration field validators.
//!
//! Pure functions, one per field class, plus per-step validators that return
//! an ordered field → message map. A step is complete when its map is empty.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Local, Months, NaiveDate};
use regex::Regex;

use crate::models::{FormStep, PatientRegistrationData, RegistrationField};

/// Hard cap applied to every field.
pub const MAX_FIELD_CHARS: usize = 1000;

const EMAIL_MIN_CHARS: usize = 5;
const EMAIL_MAX_CHARS: usize = 254;
const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;
const ADDRESS_MIN_CHARS: usize = 10;
const ADDRESS_MAX_CHARS: usize = 500;
const MAX_AGE_YEARS: u32 = 120;

const GENDER_OPTIONS: &[&str] = &["male", "female", "other", "prefer-not-to-say"];

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$"#,
    )
    .unwrap()
});

// +91XXXXXXXXXX, 91XXXXXXXXXX, XXXXXXXXXX, 0XXXXXXXXXX with a 6-9 leading digit.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\+91|91|0)?[6-9]\d{9}$").unwrap());

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z .'-]+$").unwrap());

/// Field → error message, only for fields that failed.
pub type FieldErrors = BTreeMap<RegistrationField, String>;

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn is_name_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '\'' | '.')
}

pub fn is_valid_email(value: &str) -> bool {
    let email = value.trim();
    let len = char_len(email);
    (EMAIL_MIN_CHARS..=EMAIL_MAX_CHARS).contains(&len) && EMAIL_PATTERN.is_match(email)
}

/// Strip the separators people type into phone numbers.
pub fn normalize_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

/// Indian mobile number, optionally prefixed with `+91`, `91`, or `0`.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE_PATTERN.is_match(&normalize_phone(value.trim()))
}

/// `YYYY-MM-DD`, not after `today`, and not more than 120 years before it.
pub fn is_valid_date_of_birth(value: &str, today: NaiveDate) -> bool {
    let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") else {
        return false;
    };
    let Some(earliest) = today.checked_sub_months(Months::new(MAX_AGE_YEARS * 12)) else {
        return false;
    };
    date <= today && date >= earliest
}

pub fn is_valid_name(value: &str) -> bool {
    let name = value.trim();
    let len = char_len(name);
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) || !NAME_PATTERN.is_match(name) {
        return false;
    }

    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let ends_with_letter = name.chars().last().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || !ends_with_letter {
        return false;
    }

    // "Anne--Marie", "O''Brien", "Dr..", double spaces
    !name
        .chars()
        .zip(name.chars().skip(1))
        .any(|(a, b)| a == b && is_name_separator(a))
}

pub fn is_valid_address(value: &str) -> bool {
    let address = value.trim();
    let len = char_len(address);
    (ADDRESS_MIN_CHARS..=ADDRESS_MAX_CHARS).contains(&len)
        && address.chars().any(|c| c.is_alphanumeric())
}

/// Optional free text: empty passes, otherwise capped at 1000 chars.
pub fn is_valid_medical_text(value: &str) -> bool {
    char_len(value.trim()) <= MAX_FIELD_CHARS
}

fn is_valid_gender(value: &str) -> bool {
    let gender = value.trim();
    gender.is_empty()
        || GENDER_OPTIONS
            .iter()
            .any(|option| option.eq_ignore_ascii_case(gender))
}

// ═══════════════════════════════════════════
// Field and step validators
// ═══════════════════════════════════════════

/// Validate one field. `None` means the field is acceptable.
pub fn validate_field(
    field: RegistrationField,
    data: &PatientRegistrationData,
    today: NaiveDate,
) -> Option<String> {
    use RegistrationField::*;

    let value = data.get(field);
    if char_len(value) > MAX_FIELD_CHARS {
        return Some(format!("Must be {MAX_FIELD_CHARS} characters or fewer"));
    }
    let empty = value.trim().is_empty();

    let message = match field {
        FullName if empty => "Full name is required",
        FullName if !is_valid_name(value) => {
            "Enter a valid name (2-50 letters, spaces, hyphens, apostrophes or periods)"
        }
        Email if empty => return None,
        Email if !is_valid_email(value) => "Enter a valid email address",
        Phone if empty => "Phone number is required",
        Phone if !is_valid_phone(value) => "Enter a valid Indian mobile number",
        DateOfBirth if empty => "Date of birth is required",
        DateOfBirth if !is_valid_date_of_birth(value, today) => {
            "Enter a valid date of birth (not in the future, within 120 years)"
        }
        Gender if !is_valid_gender(value) => "Select a valid option",
        Address if empty => "Address is required",
        Address if !is_valid_address(value) => "Address must be 10-500 characters",
        EmergencyContactName if !empty && !is_valid_name(value) => {
            "Enter a valid emergency contact name"
        }
        EmergencyContactPhone if !empty && !is_valid_phone(value) => {
            "Enter a valid emergency contact number"
        }
        MedicalHistory | CurrentMedications | Allergies | PreviousDentalWork
            if !is_valid_medical_text(value) =>
        {
            "Must be 1000 characters or fewer"
        }
        _ => return None,
    };
    Some(message.to_string())
}

/// Errors for the fields that belong to `step` only.
pub fn validate_registration_step(
    step: FormStep,
    data: &PatientRegistrationData,
    today: NaiveDate,
) -> FieldErrors {
    step.fields()
        .iter()
        .filter_map(|&field| validate_field(field, data, today).map(|msg| (field, msg)))
        .collect()
}

/// Union of all three step validators.
pub fn validate_complete_registration(
    data: &PatientRegistrationData,
    today: NaiveDate,
) -> FieldErrors {
    FormStep::ALL
        .iter()
        .flat_map(|&step| validate_registration_step(step, data, today))
        .collect()
}

pub fn is_step_complete(step: FormStep, data: &PatientRegistrationData, today: NaiveDate) -> bool {
    validate_registration_step(step, data, today).is_empty()
}

/// Local calendar date used by the validators outside tests.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn valid_patient() -> PatientRegistrationData {
        PatientRegistrationData {
            full_name: "Ananya Sharma".into(),
            email: "ananya.sharma@example.in".into(),
            phone: "+91 98765 43210".into(),
            date_of_birth: "1990-04-12".into(),
            gender: "female".into(),
            address: "14 MG Road, Bengaluru 560001".into(),
            ..Default::default()
        }
    }

    // ── Email ──

    #[test]
    fn email_accepts_common_addresses() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@clinic.example.org"));
        assert!(is_valid_email("  padded@example.com  "));
    }

    #[test]
    fn email_rejects_malformed() {
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("user@-bad.com"));
        assert!(!is_valid_email("a@b."));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(!is_valid_email(&long));
    }

    // ── Phone ──

    #[test]
    fn phone_accepts_all_indian_formats_with_leading_6_to_9() {
        for lead in ['6', '7', '8', '9'] {
            let number = format!("{lead}123456789");
            assert!(is_valid_phone(&number), "{number}");
            assert!(is_valid_phone(&format!("+91{number}")));
            assert!(is_valid_phone(&format!("91{number}")));
            assert!(is_valid_phone(&format!("0{number}")));
        }
    }

    #[test]
    fn phone_rejects_leading_0_to_5_regardless_of_prefix() {
        for lead in ['0', '1', '2', '3', '4', '5'] {
            let number = format!("{lead}123456789");
            assert!(!is_valid_phone(&number), "{number}");
            assert!(!is_valid_phone(&format!("+91{number}")), "+91{number}");
            assert!(!is_valid_phone(&format!("91{number}")), "91{number}");
        }
    }

    #[test]
    fn phone_strips_separators() {
        assert!(is_valid_phone("+91 (987) 654-3210"));
        assert!(is_valid_phone("98765.43210"));
        assert_eq!(normalize_phone("+91 98765-43210"), "+919876543210");
    }

    #[test]
    fn phone_rejects_wrong_length() {
        assert!(!is_valid_phone("987654321"));
        assert!(!is_valid_phone("98765432101"));
        assert!(!is_valid_phone("+1 9876543210"));
        assert!(!is_valid_phone(""));
    }

    // ── Date of birth ──

    #[test]
    fn date_of_birth_today_is_valid_future_is_not() {
        let today = date("2026-10-16");
        assert!(is_valid_date_of_birth("2026-10-16", today));
        assert!(!is_valid_date_of_birth("2026-10-17", today));
        assert!(!is_valid_date_of_birth("2030-01-01", today));
    }

    #[test]
    fn date_of_birth_within_120_years() {
        let today = date("2026-10-16");
        assert!(is_valid_date_of_birth("1906-10-16", today));
        assert!(!is_valid_date_of_birth("1906-10-15", today));
    }

    #[test]
    fn date_of_birth_must_parse() {
        let today = date("2026-10-16");
        assert!(!is_valid_date_of_birth("16/10/1990", today));
        assert!(!is_valid_date_of_birth("1990-02-30", today));
        assert!(!is_valid_date_of_birth("", today));
    }

    // ── Name ──

    #[test]
    fn name_accepts_realistic_names() {
        assert!(is_valid_name("Li"));
        assert!(is_valid_name("Mary-Jane O'Neil"));
        assert!(is_valid_name("A. P. J. Kalam"));
    }

    #[test]
    fn name_rejects_bad_shapes() {
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(&"a".repeat(51)));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name("-Ravi"));
        assert!(!is_valid_name("Ravi-"));
        assert!(!is_valid_name("Anne--Marie"));
        assert!(!is_valid_name("Ravi  Kumar"));
        assert!(!is_valid_name("O''Brien"));
    }

    // ── Address / medical ──

    #[test]
    fn address_bounds() {
        assert!(is_valid_address("12 Main St, Pune"));
        assert!(!is_valid_address("Short"));
        assert!(!is_valid_address("----------------"));
        assert!(!is_valid_address(&"x".repeat(501)));
    }

    #[test]
    fn medical_text_optional_and_capped() {
        assert!(is_valid_medical_text(""));
        assert!(is_valid_medical_text("Diabetic, on metformin"));
        assert!(!is_valid_medical_text(&"x".repeat(1001)));
    }

    // ── Step validators ──

    #[test]
    fn valid_patient_has_no_errors() {
        let today = date("2026-10-16");
        let data = valid_patient();
        for step in FormStep::ALL {
            assert!(is_step_complete(step, &data, today), "{step:?}");
        }
        assert!(validate_complete_registration(&data, today).is_empty());
    }

    #[test]
    fn step_errors_only_cover_that_step() {
        let today = date("2026-10-16");
        let data = PatientRegistrationData::default();

        let identity = validate_registration_step(FormStep::Identity, &data, today);
        assert_eq!(
            identity.keys().copied().collect::<Vec<_>>(),
            vec![
                RegistrationField::FullName,
                RegistrationField::Phone,
                RegistrationField::DateOfBirth
            ]
        );

        let address = validate_registration_step(FormStep::Address, &data, today);
        assert_eq!(
            address.keys().copied().collect::<Vec<_>>(),
            vec![RegistrationField::Address]
        );

        assert!(validate_registration_step(FormStep::Medical, &data, today).is_empty());
    }

    #[test]
    fn complete_registration_unions_steps() {
        let today = date("2026-10-16");
        let mut data = valid_patient();
        data.email = "broken@".into();
        data.emergency_contact_phone = "12345".into();
        data.allergies = "x".repeat(1001);

        let errors = validate_complete_registration(&data, today);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key(&RegistrationField::Email));
        assert!(errors.contains_key(&RegistrationField::EmergencyContactPhone));
        assert!(errors.contains_key(&RegistrationField::Allergies));
    }

    #[test]
    fn every_field_capped_at_1000_chars() {
        let today = date("2026-10-16");
        let mut data = valid_patient();
        data.gender = "x".repeat(1001);
        let message = validate_field(RegistrationField::Gender, &data, today).unwrap();
        assert!(message.contains("1000"));
    }

    #[test]
    fn gender_accepts_listed_options_only() {
        let today = date("2026-10-16");
        let mut data = valid_patient();
        data.gender = "Prefer-Not-To-Say".into();
        assert!(validate_field(RegistrationField::Gender, &data, today).is_none());
        data.gender = "unknown".into();
        assert!(validate_field(RegistrationField::Gender, &data, today).is_some());
    }
}
