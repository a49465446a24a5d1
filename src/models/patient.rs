use serde::{Deserialize, Serialize};

use super::ModelError;

/// One page of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Identity,
    Address,
    Medical,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::Identity, FormStep::Address, FormStep::Medical];

    /// 1-based position shown to the patient.
    pub fn number(self) -> u8 {
        match self {
            FormStep::Identity => 1,
            FormStep::Address => 2,
            FormStep::Medical => 3,
        }
    }

    pub fn fields(self) -> &'static [RegistrationField] {
        use RegistrationField::*;
        match self {
            FormStep::Identity => &[FullName, Email, Phone, DateOfBirth, Gender],
            FormStep::Address => &[Address, EmergencyContactName, EmergencyContactPhone],
            FormStep::Medical => &[
                MedicalHistory,
                CurrentMedications,
                Allergies,
                PreviousDentalWork,
            ],
        }
    }
}

/// Field identifiers, serialized with the website's camelCase names so
/// error maps line up with form inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationField {
    FullName,
    Email,
    Phone,
    DateOfBirth,
    Gender,
    Address,
    EmergencyContactName,
    EmergencyContactPhone,
    MedicalHistory,
    CurrentMedications,
    Allergies,
    PreviousDentalWork,
}

impl RegistrationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::DateOfBirth => "dateOfBirth",
            Self::Gender => "gender",
            Self::Address => "address",
            Self::EmergencyContactName => "emergencyContactName",
            Self::EmergencyContactPhone => "emergencyContactPhone",
            Self::MedicalHistory => "medicalHistory",
            Self::CurrentMedications => "currentMedications",
            Self::Allergies => "allergies",
            Self::PreviousDentalWork => "previousDentalWork",
        }
    }
}

impl std::str::FromStr for RegistrationField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormStep::ALL
            .iter()
            .flat_map(|step| step.fields())
            .find(|field| field.as_str() == s)
            .copied()
            .ok_or_else(|| ModelError::UnknownField(s.to_string()))
    }
}

/// Flat patient record collected by the registration wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientRegistrationData {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// YYYY-MM-DD
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub medical_history: String,
    pub current_medications: String,
    pub allergies: String,
    pub previous_dental_work: String,
    /// RFC 3339, stamped when the record is finalized for submission.
    #[serde(rename = "timestamp", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

impl PatientRegistrationData {
    pub fn get(&self, field: RegistrationField) -> &str {
        use RegistrationField::*;
        match field {
            FullName => &self.full_name,
            Email => &self.email,
            Phone => &self.phone,
            DateOfBirth => &self.date_of_birth,
            Gender => &self.gender,
            Address => &self.address,
            EmergencyContactName => &self.emergency_contact_name,
            EmergencyContactPhone => &self.emergency_contact_phone,
            MedicalHistory => &self.medical_history,
            CurrentMedications => &self.current_medications,
            Allergies => &self.allergies,
            PreviousDentalWork => &self.previous_dental_work,
        }
    }

    pub fn set(&mut self, field: RegistrationField, value: impl Into<String>) {
        use RegistrationField::*;
        let slot = match field {
            FullName => &mut self.full_name,
            Email => &mut self.email,
            Phone => &mut self.phone,
            DateOfBirth => &mut self.date_of_birth,
            Gender => &mut self.gender,
            Address => &mut self.address,
            EmergencyContactName => &mut self.emergency_contact_name,
            EmergencyContactPhone => &mut self.emergency_contact_phone,
            MedicalHistory => &mut self.medical_history,
            CurrentMedications => &mut self.current_medications,
            Allergies => &mut self.allergies,
            PreviousDentalWork => &mut self.previous_dental_work,
        };
        *slot = value.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn steps_cover_all_twelve_fields_once() {
        let mut all: Vec<_> = FormStep::ALL.iter().flat_map(|s| s.fields()).collect();
        assert_eq!(all.len(), 12);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in FormStep::ALL.iter().flat_map(|s| s.fields()) {
            assert_eq!(RegistrationField::from_str(field.as_str()).unwrap(), *field);
            let json = serde_json::to_string(field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
        assert!(RegistrationField::from_str("bloodGroup").is_err());
    }

    #[test]
    fn set_and_get_by_field() {
        let mut data = PatientRegistrationData::default();
        data.set(RegistrationField::Allergies, "Penicillin");
        assert_eq!(data.get(RegistrationField::Allergies), "Penicillin");
        assert_eq!(data.allergies, "Penicillin");
    }

    #[test]
    fn submitted_at_serializes_as_timestamp() {
        let data = PatientRegistrationData {
            full_name: "Meera Iyer".into(),
            submitted_at: Some("2026-10-16T10:00:00+00:00".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["fullName"], "Meera Iyer");
        assert_eq!(json["timestamp"], "2026-10-16T10:00:00+00:00");
    }
}
