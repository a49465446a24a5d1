use serde::{Deserialize, Serialize};

use super::enums::ContactType;

/// Identity the chat session personalizes against. Read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub name: String,
    pub contact: String,
    pub contact_type: ContactType,
    pub is_onboarded: bool,
}

impl UserData {
    /// First word of the name, used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name_takes_first_word() {
        let user = UserData {
            name: "  Priya Raman ".into(),
            contact: "priya@example.com".into(),
            contact_type: ContactType::Email,
            is_onboarded: true,
        };
        assert_eq!(user.first_name(), "Priya");
    }

    #[test]
    fn serializes_contact_type_camel_case() {
        let user = UserData {
            name: "Arjun".into(),
            contact: "9876543210".into(),
            contact_type: ContactType::Phone,
            is_onboarded: false,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["contactType"], "phone");
        assert_eq!(json["isOnboarded"], false);
    }
}
