use chrono::Utc;
use serde::Serialize;

use super::fallback::FallbackResponder;
use super::{ChatBackend, ChatRequest, GatewayError, RegistrationSubmitter, SubmissionError};
use crate::config::AppConfig;
use crate::models::{PatientRegistrationData, UserData};

const CHAT_SOURCE: &str = "kraftodent-chat-widget";

/// HTTP client for the automation service's webhooks.
pub struct WebhookGateway {
    client: reqwest::Client,
    chat_url: Option<String>,
    registration_url: Option<String>,
    bookings_url: Option<String>,
    fallback: FallbackResponder,
}

/// Request body for the chat webhook.
#[derive(Serialize)]
struct ChatWebhookRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<ChatWebhookUser<'a>>,
    metadata: ChatWebhookMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatWebhookUser<'a> {
    name: &'a str,
    contact: &'a str,
    contact_type: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatWebhookMetadata<'a> {
    source: &'static str,
    session_id: &'a str,
}

impl<'a> ChatWebhookRequest<'a> {
    fn new(request: &'a ChatRequest) -> Self {
        let timestamp = Utc::now().to_rfc3339();
        Self {
            message: &request.message,
            user: request.user.as_ref().map(|u: &'a UserData| ChatWebhookUser {
                name: &u.name,
                contact: &u.contact,
                contact_type: u.contact_type.as_str(),
                timestamp,
            }),
            metadata: ChatWebhookMetadata {
                source: CHAT_SOURCE,
                session_id: &request.session_id,
            },
        }
    }
}

impl WebhookGateway {
    pub fn new(config: &AppConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.webhook_timeout)
            .build()
            .map_err(|e| GatewayError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            chat_url: config.chat_webhook_url.clone(),
            registration_url: config.registration_webhook_url.clone(),
            bookings_url: config.bookings_url.clone(),
            fallback: FallbackResponder::new(config.clinic.clone()),
        })
    }

    pub fn fallback(&self) -> &FallbackResponder {
        &self.fallback
    }

    /// POST the chat turn and return the raw response body.
    pub async fn try_send_chat(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        let url = self
            .chat_url
            .as_deref()
            .ok_or(GatewayError::NotConfigured("chat webhook"))?;

        let response = self
            .client
            .post(url)
            .json(&ChatWebhookRequest::new(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(body)
    }

    /// Reply text for `request`; falls back to a canned answer on any failure.
    pub async fn send_to_webhook(&self, request: &ChatRequest) -> String {
        match self.try_send_chat(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    session_id = %request.session_id,
                    error = %e,
                    "Chat webhook failed, using fallback reply"
                );
                self.fallback.respond(&request.message)
            }
        }
    }

    /// POST the registration record. Non-2xx responses are errors.
    pub async fn submit_registration(
        &self,
        data: &PatientRegistrationData,
    ) -> Result<(), SubmissionError> {
        let url = self
            .registration_url
            .as_deref()
            .ok_or(GatewayError::NotConfigured("registration webhook"))?;

        let payload = registration_payload(data);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(GatewayError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        tracing::info!("Registration submitted");
        Ok(())
    }

    /// Fetch the booking sheet as a `{"values": [[...], ...]}` document.
    pub async fn fetch_booking_rows(&self) -> Result<serde_json::Value, GatewayError> {
        let url = self
            .bookings_url
            .as_deref()
            .ok_or(GatewayError::NotConfigured("bookings sheet"))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Copy of `data` with the defaults the registration sheet expects for
/// empty optional fields, stamped with a timestamp if it has none.
pub fn registration_payload(data: &PatientRegistrationData) -> PatientRegistrationData {
    let mut payload = data.clone();
    for text in [
        &mut payload.medical_history,
        &mut payload.current_medications,
        &mut payload.allergies,
    ] {
        if text.trim().is_empty() {
            *text = "None".into();
        }
    }
    if payload.previous_dental_work.trim().is_empty() {
        payload.previous_dental_work = "No".into();
    }
    if payload.submitted_at.is_none() {
        payload.submitted_at = Some(Utc::now().to_rfc3339());
    }
    payload
}

impl ChatBackend for WebhookGateway {
    async fn reply(&self, request: &ChatRequest) -> String {
        self.send_to_webhook(request).await
    }
}

impl RegistrationSubmitter for WebhookGateway {
    async fn submit(&self, data: &PatientRegistrationData) -> Result<(), SubmissionError> {
        let result = self.submit_registration(data).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Registration submission failed");
        }
        result
    }
}
