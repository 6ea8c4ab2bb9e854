use chrono::{DateTime, Utc};
use dreddi_core::{Executor, InviteStatus, Locale, ProfileIdentity, Promise, ReputationCounts};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/promises/create`; `dueAt` stays a string until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseRequest {
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    pub counterparty_contact: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseResponse {
    pub promise: Promise,
    pub invite_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocaleRequest {
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocaleResponse {
    pub ok: bool,
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub promise_id: Uuid,
    pub title: String,
    pub creator: ProfileIdentity,
    pub due_at: Option<DateTime<Utc>>,
    pub invite_status: InviteStatus,
    pub executor: Executor,
    pub condition_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfileResponse {
    pub handle: String,
    pub identity: ProfileIdentity,
    pub counts: ReputationCounts,
    pub has_history: bool,
    pub score: Decimal,
    pub score_display: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromiseCreatedEvent {
    pub promise_id: Uuid,
    pub creator_id: Uuid,
    pub counterparty_contact: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Promise> for PromiseCreatedEvent {
    fn from(promise: &Promise) -> Self {
        Self {
            promise_id: promise.id,
            creator_id: promise.creator_id,
            counterparty_contact: promise.counterparty_contact.clone(),
            title: promise.title.clone(),
            created_at: promise.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_accepts_camel_case_and_optional_fields() {
        let request: CreatePromiseRequest = serde_json::from_value(json!({
            "title": "Lend the tent",
            "counterpartyContact": "@kim",
        }))
        .unwrap();

        assert_eq!(request.counterparty_contact, "@kim");
        assert_eq!(request.details, None);
        assert_eq!(request.due_at, None);
        assert_eq!(request.executor, None);
    }

    #[test]
    fn created_event_uses_snake_case_fields() {
        let promise = Promise::open(
            dreddi_core::PromiseDraft {
                title: "Lend the tent".to_string(),
                details: None,
                counterparty_contact: "kim@example.com".to_string(),
                counterparty_id: None,
                due_at: None,
                executor: Executor::Me,
                visibility: dreddi_core::Visibility::Private,
                condition_text: None,
            },
            Uuid::new_v4(),
            Utc::now(),
        );

        let event = serde_json::to_value(PromiseCreatedEvent::from(&promise)).unwrap();
        assert_eq!(event["promise_id"], promise.id.to_string());
        assert_eq!(event["creator_id"], promise.creator_id.to_string());
        assert_eq!(event["counterparty_contact"], "kim@example.com");
        assert_eq!(event["title"], "Lend the tent");
    }

    #[test]
    fn create_request_requires_counterparty_contact() {
        let parsed = serde_json::from_value::<CreatePromiseRequest>(json!({ "title": "x" }));
        assert!(parsed.is_err());
    }
}
