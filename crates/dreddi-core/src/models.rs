use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

macro_rules! string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseError::Unsupported {
                        field: $field,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(PromiseStatus, "status", {
    Active => "active",
    CompletedByPromisor => "completed_by_promisor",
    Confirmed => "confirmed",
    Disputed => "disputed",
});

string_enum!(PromiseMode, "mode", {
    Deal => "deal",
    Conditional => "conditional",
});

string_enum!(Executor, "executor", {
    Me => "me",
    Counterparty => "counterparty",
});

string_enum!(Visibility, "visibility", {
    Private => "private",
    Public => "public",
});

string_enum!(InviteStatus, "invite_status", {
    Awaiting => "awaiting",
    Accepted => "accepted",
    Declined => "declined",
});

/// A tracked agreement between the creator and a counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Promise {
    pub id: Uuid,
    pub title: String,
    pub details: Option<String>,
    pub status: PromiseStatus,
    pub mode: PromiseMode,
    pub visibility: Visibility,
    pub executor: Executor,
    pub due_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub counterparty_id: Option<Uuid>,
    pub counterparty_contact: String,
    pub promisor_id: Option<Uuid>,
    pub promisee_id: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
    pub condition_text: Option<String>,
    pub condition_met_at: Option<DateTime<Utc>>,
    pub condition_met_by: Option<Uuid>,
    pub invite_token: String,
    pub invite_status: InviteStatus,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for opening a new promise.
#[derive(Debug, Clone)]
pub struct PromiseDraft {
    pub title: String,
    pub details: Option<String>,
    pub counterparty_contact: String,
    pub counterparty_id: Option<Uuid>,
    pub due_at: Option<DateTime<Utc>>,
    pub executor: Executor,
    pub visibility: Visibility,
    pub condition_text: Option<String>,
}

impl Promise {
    pub fn open(draft: PromiseDraft, creator_id: Uuid, now: DateTime<Utc>) -> Self {
        let mode = if draft.condition_text.is_some() {
            PromiseMode::Conditional
        } else {
            PromiseMode::Deal
        };
        let (promisor_id, promisee_id) = match draft.executor {
            Executor::Me => (Some(creator_id), draft.counterparty_id),
            Executor::Counterparty => (draft.counterparty_id, Some(creator_id)),
        };

        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            details: draft.details,
            status: PromiseStatus::Active,
            mode,
            visibility: draft.visibility,
            executor: draft.executor,
            due_at: draft.due_at,
            completed_at: None,
            creator_id,
            counterparty_id: draft.counterparty_id,
            counterparty_contact: draft.counterparty_contact,
            promisor_id,
            promisee_id,
            confirmed_at: None,
            disputed_at: None,
            dispute_reason: None,
            condition_text: draft.condition_text,
            condition_met_at: None,
            condition_met_by: None,
            invite_token: Uuid::new_v4().simple().to_string(),
            invite_status: InviteStatus::Awaiting,
            invited_at: now,
            accepted_at: None,
            declined_at: None,
            created_at: now,
        }
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id || self.counterparty_id == Some(user_id)
    }

    pub fn version(&self) -> PromiseVersion {
        PromiseVersion {
            status: self.status,
            invite_status: self.invite_status,
            condition_met: self.condition_met_at.is_some(),
        }
    }
}

/// The state a lifecycle write was decided against; stores only apply the
/// write while the stored row still matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseVersion {
    pub status: PromiseStatus,
    pub invite_status: InviteStatus,
    pub condition_met: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub email: Option<String>,
}

/// The signed-in user as reported by the auth backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

pub const NOTIFICATION_PROMISE_INVITE: &str = "promise_invite";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub promise_id: Uuid,
    pub created_at: DateTime<Utc>,
}
