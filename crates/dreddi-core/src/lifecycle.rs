use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PromiseError;
use crate::models::{InviteStatus, Promise, PromiseMode, PromiseStatus};

impl Promise {
    pub fn accept_invite(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), PromiseError> {
        self.ensure_invitee(user_id)?;

        self.counterparty_id = Some(user_id);
        if self.promisor_id.is_none() {
            self.promisor_id = Some(user_id);
        }
        if self.promisee_id.is_none() {
            self.promisee_id = Some(user_id);
        }
        self.invite_status = InviteStatus::Accepted;
        self.accepted_at = Some(now);
        Ok(())
    }

    pub fn decline_invite(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), PromiseError> {
        self.ensure_invitee(user_id)?;

        self.invite_status = InviteStatus::Declined;
        self.declined_at = Some(now);
        Ok(())
    }

    pub fn mark_condition_met(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), PromiseError> {
        if self.mode != PromiseMode::Conditional {
            return Err(PromiseError::Conflict("promise has no condition"));
        }
        if !self.is_participant(user_id) {
            return Err(PromiseError::Forbidden("only participants can update the condition"));
        }
        if self.condition_met_at.is_some() {
            return Err(PromiseError::Conflict("condition is already met"));
        }

        self.condition_met_at = Some(now);
        self.condition_met_by = Some(user_id);
        Ok(())
    }

    pub fn mark_completed(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), PromiseError> {
        if self.invite_status != InviteStatus::Accepted {
            return Err(PromiseError::Conflict("invite has not been accepted"));
        }
        if self.promisor_id != Some(user_id) {
            return Err(PromiseError::Forbidden("only the promisor can mark a promise completed"));
        }
        self.ensure_status(PromiseStatus::Active)?;
        if self.mode == PromiseMode::Conditional && self.condition_met_at.is_none() {
            return Err(PromiseError::Conflict("condition has not been met yet"));
        }

        self.status = PromiseStatus::CompletedByPromisor;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn confirm(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), PromiseError> {
        self.ensure_promisee(user_id)?;
        self.ensure_status(PromiseStatus::CompletedByPromisor)?;

        self.status = PromiseStatus::Confirmed;
        self.confirmed_at = Some(now);
        Ok(())
    }

    pub fn dispute(
        &mut self,
        user_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PromiseError> {
        self.ensure_promisee(user_id)?;
        self.ensure_status(PromiseStatus::CompletedByPromisor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PromiseError::Validation("reason is required".to_string()));
        }

        self.status = PromiseStatus::Disputed;
        self.disputed_at = Some(now);
        self.dispute_reason = Some(reason.to_string());
        Ok(())
    }

    fn ensure_invitee(&self, user_id: Uuid) -> Result<(), PromiseError> {
        if self.invite_status != InviteStatus::Awaiting {
            return Err(PromiseError::Conflict("invite is no longer pending"));
        }
        if self.creator_id == user_id {
            return Err(PromiseError::Forbidden("creator cannot answer their own invite"));
        }
        if let Some(expected) = self.counterparty_id {
            if expected != user_id {
                return Err(PromiseError::Forbidden("invite is addressed to another user"));
            }
        }
        Ok(())
    }

    fn ensure_promisee(&self, user_id: Uuid) -> Result<(), PromiseError> {
        if self.promisee_id != Some(user_id) {
            return Err(PromiseError::Forbidden("only the promisee can review completion"));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: PromiseStatus) -> Result<(), PromiseError> {
        if self.status != expected {
            return Err(PromiseError::Conflict(match expected {
                PromiseStatus::Active => "promise is not active",
                _ => "promise is not awaiting review",
            }));
        }
        Ok(())
    }
}
