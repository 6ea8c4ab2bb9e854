use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AuthUser, Notification, Profile, Promise, PromiseVersion};
use crate::reputation::ReputationCounts;

#[async_trait]
pub trait PromiseStore: Send + Sync {
    async fn insert_promise(&self, promise: &Promise) -> anyhow::Result<()>;
    async fn get_promise(&self, promise_id: Uuid) -> anyhow::Result<Option<Promise>>;
    async fn find_by_invite_token(&self, token: &str) -> anyhow::Result<Option<Promise>>;
    /// Writes `promise` only if the stored row is still at `expected`.
    /// Returns `false` when another write got there first.
    async fn update_promise(
        &self,
        promise: &Promise,
        expected: PromiseVersion,
    ) -> anyhow::Result<bool>;

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn find_profile_by_handle(&self, handle: &str) -> anyhow::Result<Option<Profile>>;
    /// Looks a counterparty up by email, or by handle when prefixed with `@`.
    async fn resolve_contact(&self, contact: &str) -> anyhow::Result<Option<Profile>>;
    async fn reputation_counts(&self, user_id: Uuid) -> anyhow::Result<ReputationCounts>;

    async fn insert_notification(&self, notification: &Notification) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns `None` when the token is not (or no longer) valid.
    async fn user_for_token(&self, access_token: &str) -> anyhow::Result<Option<AuthUser>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactKey<'a> {
    Email(&'a str),
    Handle(&'a str),
}

impl<'a> ContactKey<'a> {
    pub fn parse(contact: &'a str) -> Option<Self> {
        let contact = contact.trim();
        if let Some(handle) = contact.strip_prefix('@') {
            return (!handle.is_empty()).then_some(ContactKey::Handle(handle));
        }
        if contact.contains('@') {
            return Some(ContactKey::Email(contact));
        }
        (!contact.is_empty()).then_some(ContactKey::Handle(contact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_key_distinguishes_emails_and_handles() {
        assert_eq!(
            ContactKey::parse(" sam@example.com "),
            Some(ContactKey::Email("sam@example.com"))
        );
        assert_eq!(ContactKey::parse("@sam"), Some(ContactKey::Handle("sam")));
        assert_eq!(ContactKey::parse("sam"), Some(ContactKey::Handle("sam")));
        assert_eq!(ContactKey::parse("@"), None);
        assert_eq!(ContactKey::parse("  "), None);
    }
}
