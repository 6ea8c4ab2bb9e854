use std::collections::HashMap;

use async_trait::async_trait;
use dreddi_core::{
    ContactKey, Notification, Profile, Promise, PromiseStore, PromiseVersion, ReputationCounts,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryPromiseStore {
    promises: RwLock<HashMap<Uuid, Promise>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryPromiseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.id, profile);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait]
impl PromiseStore for InMemoryPromiseStore {
    async fn insert_promise(&self, promise: &Promise) -> anyhow::Result<()> {
        let mut promises = self.promises.write().await;
        if promises.contains_key(&promise.id) {
            anyhow::bail!("promise {} already exists", promise.id);
        }
        promises.insert(promise.id, promise.clone());
        Ok(())
    }

    async fn get_promise(&self, promise_id: Uuid) -> anyhow::Result<Option<Promise>> {
        Ok(self.promises.read().await.get(&promise_id).cloned())
    }

    async fn find_by_invite_token(&self, token: &str) -> anyhow::Result<Option<Promise>> {
        let promises = self.promises.read().await;
        Ok(promises
            .values()
            .find(|promise| promise.invite_token == token)
            .cloned())
    }

    async fn update_promise(
        &self,
        promise: &Promise,
        expected: PromiseVersion,
    ) -> anyhow::Result<bool> {
        let mut promises = self.promises.write().await;
        match promises.get_mut(&promise.id) {
            Some(stored) if stored.version() == expected => {
                *stored = promise.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => anyhow::bail!("promise {} not found", promise.id),
        }
    }

    async fn get_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn find_profile_by_handle(&self, handle: &str) -> anyhow::Result<Option<Profile>> {
        let handle = handle.trim().trim_start_matches('@');
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .find(|profile| {
                profile
                    .handle
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(handle))
            })
            .cloned())
    }

    async fn resolve_contact(&self, contact: &str) -> anyhow::Result<Option<Profile>> {
        match ContactKey::parse(contact) {
            Some(ContactKey::Handle(handle)) => self.find_profile_by_handle(handle).await,
            Some(ContactKey::Email(email)) => {
                let profiles = self.profiles.read().await;
                Ok(profiles
                    .values()
                    .find(|profile| {
                        profile
                            .email
                            .as_deref()
                            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
                    })
                    .cloned())
            }
            None => Ok(None),
        }
    }

    async fn reputation_counts(&self, user_id: Uuid) -> anyhow::Result<ReputationCounts> {
        let promises = self.promises.read().await;
        Ok(ReputationCounts::tally(user_id, promises.values()))
    }

    async fn insert_notification(&self, notification: &Notification) -> anyhow::Result<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dreddi_core::{Executor, InviteStatus, PromiseDraft, Visibility};

    fn profile(handle: &str, email: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            display_name: None,
            handle: Some(handle.to_string()),
            email: Some(email.to_string()),
        }
    }

    fn promise(creator: Uuid) -> Promise {
        Promise::open(
            PromiseDraft {
                title: "Water the plants".to_string(),
                details: None,
                counterparty_contact: "@kim".to_string(),
                counterparty_id: None,
                due_at: None,
                executor: Executor::Me,
                visibility: Visibility::Private,
                condition_text: None,
            },
            creator,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn resolves_contacts_by_handle_or_email() {
        let store = InMemoryPromiseStore::new();
        let kim = profile("Kim", "kim@example.com");
        store.insert_profile(kim.clone()).await;

        assert_eq!(store.resolve_contact("@kim").await.unwrap(), Some(kim.clone()));
        assert_eq!(
            store.resolve_contact("KIM@example.com").await.unwrap(),
            Some(kim)
        );
        assert_eq!(store.resolve_contact("@lee").await.unwrap(), None);
    }

    #[tokio::test]
    async fn promises_round_trip_by_id_and_token() {
        let store = InMemoryPromiseStore::new();
        let mut stored = promise(Uuid::new_v4());
        store.insert_promise(&stored).await.unwrap();
        assert!(store.insert_promise(&stored).await.is_err());

        let by_token = store
            .find_by_invite_token(&stored.invite_token)
            .await
            .unwrap();
        assert_eq!(by_token.as_ref(), Some(&stored));

        stored.title = "Water the garden".to_string();
        assert!(store.update_promise(&stored, stored.version()).await.unwrap());
        let reloaded = store.get_promise(stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Water the garden");
    }

    #[tokio::test]
    async fn updating_unknown_promise_fails() {
        let store = InMemoryPromiseStore::new();
        let unknown = promise(Uuid::new_v4());
        assert!(store.update_promise(&unknown, unknown.version()).await.is_err());
    }

    #[tokio::test]
    async fn stale_writes_are_rejected() {
        let store = InMemoryPromiseStore::new();
        let stored = promise(Uuid::new_v4());
        store.insert_promise(&stored).await.unwrap();
        let opened = stored.version();

        let mut first = stored.clone();
        first.invite_status = InviteStatus::Accepted;
        first.counterparty_id = Some(Uuid::new_v4());
        assert!(store.update_promise(&first, opened).await.unwrap());

        let mut second = stored.clone();
        second.invite_status = InviteStatus::Accepted;
        second.counterparty_id = Some(Uuid::new_v4());
        assert!(!store.update_promise(&second, opened).await.unwrap());

        let reloaded = store.get_promise(stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded.counterparty_id, first.counterparty_id);
    }
}
