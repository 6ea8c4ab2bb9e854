use anyhow::{Context, Result};
use chrono::Utc;
use dreddi_core::{NOTIFICATION_PROMISE_INVITE, Notification, PromiseStore};
use dreddi_platform::{
    PROMISES_CREATED_CHANNEL, PgPromiseStore, PromiseCreatedEvent, RedisBus, WorkerConfig,
};
use futures_util::StreamExt;
use redis::Msg;
use tracing::{error, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dreddi_notifier=info".to_string()),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    let store = PgPromiseStore::connect(&config.database_url).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let mut pubsub = redis.subscribe(PROMISES_CREATED_CHANNEL).await?;
    let mut messages = pubsub.on_message();

    info!("notifier subscribed to {}", PROMISES_CREATED_CHANNEL);

    loop {
        let msg = messages
            .next()
            .await
            .context("promises.created stream ended unexpectedly")?;
        if let Err(err) = handle_message(&store, msg).await {
            error!("failed to process message: {err:#}");
        }
    }
}

async fn handle_message(store: &dyn PromiseStore, msg: Msg) -> Result<()> {
    let payload: String = msg.get_payload()?;
    let event: PromiseCreatedEvent = serde_json::from_str(&payload)?;

    if let Some(notification) = deliver_invite(store, &event).await? {
        info!(
            promise_id = %event.promise_id,
            user_id = %notification.user_id,
            "invite notification stored"
        );
    }
    Ok(())
}

/// Records a `promise_invite` notification for the counterparty of a new promise.
async fn deliver_invite(
    store: &dyn PromiseStore,
    event: &PromiseCreatedEvent,
) -> Result<Option<Notification>> {
    let Some(recipient) = store
        .resolve_contact(&event.counterparty_contact)
        .await
        .context("failed to resolve counterparty contact")?
    else {
        warn!(
            promise_id = %event.promise_id,
            "counterparty contact has no account, invite stays link-only"
        );
        return Ok(None);
    };

    if recipient.id == event.creator_id {
        warn!(promise_id = %event.promise_id, "skipping invite addressed to its creator");
        return Ok(None);
    }

    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: recipient.id,
        kind: NOTIFICATION_PROMISE_INVITE.to_string(),
        promise_id: event.promise_id,
        created_at: Utc::now(),
    };
    store.insert_notification(&notification).await?;

    Ok(Some(notification))
}

#[cfg(test)]
mod tests {
    use dreddi_core::Profile;
    use dreddi_store::InMemoryPromiseStore;

    use super::*;

    fn event(creator_id: Uuid, contact: &str) -> PromiseCreatedEvent {
        PromiseCreatedEvent {
            promise_id: Uuid::new_v4(),
            creator_id,
            counterparty_contact: contact.to_string(),
            title: "Return the drill".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn store_with(profile: &Profile) -> InMemoryPromiseStore {
        let store = InMemoryPromiseStore::new();
        store.insert_profile(profile.clone()).await;
        store
    }

    fn kim() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            display_name: Some("Kim".to_string()),
            handle: Some("kim".to_string()),
            email: Some("kim@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn resolved_counterparty_gets_a_notification() {
        let kim = kim();
        let store = store_with(&kim).await;
        let event = event(Uuid::new_v4(), "KIM@example.com");

        let notification = deliver_invite(&store, &event)
            .await
            .unwrap()
            .expect("notification");
        assert_eq!(notification.user_id, kim.id);
        assert_eq!(notification.kind, "promise_invite");
        assert_eq!(notification.promise_id, event.promise_id);
        assert_eq!(store.notifications().await, vec![notification]);
    }

    #[tokio::test]
    async fn unknown_contacts_are_dropped() {
        let store = store_with(&kim()).await;

        let delivered = deliver_invite(&store, &event(Uuid::new_v4(), "@nobody"))
            .await
            .unwrap();
        assert!(delivered.is_none());
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn creator_is_never_notified_of_their_own_promise() {
        let kim = kim();
        let store = store_with(&kim).await;

        let delivered = deliver_invite(&store, &event(kim.id, "@kim")).await.unwrap();
        assert!(delivered.is_none());
        assert!(store.notifications().await.is_empty());
    }
}
