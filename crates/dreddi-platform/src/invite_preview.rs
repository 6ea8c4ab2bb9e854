use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use dreddi_core::{ProfileIdentity, PromiseStore};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::contracts::InvitePreview;

struct CachedPreview {
    preview: Option<InvitePreview>,
    expires_at: Instant,
}

/// Read-through cache for invite previews with a fixed revalidation window.
///
/// Concurrent misses for the same token may each hit the store.
pub struct InvitePreviewCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedPreview>>,
}

impl InvitePreviewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, store: &dyn PromiseStore, token: &str) -> Option<InvitePreview> {
        if let Some(preview) = self.cached(token).await {
            debug!(token = %token, "invite preview served from cache");
            return preview;
        }

        match load_invite_preview(store, token).await {
            Ok(preview) => {
                self.remember(token, preview.clone()).await;
                preview
            }
            Err(err) => {
                warn!(token = %token, "invite preview lookup failed: {err:#}");
                None
            }
        }
    }

    async fn cached(&self, token: &str) -> Option<Option<InvitePreview>> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.preview.clone())
    }

    async fn remember(&self, token: &str, preview: Option<InvitePreview>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, cached| cached.expires_at > now);
        entries.insert(
            token.to_string(),
            CachedPreview {
                preview,
                expires_at: now + self.ttl,
            },
        );
    }
}

pub async fn load_invite_preview(
    store: &dyn PromiseStore,
    token: &str,
) -> Result<Option<InvitePreview>> {
    let Some(promise) = store.find_by_invite_token(token).await? else {
        return Ok(None);
    };
    let creator = store
        .get_profile(promise.creator_id)
        .await?
        .map(|profile| ProfileIdentity::from(&profile))
        .unwrap_or_else(|| ProfileIdentity::resolve(None, None));

    Ok(Some(InvitePreview {
        promise_id: promise.id,
        title: promise.title,
        creator,
        due_at: promise.due_at,
        invite_status: promise.invite_status,
        executor: promise.executor,
        condition_text: promise.condition_text,
    }))
}
