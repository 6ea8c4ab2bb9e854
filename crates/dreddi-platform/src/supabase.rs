use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dreddi_core::{AuthProvider, AuthUser};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::SupabaseConfig;

const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves access tokens against the hosted Supabase Auth `/user` endpoint.
pub struct SupabaseAuth {
    config: SupabaseConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
    email: Option<String>,
}

impl SupabaseAuth {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(AUTH_REQUEST_TIMEOUT)
            .user_agent("dreddi-gateway/0.1")
            .build()
            .context("failed to build auth http client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.config.url)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let response = self
            .http_client
            .get(self.user_endpoint())
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("auth request failed")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("access token rejected by auth backend");
                Ok(None)
            }
            status if status.is_success() => {
                let user: SupabaseUser = response
                    .json()
                    .await
                    .context("auth backend returned an unexpected user payload")?;
                Ok(Some(AuthUser {
                    id: user.id,
                    email: user.email,
                }))
            }
            status => anyhow::bail!("auth backend responded with {status}"),
        }
    }
}
