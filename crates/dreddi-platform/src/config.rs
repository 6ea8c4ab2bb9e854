use anyhow::{Context, Result};
use dreddi_core::FeatureAllowlist;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_INVITE_PREVIEW_TTL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub http_addr: String,
    pub supabase: SupabaseConfig,
    pub group_deals_allowlist: FeatureAllowlist,
    pub public_base_url: String,
    pub invite_preview_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let supabase_url = var("SUPABASE_URL")
            .or_else(|| var("NEXT_PUBLIC_SUPABASE_URL"))
            .context("SUPABASE_URL (or NEXT_PUBLIC_SUPABASE_URL) is required")?;
        let anon_key = var("SUPABASE_ANON_KEY")
            .or_else(|| var("NEXT_PUBLIC_SUPABASE_ANON_KEY"))
            .context("SUPABASE_ANON_KEY (or NEXT_PUBLIC_SUPABASE_ANON_KEY) is required")?;

        let invite_preview_ttl_secs = match var("INVITE_PREVIEW_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("INVITE_PREVIEW_TTL_SECS must be an integer, got '{raw}'"))?,
            None => DEFAULT_INVITE_PREVIEW_TTL_SECS,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            redis_url: var("REDIS_URL"),
            http_addr: var("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string()),
            supabase: SupabaseConfig {
                url: supabase_url.trim_end_matches('/').to_string(),
                anon_key,
            },
            group_deals_allowlist: FeatureAllowlist::parse(
                &var("GROUP_DEALS_ALLOWLIST").unwrap_or_default(),
            ),
            public_base_url: var("DREDDI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            invite_preview_ttl_secs,
        })
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;

        Ok(Self {
            database_url,
            redis_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_public_supabase_names_and_defaults() {
        let config = ServiceConfig::from_lookup(
            "0.0.0.0:3000",
            lookup(&[
                ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co/"),
                ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
                ("GROUP_DEALS_ALLOWLIST", "abc,foo@bar.com"),
            ]),
        )
        .unwrap();

        assert_eq!(config.supabase.url, "https://abc.supabase.co");
        assert_eq!(config.http_addr, "0.0.0.0:3000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.group_deals_allowlist.len(), 2);
        assert_eq!(config.public_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.invite_preview_ttl_secs, 60);
    }

    #[test]
    fn missing_supabase_settings_are_rejected() {
        let err = ServiceConfig::from_lookup("0.0.0.0:3000", lookup(&[("SUPABASE_ANON_KEY", "k")]))
            .unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn rejects_non_numeric_ttl() {
        let err = ServiceConfig::from_lookup(
            "0.0.0.0:3000",
            lookup(&[
                ("SUPABASE_URL", "https://abc.supabase.co"),
                ("SUPABASE_ANON_KEY", "anon"),
                ("INVITE_PREVIEW_TTL_SECS", "soon"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("INVITE_PREVIEW_TTL_SECS"));
    }
}
