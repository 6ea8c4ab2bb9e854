use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::AuthUser;

/// User ids and emails granted early access, fixed for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct FeatureAllowlist {
    entries: HashSet<String>,
}

impl FeatureAllowlist {
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn allows(&self, user: Option<&AuthUser>) -> bool {
        user.is_some_and(|user| self.allows_raw(&user.id.to_string(), user.email.as_deref()))
    }

    pub fn allows_raw(&self, id: &str, email: Option<&str>) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.contains(&id.trim().to_lowercase())
            || email.is_some_and(|email| self.entries.contains(&email.trim().to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub group_deals_enabled: bool,
}

impl FeatureFlags {
    pub fn for_user(allowlist: &FeatureAllowlist, user: Option<&AuthUser>) -> Self {
        Self {
            group_deals_enabled: allowlist.allows(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn matches_ids_case_insensitively() {
        let allowlist = FeatureAllowlist::parse("abc,foo@bar.com");
        assert!(allowlist.allows_raw("ABC", None));
        assert!(!allowlist.allows_raw("xyz", None));
    }

    #[test]
    fn matches_emails_case_insensitively() {
        let allowlist = FeatureAllowlist::parse("abc, foo@bar.com ,");
        assert_eq!(allowlist.len(), 2);
        assert!(allowlist.allows_raw("xyz", Some("FOO@BAR.COM")));
    }

    #[test]
    fn empty_allowlist_allows_nobody() {
        let allowlist = FeatureAllowlist::parse(" , ");
        assert!(allowlist.is_empty());
        assert!(!allowlist.allows_raw("abc", Some("foo@bar.com")));
    }

    #[test]
    fn uuid_users_and_anonymous_requests() {
        let id = Uuid::new_v4();
        let allowlist = FeatureAllowlist::parse(&id.to_string().to_uppercase());
        let user = AuthUser { id, email: None };

        assert!(FeatureFlags::for_user(&allowlist, Some(&user)).group_deals_enabled);
        assert!(!FeatureFlags::for_user(&allowlist, None).group_deals_enabled);
    }
}
