use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

pub const DEFAULT_LOCALE: Locale = Locale::En;
pub const SUPPORTED_LOCALES: [Locale; 2] = [Locale::En, Locale::Uk];
pub const LOCALE_COOKIE: &str = "locale";
pub const LOCALE_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;

const PASS_THROUGH_PREFIXES: [&str; 4] = ["/api", "/assets", "/auth", "/healthz"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Uk,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Uk => "uk",
        }
    }

    pub fn group_separator(&self) -> char {
        match self {
            Locale::En => ',',
            Locale::Uk => '\u{a0}',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            Locale::En => '.',
            Locale::Uk => ',',
        }
    }
}

impl FromStr for Locale {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SUPPORTED_LOCALES
            .into_iter()
            .find(|locale| locale.as_str() == value)
            .ok_or_else(|| ParseError::Unsupported {
                field: "locale",
                value: value.to_string(),
            })
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an unprefixed page request should be sent, or `None` to serve it as is.
pub fn redirect_target(path: &str, query: Option<&str>) -> Option<String> {
    if is_pass_through(path) {
        return None;
    }

    let first_segment = path.trim_start_matches('/').split('/').next().unwrap_or("");
    if first_segment.parse::<Locale>().is_ok() {
        return None;
    }

    let mut target = format!("/{}", DEFAULT_LOCALE.as_str());
    if path != "/" {
        if !path.starts_with('/') {
            target.push('/');
        }
        target.push_str(path);
    }
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    Some(target)
}

fn is_pass_through(path: &str) -> bool {
    let prefixed = PASS_THROUGH_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    });
    if prefixed {
        return true;
    }

    // static files
    path.rsplit('/')
        .next()
        .is_some_and(|segment| segment.contains('.'))
}
