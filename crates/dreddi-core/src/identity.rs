use serde::{Deserialize, Serialize};

use crate::models::Profile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

impl ProfileIdentity {
    pub fn resolve(display_name: Option<&str>, handle: Option<&str>) -> Self {
        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());
        let handle = handle
            .map(|handle| handle.trim().trim_start_matches('@'))
            .filter(|handle| !handle.is_empty());

        match (display_name, handle) {
            (Some(name), Some(handle)) => {
                let subtitle = format!("@{handle}");
                let duplicate = name == handle || name == subtitle;
                Self {
                    title: name.to_string(),
                    subtitle: (!duplicate).then_some(subtitle),
                }
            }
            (Some(name), None) => Self {
                title: name.to_string(),
                subtitle: None,
            },
            (None, Some(handle)) => Self {
                title: format!("@{handle}"),
                subtitle: None,
            },
            (None, None) => Self {
                title: String::new(),
                subtitle: None,
            },
        }
    }
}

impl From<&Profile> for ProfileIdentity {
    fn from(profile: &Profile) -> Self {
        Self::resolve(profile.display_name.as_deref(), profile.handle.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_wins_and_handle_becomes_subtitle() {
        assert_eq!(
            ProfileIdentity::resolve(Some("Jane"), Some("jane99")),
            ProfileIdentity {
                title: "Jane".to_string(),
                subtitle: Some("@jane99".to_string()),
            }
        );
    }

    #[test]
    fn handle_alone_is_prefixed() {
        assert_eq!(
            ProfileIdentity::resolve(None, Some("jane99")),
            ProfileIdentity {
                title: "@jane99".to_string(),
                subtitle: None,
            }
        );
    }

    #[test]
    fn empty_profile_has_empty_title() {
        assert_eq!(
            ProfileIdentity::resolve(None, None),
            ProfileIdentity {
                title: String::new(),
                subtitle: None,
            }
        );
        assert_eq!(ProfileIdentity::resolve(Some("  "), Some("")).title, "");
    }

    #[test]
    fn subtitle_dropped_when_it_duplicates_title() {
        assert_eq!(ProfileIdentity::resolve(Some("jane99"), Some("jane99")).subtitle, None);
        assert_eq!(ProfileIdentity::resolve(Some("@jane99"), Some("jane99")).subtitle, None);
    }

    #[test]
    fn names_differing_only_in_case_keep_the_subtitle() {
        assert_eq!(
            ProfileIdentity::resolve(Some("Jane99"), Some("jane99")),
            ProfileIdentity {
                title: "Jane99".to_string(),
                subtitle: Some("@jane99".to_string()),
            }
        );
    }
}
