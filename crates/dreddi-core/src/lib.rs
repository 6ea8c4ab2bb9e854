pub mod error;
pub mod flags;
pub mod identity;
mod lifecycle;
pub mod locale;
pub mod models;
pub mod reputation;
pub mod storage;

pub use error::{ParseError, PromiseError};
pub use flags::{FeatureAllowlist, FeatureFlags};
pub use identity::ProfileIdentity;
pub use locale::{DEFAULT_LOCALE, LOCALE_COOKIE, LOCALE_COOKIE_MAX_AGE_SECS, Locale, redirect_target};
pub use models::{
    AuthUser, Executor, InviteStatus, NOTIFICATION_PROMISE_INVITE, Notification, Profile, Promise,
    PromiseDraft, PromiseMode, PromiseStatus, PromiseVersion, Visibility,
};
pub use reputation::{ReputationCounts, format_score};
pub use storage::{AuthProvider, ContactKey, PromiseStore};
