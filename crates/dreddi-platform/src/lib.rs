pub mod config;
pub mod contracts;
pub mod invite_preview;
pub mod pg_store;
pub mod redis_bus;
pub mod supabase;

pub use config::{ServiceConfig, SupabaseConfig, WorkerConfig};
pub use contracts::{
    CreatePromiseRequest, CreatePromiseResponse, DisputeRequest, ErrorBody, InvitePreview,
    PromiseCreatedEvent, PublicProfileResponse, SetLocaleRequest, SetLocaleResponse,
};
pub use invite_preview::{InvitePreviewCache, load_invite_preview};
pub use pg_store::{PgPromiseStore, connect_database};
pub use redis_bus::{PROMISES_CREATED_CHANNEL, RedisBus};
pub use supabase::SupabaseAuth;
