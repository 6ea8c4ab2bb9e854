use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use dreddi_core::{
    AuthProvider, AuthUser, DEFAULT_LOCALE, Executor, FeatureAllowlist, FeatureFlags,
    LOCALE_COOKIE, LOCALE_COOKIE_MAX_AGE_SECS, Locale, ProfileIdentity, Promise, PromiseDraft,
    PromiseError, PromiseStore, Visibility, format_score, redirect_target,
};
use dreddi_platform::{
    CreatePromiseRequest, CreatePromiseResponse, DisputeRequest, ErrorBody, InvitePreview,
    InvitePreviewCache, PROMISES_CREATED_CHANNEL, PgPromiseStore, PromiseCreatedEvent,
    PublicProfileResponse, RedisBus, ServiceConfig, SetLocaleRequest, SetLocaleResponse,
    SupabaseAuth,
};
use dreddi_store::InMemoryPromiseStore;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod profile_card;

const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
const TITLE_MAX_CHARS: usize = 200;

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Clone)]
struct AppState {
    store: Arc<dyn PromiseStore>,
    auth: Arc<dyn AuthProvider>,
    invite_previews: Arc<InvitePreviewCache>,
    allowlist: Arc<FeatureAllowlist>,
    events: Option<RedisBus>,
    public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProfileQuery {
    locale: Option<String>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "dreddi_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:3000")?;

    let store: Arc<dyn PromiseStore> = match config.database_url.as_deref() {
        Some(database_url) => Arc::new(PgPromiseStore::connect(database_url).await?),
        None => {
            warn!("DATABASE_URL not set, promises are kept in memory");
            Arc::new(InMemoryPromiseStore::new())
        }
    };
    let events = match config.redis_url.as_deref() {
        Some(redis_url) => Some(RedisBus::connect(redis_url)?),
        None => {
            warn!("REDIS_URL not set, promise events will not be published");
            None
        }
    };
    info!(
        entries = config.group_deals_allowlist.len(),
        "group deals allowlist loaded"
    );

    let state = AppState {
        store,
        auth: Arc::new(SupabaseAuth::new(config.supabase.clone())?),
        invite_previews: Arc::new(InvitePreviewCache::new(Duration::from_secs(
            config.invite_preview_ttl_secs,
        ))),
        allowlist: Arc::new(config.group_deals_allowlist.clone()),
        events,
        public_base_url: config.public_base_url.clone(),
    };

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("dreddi gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/feature-flags", get(feature_flags))
        .route("/api/locale", post(set_locale))
        .route("/api/promises/create", post(create_promise))
        .route(
            "/api/promises/{promise_id}/condition-met",
            post(mark_condition_met),
        )
        .route("/api/promises/{promise_id}/complete", post(complete_promise))
        .route("/api/promises/{promise_id}/confirm", post(confirm_promise))
        .route("/api/promises/{promise_id}/dispute", post(dispute_promise))
        .route("/api/invites/{token}", get(invite_preview))
        .route("/api/invites/{token}/accept", post(accept_invite))
        .route("/api/invites/{token}/decline", post(decline_invite))
        .route("/api/profiles/{handle}", get(public_profile))
        .route("/{locale}/u/{handle}", get(profile_page))
        .fallback(not_found)
        .layer(middleware::from_fn(locale_redirect))
        .with_state(state)
}

async fn locale_redirect(request: Request, next: Next) -> Response {
    let uri = request.uri();
    if let Some(target) = redirect_target(uri.path(), uri.query()) {
        debug!(from = %uri, to = %target, "redirecting to default locale");
        return Redirect::temporary(&target).into_response();
    }

    next.run(request).await
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not found")
}

async fn feature_flags(State(state): State<AppState>, headers: HeaderMap) -> Json<FeatureFlags> {
    let user = match current_user(&state, &headers).await {
        Ok(user) => user,
        Err(err) => {
            warn!("treating feature flag request as anonymous: {}", err.1.error);
            None
        }
    };

    Json(FeatureFlags::for_user(&state.allowlist, user.as_ref()))
}

async fn set_locale(
    payload: Result<Json<SetLocaleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(invalid_request)?;
    let locale: Locale = payload.locale.trim().parse().map_err(invalid_request)?;

    let cookie = format!(
        "{LOCALE_COOKIE}={locale}; Path=/; Max-Age={LOCALE_COOKIE_MAX_AGE_SECS}; SameSite=Lax"
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SetLocaleResponse { ok: true, locale }),
    ))
}

async fn create_promise(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePromiseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePromiseResponse>), ApiError> {
    let user = require_user(&state, &headers).await?;
    let Json(payload) = payload.map_err(invalid_request)?;

    let now = Utc::now();
    let mut draft = validate_create_request(&payload, now).map_err(invalid_request)?;

    let counterparty = state
        .store
        .resolve_contact(&draft.counterparty_contact)
        .await
        .map_err(internal_error)?;
    if let Some(profile) = &counterparty {
        if profile.id == user.id {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "you cannot make a promise with yourself",
            ));
        }
    }
    draft.counterparty_id = counterparty.map(|profile| profile.id);

    let promise = Promise::open(draft, user.id, now);
    state
        .store
        .insert_promise(&promise)
        .await
        .map_err(internal_error)?;

    info!(
        promise_id = %promise.id,
        creator_id = %user.id,
        counterparty_resolved = promise.counterparty_id.is_some(),
        "promise created"
    );
    publish_created(&state, &promise).await;

    let locale = request_locale(&headers);
    let invite_url = format!(
        "{}/{}/i/{}",
        state.public_base_url, locale, promise.invite_token
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatePromiseResponse {
            promise,
            invite_url,
        }),
    ))
}

async fn publish_created(state: &AppState, promise: &Promise) {
    let Some(events) = &state.events else {
        return;
    };

    let event = PromiseCreatedEvent::from(promise);
    if let Err(err) = events.publish_json(PROMISES_CREATED_CHANNEL, &event).await {
        error!(promise_id = %promise.id, "failed to publish promise event: {err:#}");
    }
}

async fn invite_preview(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitePreview>, ApiError> {
    state
        .invite_previews
        .get(state.store.as_ref(), token.trim())
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "invite not found"))
}

async fn accept_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let promise = load_by_invite_token(&state, &token).await?;

    apply_transition(&state, promise, |promise, now| {
        promise.accept_invite(user.id, now)
    })
    .await
}

async fn decline_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let promise = load_by_invite_token(&state, &token).await?;

    apply_transition(&state, promise, |promise, now| {
        promise.decline_invite(user.id, now)
    })
    .await
}

async fn mark_condition_met(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(promise_id): Path<Uuid>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let promise = load_by_id(&state, promise_id).await?;

    apply_transition(&state, promise, |promise, now| {
        promise.mark_condition_met(user.id, now)
    })
    .await
}

async fn complete_promise(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(promise_id): Path<Uuid>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let promise = load_by_id(&state, promise_id).await?;

    apply_transition(&state, promise, |promise, now| {
        promise.mark_completed(user.id, now)
    })
    .await
}

async fn confirm_promise(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(promise_id): Path<Uuid>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let promise = load_by_id(&state, promise_id).await?;

    apply_transition(&state, promise, |promise, now| promise.confirm(user.id, now)).await
}

async fn dispute_promise(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(promise_id): Path<Uuid>,
    payload: Result<Json<DisputeRequest>, JsonRejection>,
) -> Result<Json<Promise>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let Json(payload) = payload.map_err(invalid_request)?;
    let promise = load_by_id(&state, promise_id).await?;

    apply_transition(&state, promise, |promise, now| {
        promise.dispute(user.id, &payload.reason, now)
    })
    .await
}

async fn public_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(handle): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let locale = match query.locale.as_deref() {
        Some(raw) => raw.trim().parse().map_err(invalid_request)?,
        None => request_locale(&headers),
    };

    load_public_profile(&state, &handle, locale).await.map(Json)
}

async fn profile_page(
    State(state): State<AppState>,
    Path((locale, handle)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let locale: Locale = locale
        .parse()
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "not found"))?;
    let profile = load_public_profile(&state, &handle, locale).await?;

    profile_card::render(&profile)
        .map(Html)
        .map_err(internal_error)
}

async fn load_public_profile(
    state: &AppState,
    handle: &str,
    locale: Locale,
) -> Result<PublicProfileResponse, ApiError> {
    let profile = state
        .store
        .find_profile_by_handle(handle)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "profile not found"))?;
    let counts = state
        .store
        .reputation_counts(profile.id)
        .await
        .map_err(internal_error)?;
    let score = counts.score();

    Ok(PublicProfileResponse {
        handle: profile.handle.clone().unwrap_or_default(),
        identity: ProfileIdentity::from(&profile),
        counts,
        has_history: counts.has_history(),
        score,
        score_display: format_score(score, locale),
        locale,
    })
}

async fn load_by_id(state: &AppState, promise_id: Uuid) -> Result<Promise, ApiError> {
    state
        .store
        .get_promise(promise_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "promise not found"))
}

async fn load_by_invite_token(state: &AppState, token: &str) -> Result<Promise, ApiError> {
    state
        .store
        .find_by_invite_token(token.trim())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "invite not found"))
}

async fn apply_transition<F>(
    state: &AppState,
    mut promise: Promise,
    transition: F,
) -> Result<Json<Promise>, ApiError>
where
    F: FnOnce(&mut Promise, DateTime<Utc>) -> Result<(), PromiseError>,
{
    let expected = promise.version();
    transition(&mut promise, Utc::now()).map_err(promise_error)?;
    let written = state
        .store
        .update_promise(&promise, expected)
        .await
        .map_err(internal_error)?;
    if !written {
        warn!(promise_id = %promise.id, "lifecycle write lost to a concurrent update");
        return Err(api_error(
            StatusCode::CONFLICT,
            "promise was changed by another request",
        ));
    }

    info!(
        promise_id = %promise.id,
        status = %promise.status,
        invite_status = %promise.invite_status,
        "promise updated"
    );
    Ok(Json(promise))
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, ApiError> {
    let Some(token) = access_token(headers) else {
        return Ok(None);
    };

    state.auth.user_for_token(token).await.map_err(|err| {
        error!("auth backend unavailable: {err:#}");
        api_error(StatusCode::BAD_GATEWAY, "authentication backend unavailable")
    })
}

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    current_user(state, headers)
        .await?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "authentication required"))
}

fn access_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn request_locale(headers: &HeaderMap) -> Locale {
    cookie_value(headers, LOCALE_COOKIE)
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_LOCALE)
}

fn validate_create_request(
    payload: &CreatePromiseRequest,
    now: DateTime<Utc>,
) -> AnyResult<PromiseDraft> {
    let title = payload.title.trim();
    if title.is_empty() {
        anyhow::bail!("title is required");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        anyhow::bail!("title must be at most {TITLE_MAX_CHARS} characters");
    }

    let counterparty_contact = payload.counterparty_contact.trim();
    if counterparty_contact.is_empty() || counterparty_contact == "@" {
        anyhow::bail!("counterpartyContact is required");
    }

    let due_at = match non_empty(payload.due_at.as_deref()) {
        Some(raw) => {
            let due_at = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| anyhow::anyhow!("dueAt must be an RFC 3339 timestamp"))?
                .with_timezone(&Utc);
            if due_at < now {
                anyhow::bail!("dueAt must not be in the past");
            }
            Some(due_at)
        }
        None => None,
    };

    let executor = match non_empty(payload.executor.as_deref()) {
        Some(raw) => raw.parse::<Executor>()?,
        None => Executor::Me,
    };
    let visibility = match non_empty(payload.visibility.as_deref()) {
        Some(raw) => raw.parse::<Visibility>()?,
        None => Visibility::Private,
    };

    Ok(PromiseDraft {
        title: title.to_string(),
        details: non_empty(payload.details.as_deref()).map(str::to_string),
        counterparty_contact: counterparty_contact.to_string(),
        counterparty_id: None,
        due_at,
        executor,
        visibility,
        condition_text: non_empty(payload.condition.as_deref()).map(str::to_string),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn invalid_request(err: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, err.to_string())
}

fn promise_error(err: PromiseError) -> ApiError {
    let status = match &err {
        PromiseError::Validation(_) => StatusCode::BAD_REQUEST,
        PromiseError::Forbidden(_) => StatusCode::FORBIDDEN,
        PromiseError::Conflict(_) => StatusCode::CONFLICT,
    };
    api_error(status, err.to_string())
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!("request failed: {err}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
