use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use taglink::{
    AuditLogQuery, LoginCredentials, LoginOutcome, NewAuditLogEntry, NewCard, Taglink, UserId,
};
use taglink_core::{RepositoryProvider, storage::CardId};
use tower_http::trace::TraceLayer;

use crate::{
    error::{ApiError, Result},
    extractors::ConnectionInfo,
    types::*,
};

/// Shared router state.
///
/// `taglink` is `None` when the process started without storage
/// configuration; every handler then answers 503 instead of failing later.
pub struct AppState<R: RepositoryProvider> {
    pub taglink: Option<Arc<Taglink<R>>>,
    pub expose_magic_links: bool,
}

impl<R: RepositoryProvider> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            taglink: self.taglink.clone(),
            expose_magic_links: self.expose_magic_links,
        }
    }
}

impl<R: RepositoryProvider> AppState<R> {
    fn taglink(&self) -> Result<&Arc<Taglink<R>>> {
        self.taglink.as_ref().ok_or(ApiError::ConfigurationMissing)
    }
}

pub fn create_router<R>(taglink: Option<Arc<Taglink<R>>>, expose_magic_links: bool) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AppState {
        taglink,
        expose_magic_links,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/users", post(register_handler).get(list_users_handler))
        .route(
            "/cards",
            post(create_card_handler)
                .get(list_cards_handler)
                .delete(delete_card_handler),
        )
        .route(
            "/2fa",
            post(two_factor_setup_handler)
                .put(two_factor_verify_handler)
                .patch(recovery_code_handler),
        )
        .route(
            "/magic-link",
            post(request_magic_link_handler).get(verify_magic_link_handler),
        )
        .route(
            "/trusted-devices",
            post(register_device_handler)
                .get(list_devices_handler)
                .put(validate_device_handler)
                .delete(delete_device_handler),
        )
        .route(
            "/audit-logs",
            get(query_audit_logs_handler).post(record_audit_log_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.taglink()?.health_check().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn login_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Json(payload): Json<LoginRequest>,
) -> Result<Response>
where
    R: RepositoryProvider,
{
    let credentials = LoginCredentials {
        email: payload.email,
        password: payload.password,
        one_time_code: payload.otp_token,
    };

    let outcome = state.taglink()?.login().login(&credentials, &client).await?;

    match outcome {
        LoginOutcome::Success {
            user,
            second_factor_enabled,
        } => Ok(Json(LoginSuccessResponse {
            success: true,
            user,
            two_factor_enabled: second_factor_enabled,
        })
        .into_response()),
        LoginOutcome::NeedsSecondFactor(user) => Ok(Json(SecondFactorRequiredResponse {
            requires_2fa: true,
            user,
        })
        .into_response()),
        LoginOutcome::RateLimited => Err(ApiError::RateLimited),
        // Deliberately indistinguishable: revealing which of the two failed
        // would leak which accounts exist.
        LoginOutcome::NotFound | LoginOutcome::BadPassword => Err(ApiError::InvalidCredentials),
        LoginOutcome::BadSecondFactor => {
            Err(ApiError::Unauthorized("Invalid one-time code".to_string()))
        }
    }
}

async fn register_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = state
        .taglink()?
        .users()
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(vec![user])))
}

async fn list_users_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let users = state.taglink()?.users().list().await?;
    Ok(Json(users))
}

async fn create_card_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let card = state
        .taglink()?
        .cards()
        .create(NewCard {
            uid: payload.uid,
            link: payload.link,
            user_id: UserId::from(payload.user_id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(vec![card])))
}

async fn list_cards_handler<R>(
    State(state): State<AppState<R>>,
    Query(query): Query<CardsQuery>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user_id = query.user_id.map(UserId::from);
    let cards = state.taglink()?.cards().list(user_id.as_ref()).await?;

    Ok(Json(
        cards
            .into_iter()
            .map(CardResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn delete_card_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<DeleteCardRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .taglink()?
        .cards()
        .delete(&CardId::new(&payload.id))
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn two_factor_setup_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<TwoFactorSetupRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let enrollment = state
        .taglink()?
        .two_factor()
        .enroll(&UserId::from(payload.user_id), &payload.email)
        .await?;

    Ok(Json(TwoFactorSetupResponse {
        success: true,
        qr_code: enrollment.qr_code,
        recovery_codes: enrollment.recovery_codes,
    }))
}

async fn two_factor_verify_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<TwoFactorVerifyRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .taglink()?
        .two_factor()
        .confirm(&UserId::from(payload.user_id), &payload.token)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn recovery_code_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<RecoveryCodeRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .taglink()?
        .two_factor()
        .redeem_recovery_code(&UserId::from(payload.user_id), &payload.recovery_code)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn request_magic_link_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Json(payload): Json<MagicLinkRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let issued = state
        .taglink()?
        .magic_links()
        .issue(&payload.email, &client)
        .await?;

    // The raw URL is only echoed back when explicitly enabled for
    // development; delivery is otherwise expected to happen out-of-band.
    let magic_link = state.expose_magic_links.then_some(issued.url);

    Ok(Json(MagicLinkResponse {
        success: true,
        magic_link,
    }))
}

async fn verify_magic_link_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Query(query): Query<MagicLinkVerifyQuery>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = state
        .taglink()?
        .magic_links()
        .redeem(&query.token, &client)
        .await?;

    Ok(Json(MagicLinkUserResponse {
        success: true,
        user,
    }))
}

async fn register_device_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Json(payload): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let device = state
        .taglink()?
        .trusted_devices()
        .register(
            &UserId::from(payload.user_id),
            payload.device_name,
            payload.remember_days,
            &client,
        )
        .await?;

    Ok(Json(RegisterDeviceResponse {
        success: true,
        device_id: device.device_id,
    }))
}

async fn list_devices_handler<R>(
    State(state): State<AppState<R>>,
    Query(query): Query<DeviceListQuery>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let devices = state
        .taglink()?
        .trusted_devices()
        .list(&UserId::from(query.user_id))
        .await?;

    Ok(Json(DeviceListResponse { devices }))
}

async fn validate_device_handler<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<ValidateDeviceRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let valid = state
        .taglink()?
        .trusted_devices()
        .validate(&UserId::from(payload.user_id), &payload.device_id)
        .await?;

    Ok(Json(ValidResponse { valid }))
}

async fn delete_device_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Query(query): Query<DeleteDeviceQuery>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .taglink()?
        .trusted_devices()
        .remove(&UserId::from(query.user_id), &query.device_id, &client)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn query_audit_logs_handler<R>(
    State(state): State<AppState<R>>,
    Query(query): Query<AuditLogsQuery>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let page = state
        .taglink()?
        .audit()
        .query(&AuditLogQuery {
            user_id: query.user_id.map(UserId::from),
            action: query.action,
            entity: query.entity,
            start_date: query.start_date,
            end_date: query.end_date,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(Json(AuditLogsResponse {
        logs: page.entries,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

async fn record_audit_log_handler<R>(
    State(state): State<AppState<R>>,
    ConnectionInfo(client): ConnectionInfo,
    Json(payload): Json<RecordAuditRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let mut entry = NewAuditLogEntry::new(
        UserId::from(payload.user_id),
        &payload.action,
        &payload.entity,
        &client,
    );
    if let Some(entity_id) = payload.entity_id {
        entry = entry.with_entity_id(entity_id);
    }
    if let Some(details) = payload.details {
        entry = entry.with_details(details);
    }

    state.taglink()?.audit().record(entry).await?;

    Ok(Json(SuccessResponse { success: true }))
}
