use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use taglink_core::storage::ClientInfo;

/// Extracts the caller's connection details from the request headers.
///
/// The source address is the first `x-forwarded-for` value; callers without
/// the header are recorded as `"unknown"`.
#[derive(Debug, Clone)]
pub struct ConnectionInfo(pub ClientInfo);

impl<S> FromRequestParts<S> for ConnectionInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let source_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(ConnectionInfo(ClientInfo::new(source_address, user_agent)))
    }
}
