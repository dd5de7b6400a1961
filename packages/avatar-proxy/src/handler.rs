use std::any::Any;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use avatar_core::{RelayError, UpstreamError, ValidationError, avatar_url, validate_user_id};

const CACHE_CONTROL_PRIVATE: &str = "private, no-store";

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `GET /api/proxy-avatar?src=...`
///
/// `src` が複数ある場合は最初のものを使う。
pub async fn proxy_avatar(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let src = params
        .into_iter()
        .find(|(key, _)| key == "src")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingSrc)?;

    relay(&state, &src, &headers).await
}

/// `GET /api/proxy-avatar/{user_id}`
pub async fn proxy_user_avatar(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = validate_user_id(&user_id)?;
    let src = avatar_url(state.origin.allowed(), &user_id);

    relay(&state, &src, &headers).await
}

async fn relay(state: &AppState, src: &str, headers: &HeaderMap) -> Result<Response, AppError> {
    let image = state
        .upstream
        .fetch_checked(&state.origin, src, forwarded_cookie(headers))
        .await?;

    tracing::debug!(
        content_type = %image.content_type,
        content_length = ?image.content_length,
        "relaying image"
    );

    let mut builder = axum::http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &image.content_type)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_PRIVATE);
    if let Some(length) = image.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(image.into_stream()))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// 受信した Cookie ヘッダーを上流向けに取り出す
///
/// HTTP/2 では Cookie が複数ヘッダーに分割されるため `; ` で連結する。
fn forwarded_cookie(headers: &HeaderMap) -> Option<HeaderValue> {
    let mut values = headers.get_all(header::COOKIE).iter();
    let first = values.next()?;

    let rest: Vec<&HeaderValue> = values.collect();
    if rest.is_empty() {
        return Some(first.clone());
    }

    let mut joined = first.as_bytes().to_vec();
    for value in rest {
        joined.extend_from_slice(b"; ");
        joined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&joined).ok()
}

/// ハンドラ内の panic を 500 に変換する
pub fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal("handler panicked".to_string()).into_response()
}

#[derive(Debug)]
pub enum AppError {
    MissingSrc,
    InvalidUserId,
    ForbiddenHost,
    Upstream(StatusCode),
    UpstreamTimeout,
    NotAnImage,
    TooLarge,
    Internal(String),
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(validation_err) => validation_err.into(),
            RelayError::Upstream(upstream_err) => upstream_err.into(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingSrc => {
                tracing::warn!("src parameter missing");
                AppError::MissingSrc
            }
            ValidationError::ForbiddenHost => {
                tracing::warn!("src rejected by origin check");
                AppError::ForbiddenHost
            }
            ValidationError::InvalidUserId(msg) => {
                tracing::warn!(error = %msg, "invalid user id");
                AppError::InvalidUserId
            }
            ValidationError::InvalidAllowedOrigin(msg) => AppError::Internal(msg),
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status } => {
                tracing::warn!(status = %status, "upstream returned non-success status");
                AppError::Upstream(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
            }
            UpstreamError::Timeout => {
                tracing::error!("upstream timed out");
                AppError::UpstreamTimeout
            }
            UpstreamError::NotAnImage { content_type } => {
                tracing::warn!(content_type = %content_type, "upstream content is not an image");
                AppError::NotAnImage
            }
            UpstreamError::TooLarge { size, max } => {
                tracing::warn!(size = %size, max = %max, "upstream payload too large");
                AppError::TooLarge
            }
            UpstreamError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingSrc => (StatusCode::BAD_REQUEST, "Missing src"),
            AppError::InvalidUserId => (StatusCode::BAD_REQUEST, "Invalid user id"),
            AppError::ForbiddenHost => (StatusCode::FORBIDDEN, "Forbidden host"),
            AppError::Upstream(status) => (status, "Upstream error"),
            AppError::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "Upstream error"),
            AppError::NotAnImage => (StatusCode::NOT_FOUND, "Not an image"),
            AppError::TooLarge => (StatusCode::BAD_GATEWAY, "Upstream too large"),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "proxy error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Proxy error")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_cookie_single() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        assert_eq!(
            forwarded_cookie(&headers),
            Some(HeaderValue::from_static("session=abc"))
        );
    }

    #[test]
    fn test_forwarded_cookie_split_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(
            forwarded_cookie(&headers),
            Some(HeaderValue::from_static("a=1; b=2"))
        );
    }

    #[test]
    fn test_forwarded_cookie_absent() {
        assert_eq!(forwarded_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (AppError::MissingSrc, StatusCode::BAD_REQUEST),
            (AppError::InvalidUserId, StatusCode::BAD_REQUEST),
            (AppError::ForbiddenHost, StatusCode::FORBIDDEN),
            (AppError::Upstream(StatusCode::UNAUTHORIZED), StatusCode::UNAUTHORIZED),
            (AppError::UpstreamTimeout, StatusCode::GATEWAY_TIMEOUT),
            (AppError::NotAnImage, StatusCode::NOT_FOUND),
            (AppError::TooLarge, StatusCode::BAD_GATEWAY),
            (AppError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
            assert!(
                response.headers()[header::CONTENT_TYPE]
                    .to_str()
                    .unwrap()
                    .starts_with("text/plain")
            );
        }
    }

    #[test]
    fn test_relay_error_conversion() {
        let err = AppError::from(RelayError::from(ValidationError::ForbiddenHost));
        assert!(matches!(err, AppError::ForbiddenHost));

        let err = AppError::from(RelayError::from(UpstreamError::Timeout));
        assert!(matches!(err, AppError::UpstreamTimeout));
    }

    #[test]
    fn test_upstream_status_is_forwarded() {
        let err = AppError::from(UpstreamError::Status { status: 404 });
        assert!(matches!(err, AppError::Upstream(StatusCode::NOT_FOUND)));
    }
}
