use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{
    HeaderValue, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, PRAGMA,
};
use reqwest::redirect::Policy;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, FALLBACK_CONTENT_TYPE, MAX_IMAGE_SIZE,
    MAX_REDIRECTS,
};
use crate::errors::{RelayError, UpstreamError};
use crate::validation::{is_image_content_type, OriginGuard};

/// 上流クライアントの設定
#[derive(Debug, Clone, Copy)]
pub struct UpstreamOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_size: u64,
}

impl Default for UpstreamOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_size: MAX_IMAGE_SIZE,
        }
    }
}

/// バックエンドから画像を取得するクライアント
///
/// 呼び出し元の Cookie をそのまま転送し、キャッシュは使わない。
/// リダイレクトは許可オリジン内のみ追従する。
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    max_size: u64,
}

impl UpstreamClient {
    pub fn new(guard: OriginGuard, options: UpstreamOptions) -> Result<Self, UpstreamError> {
        let redirect = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if guard.permits(attempt.url().as_str()) {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .redirect(redirect)
            .user_agent(concat!("avatar-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            max_size: options.max_size,
        })
    }

    /// 許可オリジンを確認してから `fetch` する
    pub async fn fetch_checked(
        &self,
        guard: &OriginGuard,
        src: &str,
        cookie: Option<HeaderValue>,
    ) -> Result<UpstreamImage, RelayError> {
        guard.check(src)?;
        Ok(self.fetch(src, cookie).await?)
    }

    /// `src` から画像を取得し、ヘッダーを検証する
    ///
    /// `cookie` が None の場合も空の Cookie ヘッダーを送る。
    /// ボディはまだ読み込まない。
    pub async fn fetch(
        &self,
        src: &str,
        cookie: Option<HeaderValue>,
    ) -> Result<UpstreamImage, UpstreamError> {
        let cookie = cookie.unwrap_or_else(|| HeaderValue::from_static(""));

        let response = self
            .client
            .get(src)
            .header(COOKIE, cookie)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        tracing::debug!(status = %status, "upstream responded");
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        if !is_image_content_type(&content_type) {
            return Err(UpstreamError::NotAnImage { content_type });
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(size) = content_length
            && size > self.max_size
        {
            return Err(UpstreamError::TooLarge {
                size,
                max: self.max_size,
            });
        }

        Ok(UpstreamImage {
            content_type,
            content_length,
            response,
            max_size: self.max_size,
        })
    }
}

/// 検証済みの上流レスポンス
#[derive(Debug)]
pub struct UpstreamImage {
    pub content_type: String,
    pub content_length: Option<u64>,
    response: reqwest::Response,
    max_size: u64,
}

impl UpstreamImage {
    /// ボディをチャンク単位で返すストリーム
    ///
    /// 累計が上限を超えた時点でエラーを返す。
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, UpstreamError>> + Send + 'static {
        let max = self.max_size;
        let mut received: u64 = 0;

        self.response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(received = received, "upstream body aborted");
                UpstreamError::from_reqwest(e)
            })?;
            received += chunk.len() as u64;
            if received > max {
                tracing::warn!(size = received, max = max, "upstream body exceeded size limit");
                return Err(UpstreamError::TooLarge {
                    size: received,
                    max,
                });
            }
            Ok(chunk)
        })
    }
}
