use thiserror::Error;

/// 中継処理の統合エラー型
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// リクエスト検証エラー（上流へは到達しない）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("src parameter is missing")]
    MissingSrc,

    #[error("src is outside the allowed origin")]
    ForbiddenHost,

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid allowed origin: {0}")]
    InvalidAllowedOrigin(String),
}

/// 上流アクセスエラー
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 上流が 2xx 以外を返した
    #[error("upstream responded with status {status}")]
    Status { status: u16 },

    #[error("upstream timed out")]
    Timeout,

    #[error("upstream content is not an image: {content_type}")]
    NotAnImage { content_type: String },

    #[error("upstream payload too large ({size} > {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("upstream request failed: {0}")]
    Internal(String),
}

impl UpstreamError {
    /// reqwest のエラーを分類する
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            // URL を含めない
            Self::Internal(err.without_url().to_string())
        }
    }
}
