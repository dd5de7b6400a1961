pub mod avatar;
pub mod constants;
pub mod errors;
pub mod upstream;
pub mod validation;

// 公開API
pub use avatar::avatar_url;
pub use constants::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
    FALLBACK_CONTENT_TYPE, MAX_IMAGE_SIZE,
};
pub use errors::{RelayError, UpstreamError, ValidationError};
pub use upstream::{UpstreamClient, UpstreamImage, UpstreamOptions};
pub use validation::{is_image_content_type, validate_user_id, OriginGuard, OriginPolicy};
