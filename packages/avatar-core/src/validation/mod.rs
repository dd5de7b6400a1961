pub mod content_type;
pub mod origin;
pub mod user_id;

pub use content_type::is_image_content_type;
pub use origin::{OriginGuard, OriginPolicy};
pub use user_id::validate_user_id;
