pub mod client;

pub use client::{UpstreamClient, UpstreamImage, UpstreamOptions};
// UpstreamError は errors モジュールで定義済み
pub use crate::errors::UpstreamError;
