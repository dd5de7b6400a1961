/// 許可オリジンが未設定のときに使うローカル開発用のバックエンド
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

/// 上流の Content-Type が欠けているときの既定値
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// 中継する画像の最大バイト数（アバターのアップロード上限と同じ 5MB）
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

/// 上流リクエスト全体のタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 上流への接続タイムアウト（秒）
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// 追従するリダイレクトの最大回数
pub const MAX_REDIRECTS: usize = 5;

/// ユーザー ID の最大長
pub const MAX_USER_ID_LEN: usize = 64;
