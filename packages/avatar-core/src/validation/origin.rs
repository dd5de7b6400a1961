use url::Url;

use crate::errors::ValidationError;

/// `src` の許可判定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginPolicy {
    /// 文字列の前方一致に加え、URL として解析しスキーム・ホスト・ポートとパスを比較する
    #[default]
    Strict,
    /// 文字列の前方一致のみ（`https://allowed.example.com.evil.test` も通る）
    Prefix,
}

impl OriginPolicy {
    /// 文字列から OriginPolicy を作成
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "prefix" => Some(Self::Prefix),
            _ => None,
        }
    }
}

/// 中継先を単一の許可オリジン配下に制限する
#[derive(Debug, Clone)]
pub struct OriginGuard {
    allowed: String,
    base: Url,
    policy: OriginPolicy,
}

impl OriginGuard {
    pub fn new(allowed: &str, policy: OriginPolicy) -> Result<Self, ValidationError> {
        let allowed = allowed.trim();
        let base = Url::parse(allowed)
            .map_err(|e| ValidationError::InvalidAllowedOrigin(e.to_string()))?;

        if !matches!(base.scheme(), "http" | "https") || base.host().is_none() {
            return Err(ValidationError::InvalidAllowedOrigin(format!(
                "expected an http(s) base URL, got {allowed}"
            )));
        }

        Ok(Self {
            allowed: allowed.to_string(),
            base,
            policy,
        })
    }

    /// 設定された許可オリジン（前方一致に使う文字列）
    pub fn allowed(&self) -> &str {
        &self.allowed
    }

    pub fn policy(&self) -> OriginPolicy {
        self.policy
    }

    /// `src` が中継可能かを判定する
    pub fn permits(&self, src: &str) -> bool {
        if !src.starts_with(&self.allowed) {
            return false;
        }

        match self.policy {
            OriginPolicy::Prefix => true,
            OriginPolicy::Strict => self.permits_parsed(src),
        }
    }

    /// 検証に失敗した場合は ForbiddenHost を返す
    pub fn check(&self, src: &str) -> Result<(), ValidationError> {
        if self.permits(src) {
            Ok(())
        } else {
            Err(ValidationError::ForbiddenHost)
        }
    }

    fn permits_parsed(&self, src: &str) -> bool {
        let Ok(url) = Url::parse(src) else {
            return false;
        };

        if url.origin() != self.base.origin() {
            return false;
        }

        if !url.username().is_empty() || url.password().is_some() {
            return false;
        }

        // パスは正規化済み（`..` は解決されている）
        path_within(self.base.path(), url.path())
    }
}

fn path_within(base: &str, path: &str) -> bool {
    let base = base.trim_end_matches('/');
    base.is_empty()
        || path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}
