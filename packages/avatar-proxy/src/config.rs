use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use avatar_core::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, MAX_IMAGE_SIZE,
    OriginGuard, OriginPolicy, UpstreamOptions,
};
use thiserror::Error;
use tracing::info;

const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// サービス設定
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub origin: OriginGuard,
    pub upstream: UpstreamOptions,
}

impl Config {
    /// 環境変数から Config を作成する
    ///
    /// 任意の環境変数（未設定時は既定値）:
    /// - AVATAR_PROXY_ALLOWED_ORIGIN（なければ NEXT_PUBLIC_API_URL）
    /// - AVATAR_PROXY_ORIGIN_CHECK (`strict` | `prefix`)
    /// - AVATAR_PROXY_BIND
    /// - AVATAR_PROXY_TIMEOUT_SECS
    /// - AVATAR_PROXY_CONNECT_TIMEOUT_SECS
    /// - AVATAR_PROXY_MAX_BYTES
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から Config を作成する
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let allowed_origin = non_empty("AVATAR_PROXY_ALLOWED_ORIGIN")
            .or_else(|| non_empty("NEXT_PUBLIC_API_URL"))
            .unwrap_or_else(|| {
                info!("allowed origin not set, using default: {DEFAULT_ALLOWED_ORIGIN}");
                DEFAULT_ALLOWED_ORIGIN.to_string()
            });

        let policy = match lookup("AVATAR_PROXY_ORIGIN_CHECK") {
            Some(value) => {
                OriginPolicy::from_str(&value).ok_or_else(|| ConfigError::Invalid {
                    key: "AVATAR_PROXY_ORIGIN_CHECK",
                    message: format!("expected `strict` or `prefix`, got {value}"),
                })?
            }
            None => OriginPolicy::default(),
        };

        let origin =
            OriginGuard::new(&allowed_origin, policy).map_err(|e| ConfigError::Invalid {
                key: "AVATAR_PROXY_ALLOWED_ORIGIN",
                message: e.to_string(),
            })?;

        let bind = try_load(&lookup, "AVATAR_PROXY_BIND", DEFAULT_BIND)?;
        let timeout_secs: u64 = try_load(
            &lookup,
            "AVATAR_PROXY_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )?;
        let connect_timeout_secs: u64 = try_load(
            &lookup,
            "AVATAR_PROXY_CONNECT_TIMEOUT_SECS",
            &DEFAULT_CONNECT_TIMEOUT_SECS.to_string(),
        )?;
        let max_size: u64 = try_load(
            &lookup,
            "AVATAR_PROXY_MAX_BYTES",
            &MAX_IMAGE_SIZE.to_string(),
        )?;

        for (key, value) in [
            ("AVATAR_PROXY_TIMEOUT_SECS", timeout_secs),
            ("AVATAR_PROXY_CONNECT_TIMEOUT_SECS", connect_timeout_secs),
            ("AVATAR_PROXY_MAX_BYTES", max_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    message: "must be greater than 0".to_string(),
                });
            }
        }

        Ok(Self {
            bind,
            origin,
            upstream: UpstreamOptions {
                timeout: Duration::from_secs(timeout_secs),
                connect_timeout: Duration::from_secs(connect_timeout_secs),
                max_size,
            },
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.origin.allowed(), DEFAULT_ALLOWED_ORIGIN);
        assert_eq!(config.origin.policy(), OriginPolicy::Strict);
        assert_eq!(config.upstream.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.upstream.max_size, MAX_IMAGE_SIZE);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("AVATAR_PROXY_ALLOWED_ORIGIN", "https://api.example.com"),
            ("AVATAR_PROXY_ORIGIN_CHECK", "prefix"),
            ("AVATAR_PROXY_BIND", "127.0.0.1:4000"),
            ("AVATAR_PROXY_TIMEOUT_SECS", "3"),
            ("AVATAR_PROXY_MAX_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.origin.allowed(), "https://api.example.com");
        assert_eq!(config.origin.policy(), OriginPolicy::Prefix);
        assert_eq!(config.upstream.timeout, Duration::from_secs(3));
        assert_eq!(config.upstream.max_size, 1024);
    }

    #[test]
    fn test_falls_back_to_frontend_api_url() {
        let config = load(&[("NEXT_PUBLIC_API_URL", "https://backend.example.com")]).unwrap();
        assert_eq!(config.origin.allowed(), "https://backend.example.com");

        let config = load(&[
            ("NEXT_PUBLIC_API_URL", "https://backend.example.com"),
            ("AVATAR_PROXY_ALLOWED_ORIGIN", "https://images.example.com"),
        ])
        .unwrap();
        assert_eq!(config.origin.allowed(), "https://images.example.com");
    }

    #[test]
    fn test_empty_allowed_origin_falls_through() {
        let config = load(&[
            ("AVATAR_PROXY_ALLOWED_ORIGIN", "  "),
            ("NEXT_PUBLIC_API_URL", "https://backend.example.com"),
        ])
        .unwrap();
        assert_eq!(config.origin.allowed(), "https://backend.example.com");

        let config = load(&[
            ("AVATAR_PROXY_ALLOWED_ORIGIN", ""),
            ("NEXT_PUBLIC_API_URL", ""),
        ])
        .unwrap();
        assert_eq!(config.origin.allowed(), DEFAULT_ALLOWED_ORIGIN);
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        for key in [
            "AVATAR_PROXY_TIMEOUT_SECS",
            "AVATAR_PROXY_CONNECT_TIMEOUT_SECS",
            "AVATAR_PROXY_MAX_BYTES",
        ] {
            let err = load(&[(key, "0")]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("AVATAR_PROXY_ORIGIN_CHECK", "loose")]).is_err());
        assert!(load(&[("AVATAR_PROXY_ALLOWED_ORIGIN", "localhost")]).is_err());
        assert!(load(&[("AVATAR_PROXY_BIND", "nowhere")]).is_err());
        assert!(load(&[("AVATAR_PROXY_TIMEOUT_SECS", "ten")]).is_err());
        assert!(load(&[("AVATAR_PROXY_TIMEOUT_SECS", "0")]).is_err());
    }
}
