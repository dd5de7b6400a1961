/// バックエンドのユーザーアバター URL を組み立てる
///
/// `user_id` は `validate_user_id` で検証済みであること
pub fn avatar_url(base: &str, user_id: &str) -> String {
    format!("{}/api/user/{}/avatar", base.trim_end_matches('/'), user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_url() {
        assert_eq!(
            avatar_url("http://localhost:8080", "42"),
            "http://localhost:8080/api/user/42/avatar"
        );
    }

    #[test]
    fn test_avatar_url_trailing_slash() {
        assert_eq!(
            avatar_url("https://api.example.com/", "abc"),
            "https://api.example.com/api/user/abc/avatar"
        );
    }
}
