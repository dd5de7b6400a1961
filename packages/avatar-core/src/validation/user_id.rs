use crate::constants::MAX_USER_ID_LEN;
use crate::errors::ValidationError;

/// ユーザー ID を検証し、デコード済みの値を返す
///
/// URL パスに埋め込むため、英数字・ハイフン・アンダースコアのみ許可する
pub fn validate_user_id(user_id: &str) -> Result<String, ValidationError> {
    if user_id.is_empty() {
        return Err(ValidationError::InvalidUserId("user id is empty".to_string()));
    }

    let decoded = urlencoding::decode(user_id)
        .map_err(|_| ValidationError::InvalidUserId("invalid URL encoding".to_string()))?;

    if decoded.len() > MAX_USER_ID_LEN {
        return Err(ValidationError::InvalidUserId(format!(
            "user id is too long (max {MAX_USER_ID_LEN})"
        )));
    }

    if !decoded
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidUserId(
            "invalid characters in user id".to_string(),
        ));
    }

    Ok(decoded.into_owned())
}
