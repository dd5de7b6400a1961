const IMAGE_PREFIX: &[u8] = b"image/";

/// Content-Type が `image/` で始まるかを判定する（大文字小文字は区別しない）
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .as_bytes()
        .get(..IMAGE_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_PREFIX))
}
