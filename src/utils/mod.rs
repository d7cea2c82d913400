pub mod ip;

use base64::Engine;

/// 生成跟踪码（`byte_len` 个随机字节，Base64 URL-safe 无填充编码）
pub fn generate_tracking_code(byte_len: usize) -> String {
    use rand::RngExt;

    let mut bytes = vec![0u8; byte_len];
    rand::rng().fill(&mut bytes[..]);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_code_is_url_safe() {
        let code = generate_tracking_code(9);
        // 9 字节 → 12 个 Base64 字符，无填充
        assert_eq!(code.len(), 12);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_tracking_codes_differ() {
        let a = generate_tracking_code(9);
        let b = generate_tracking_code(9);
        assert_ne!(a, b);
    }
}
