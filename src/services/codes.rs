//! Tracking code issuance
//!
//! Codes only need to be unpredictable and URL-safe. Uniqueness is
//! enforced by the store's unique index; the issuing service retries
//! generation once on a collision.

use crate::utils::generate_tracking_code;

/// Source of new tracking codes
pub trait TrackingCodeIssuer: Send + Sync {
    fn issue_code(&self) -> String;
}

/// Default issuer: random bytes, Base64 URL-safe without padding
pub struct RandomCodeIssuer {
    byte_len: usize,
}

impl RandomCodeIssuer {
    pub fn new(byte_len: usize) -> Self {
        Self { byte_len }
    }
}

impl TrackingCodeIssuer for RandomCodeIssuer {
    fn issue_code(&self) -> String {
        generate_tracking_code(self.byte_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_produces_distinct_codes() {
        let issuer = RandomCodeIssuer::new(9);
        let a = issuer.issue_code();
        let b = issuer.issue_code();
        assert_ne!(a, b);
        assert_eq!(a.len(), 12);
    }
}
