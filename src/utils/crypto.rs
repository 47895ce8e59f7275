use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Nonce lifetime is split into two ticks of this length; a nonce issued in
/// the current or the previous tick verifies.
pub const NONCE_TICK_SECS: i64 = 12 * 60 * 60;

const NONCE_LEN: usize = 20;

fn tick(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(NONCE_TICK_SECS)
}

fn sign(secret: &str, action: &str, subject: &str, tick: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}|{}|{}", action, subject, tick).as_bytes());
    let mut digest = hex::encode(mac.finalize().into_bytes());
    digest.truncate(NONCE_LEN);
    digest
}

pub fn create_nonce(secret: &str, action: &str, subject: &str, at: DateTime<Utc>) -> String {
    sign(secret, action, subject, tick(at))
}

pub fn verify_nonce(
    secret: &str,
    action: &str,
    subject: &str,
    nonce: &str,
    at: DateTime<Utc>,
) -> bool {
    if nonce.len() != NONCE_LEN {
        return false;
    }
    let current = tick(at);
    [current, current - 1].iter().any(|t| {
        let expected = sign(secret, action, subject, *t);
        bool::from(expected.as_bytes().ct_eq(nonce.as_bytes()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn nonce_is_bound_to_subject_and_action() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let nonce = create_nonce("s3cret", "oauth_connect", "operator-1", at);
        assert!(verify_nonce("s3cret", "oauth_connect", "operator-1", &nonce, at));
        assert!(!verify_nonce("s3cret", "oauth_connect", "operator-2", &nonce, at));
        assert!(!verify_nonce("s3cret", "other_action", "operator-1", &nonce, at));
        assert!(!verify_nonce("other", "oauth_connect", "operator-1", &nonce, at));
    }

    #[test]
    fn nonce_expires_after_two_ticks() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let nonce = create_nonce("s3cret", "oauth_connect", "op", at);
        let later = at + chrono::Duration::seconds(NONCE_TICK_SECS);
        assert!(verify_nonce("s3cret", "oauth_connect", "op", &nonce, later));
        let much_later = at + chrono::Duration::seconds(NONCE_TICK_SECS * 3);
        assert!(!verify_nonce("s3cret", "oauth_connect", "op", &nonce, much_later));
    }
}
