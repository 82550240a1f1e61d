//! Berbix webhook signature verification
//!
//! Webhooks carry a header of the form `<version>,<unix_timestamp>,<hex>`
//! where `<hex>` is HMAC-SHA256, keyed by the webhook secret, over
//! `<timestamp>,<secret>,<body>`. The secret appears in the signed message
//! as well as in the key; the service signs that way and so must we.
//!
//! Verification answers yes or no. Rejecting the callback is the caller's
//! decision.

use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Oldest accepted signature age, in seconds. Future timestamps are not bounded.
pub const CLOCK_DRIFT_SECS: i64 = 300;

/// Checks webhook signatures against one shared secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Secret::new(secret.into()),
        }
    }

    /// Verify against the current wall clock.
    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.verify_at(body, header, now)
    }

    /// Verify as of `now` (unix seconds).
    pub fn verify_at(&self, body: &[u8], header: &str, now: i64) -> bool {
        let Some(parts) = SignatureHeader::parse(header) else {
            debug!("malformed webhook signature header");
            return false;
        };

        if parts.timestamp < now.saturating_sub(CLOCK_DRIFT_SECS) {
            debug!(
                timestamp = parts.timestamp,
                now, "webhook signature outside drift window"
            );
            return false;
        }

        let expected = sign(self.secret.expose(), parts.raw_timestamp, body);
        constant_time_eq(expected.as_bytes(), parts.signature.as_bytes())
    }
}

/// One-shot verification against the current wall clock.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    WebhookVerifier::new(secret).verify(body, header)
}

/// Hex HMAC-SHA256 of `<timestamp>,<secret>,<body>` keyed by `secret`.
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(timestamp.as_bytes());
    mac.update(b",");
    mac.update(secret.as_bytes());
    mac.update(b",");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

struct SignatureHeader<'a> {
    raw_timestamp: &'a str,
    timestamp: i64,
    signature: &'a str,
}

impl<'a> SignatureHeader<'a> {
    /// Split `<version>,<timestamp>,<signature>`. The version is not checked.
    fn parse(header: &'a str) -> Option<Self> {
        let mut fields = header.split(',');
        let _version = fields.next()?;
        let raw_timestamp = fields.next()?;
        let signature = fields.next()?;
        if fields.next().is_some() {
            return None;
        }
        let timestamp = raw_timestamp.parse().ok()?;
        Some(Self {
            raw_timestamp,
            timestamp,
            signature,
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"event":"ok"}"#;
    const TIMESTAMP: i64 = 1_700_000_000;

    /// Independent computation of the expected signature.
    fn expected_signature() -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{TIMESTAMP},{SECRET},{{\"event\":\"ok\"}}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn header() -> String {
        format!("v1,{TIMESTAMP},{}", expected_signature())
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET)
    }

    #[test]
    fn sign_matches_independent_hmac() {
        assert_eq!(sign(SECRET, "1700000000", BODY), expected_signature());
    }

    #[test]
    fn accepts_valid_signature_within_window() {
        assert!(verifier().verify_at(BODY, &header(), TIMESTAMP + 100));
    }

    #[test]
    fn accepts_at_exact_drift_boundary() {
        assert!(verifier().verify_at(BODY, &header(), TIMESTAMP + CLOCK_DRIFT_SECS));
    }

    #[test]
    fn rejects_stale_timestamp() {
        assert!(!verifier().verify_at(BODY, &header(), TIMESTAMP + 500));
        assert!(!verifier().verify_at(BODY, &header(), TIMESTAMP + CLOCK_DRIFT_SECS + 1));
    }

    #[test]
    fn extreme_clock_values_do_not_overflow() {
        assert!(!verifier().verify_at(BODY, "v1,0,ab", i64::MIN));
        assert!(!verifier().verify_at(BODY, &header(), i64::MAX));
        let oldest = format!("v1,{},{}", i64::MIN, expected_signature());
        assert!(!verifier().verify_at(BODY, &oldest, TIMESTAMP));
    }

    #[test]
    fn future_timestamp_is_not_bounded() {
        assert!(verifier().verify_at(BODY, &header(), TIMESTAMP - 86_400));
    }

    #[test]
    fn rejects_any_single_altered_signature_character() {
        let sig = expected_signature();
        for i in 0..sig.len() {
            let mut chars: Vec<char> = sig.chars().collect();
            chars[i] = if chars[i] == '0' { '1' } else { '0' };
            let altered: String = chars.into_iter().collect();
            let header = format!("v1,{TIMESTAMP},{altered}");
            assert!(
                !verifier().verify_at(BODY, &header, TIMESTAMP + 100),
                "altered char {i} accepted"
            );
        }
    }

    #[test]
    fn rejects_altered_body() {
        assert!(!verifier().verify_at(br#"{"event":"no"}"#, &header(), TIMESTAMP + 100));
    }

    #[test]
    fn rejects_wrong_secret() {
        let other = WebhookVerifier::new("whsec_other");
        assert!(!other.verify_at(BODY, &header(), TIMESTAMP + 100));
    }

    #[test]
    fn version_is_not_checked() {
        let header = format!("v9,{TIMESTAMP},{}", expected_signature());
        assert!(verifier().verify_at(BODY, &header, TIMESTAMP + 100));
    }

    #[test]
    fn rejects_malformed_headers() {
        let sig = expected_signature();
        let v = verifier();
        let now = TIMESTAMP + 100;
        assert!(!v.verify_at(BODY, "", now));
        assert!(!v.verify_at(BODY, "v1", now));
        assert!(!v.verify_at(BODY, &format!("v1,{TIMESTAMP}"), now));
        assert!(!v.verify_at(BODY, &format!("v1,{TIMESTAMP},{sig},extra"), now));
        assert!(!v.verify_at(BODY, &format!("v1,not-a-number,{sig}"), now));
    }

    #[test]
    fn rejects_truncated_signature() {
        let sig = expected_signature();
        let header = format!("v1,{TIMESTAMP},{}", &sig[..sig.len() - 1]);
        assert!(!verifier().verify_at(BODY, &header, TIMESTAMP + 100));
    }

    #[test]
    fn free_function_uses_wall_clock() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string();
        let fresh = format!("v1,{now},{}", sign(SECRET, &now, BODY));
        assert!(verify_signature(SECRET, BODY, &fresh));
        assert!(!verify_signature(SECRET, BODY, &header()));
    }
}
