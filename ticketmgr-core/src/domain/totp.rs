//! Ticket TOTP codes
//!
//! Mirrors the backend ticket authority: HMAC-SHA256 over the 30-second
//! counter, 6 digits. The ticket secret string is used as raw key bytes.

use totp_rs::{Algorithm, TOTP};

use super::result::{Error, Result};

/// Duration of a generated code, in seconds
pub const TIME_STEP: u64 = 30;

/// Length of a generated code, in digits
pub const CODE_DIGITS: usize = 6;

/// Code generator bound to one ticket secret
pub struct TicketCode {
    totp: TOTP,
}

impl TicketCode {
    /// Backend ticket secrets are 20 bytes, so the RFC 4226 minimum-length
    /// check of `TOTP::new` is bypassed; only empty secrets are refused.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::validation("ticket secret must not be empty"));
        }
        Ok(Self {
            totp: TOTP::new_unchecked(
                Algorithm::SHA256,
                CODE_DIGITS,
                0,
                TIME_STEP,
                secret.as_bytes().to_vec(),
            ),
        })
    }

    /// Code for the given unix time
    pub fn at(&self, unix_time: u64) -> String {
        self.totp.generate(unix_time)
    }

    /// Code for the current time
    pub fn current(&self) -> Result<String> {
        self.totp
            .generate_current()
            .map_err(|e| Error::Other(format!("system clock before unix epoch: {}", e)))
    }

    /// Seconds until the current code rolls over
    pub fn ttl(&self) -> Result<u64> {
        self.totp
            .ttl()
            .map_err(|e| Error::Other(format!("system clock before unix epoch: {}", e)))
    }

    /// Check a code against the given unix time (no skew window)
    pub fn verify(&self, code: &str, unix_time: u64) -> bool {
        self.totp.check(code, unix_time)
    }
}
