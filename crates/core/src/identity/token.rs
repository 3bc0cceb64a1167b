//! Durable identity cookie encoding
//!
//! The identity travels as percent-encoded JSON inside a cookie-style line:
//! `dogpark_user=<value>; Expires=<date>; Path=/; SameSite=Lax`.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::DurableIdentity;
use crate::error::Result;
use crate::TOKEN_TTL_DAYS;

pub const COOKIE_NAME: &str = "dogpark_user";

const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Everything `encodeURIComponent` escapes
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// `None` on invalid UTF-8 after decoding
pub fn percent_decode(input: &str) -> Option<String> {
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Stored identity token with its expiry
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityCookie {
    /// Percent-encoded JSON
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl IdentityCookie {
    /// Issue a fresh token valid for [`TOKEN_TTL_DAYS`]
    pub fn issue(identity: &DurableIdentity, now: DateTime<Utc>) -> Result<Self> {
        let json = serde_json::to_string(identity)?;
        Ok(Self {
            value: percent_encode(&json),
            expires_at: (now + Duration::days(TOKEN_TTL_DAYS)).trunc_subsecs(0),
        })
    }

    /// Cookie line as written to the jar
    pub fn to_line(&self) -> String {
        format!(
            "{}={}; Expires={}; Path=/; SameSite=Lax",
            COOKIE_NAME,
            self.value,
            self.expires_at.format(EXPIRES_FORMAT)
        )
    }

    /// Parse a cookie line; only our cookie name is accepted
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        if name != COOKIE_NAME || value.is_empty() {
            return None;
        }

        let expires_at = parts
            .filter_map(|attr| attr.split_once('='))
            .find(|(k, _)| k.eq_ignore_ascii_case("expires"))
            .and_then(|(_, v)| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))?;

        Some(Self {
            value: value.to_string(),
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Decoded identity, if the token is still valid and well-formed
    pub fn identity_at(&self, now: DateTime<Utc>) -> Option<DurableIdentity> {
        if self.is_expired_at(now) {
            return None;
        }
        let json = percent_decode(&self.value)?;
        serde_json::from_str(&json).ok()
    }
}
