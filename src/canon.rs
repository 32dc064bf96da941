// src/canon.rs
//! Canonical request text. The service recomputes this string from the
//! request it receives, so every byte here must match what goes on the wire.

use chrono::{DateTime, Utc};
use url::form_urlencoded;

/// Ordered request parameters. Iteration order is insertion order and is the
/// order used both for signing and for the query string actually sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` query string, no leading `?`.
    pub fn to_query(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.iter() {
            ser.append_pair(k, v);
        }
        ser.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// RFC 1123 date with the zone written as the literal offset `-0000`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S -0000").to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn canonical_message(
    timestamp: &str,
    method: &str,
    host: &str,
    path: &str,
    params: &Params,
) -> String {
    [
        timestamp.to_string(),
        method.to_ascii_uppercase(),
        host.to_ascii_lowercase(),
        path.to_string(),
        params.to_query(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn poll_params() -> Params {
        Params::new()
            .with("akey", "AK1")
            .with("fips_status", "1")
            .with("hsm_status", "true")
            .with("pkpush", "rsa-sha512")
    }

    #[test]
    fn canonical_message_is_five_lines() {
        let msg = canonical_message(
            "Mon, 01 Jan 2024 00:00:00 -0000",
            "GET",
            "API-HOST.example.com",
            "/push/v2/device/transactions",
            &poll_params(),
        );
        assert_eq!(
            msg,
            "Mon, 01 Jan 2024 00:00:00 -0000\nGET\napi-host.example.com\n\
             /push/v2/device/transactions\nakey=AK1&fips_status=1&hsm_status=true&pkpush=rsa-sha512"
        );
    }

    #[test]
    fn method_is_uppercased() {
        let msg = canonical_message("t", "post", "h", "/p", &Params::new());
        assert_eq!(msg, "t\nPOST\nh\n/p\n");
    }

    #[test]
    fn query_keeps_insertion_order() {
        let params = Params::new().with("z", "1").with("a", "2");
        assert_eq!(params.to_query(), "z=1&a=2");
    }

    #[test]
    fn query_encodes_pem_material() {
        let params = Params::new().with("pubkey", "-----BEGIN PUBLIC KEY-----\nab+/=\n");
        assert_eq!(
            params.to_query(),
            "pubkey=-----BEGIN+PUBLIC+KEY-----%0Aab%2B%2F%3D%0A"
        );
    }

    #[test]
    fn timestamp_uses_literal_offset() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "Mon, 01 Jan 2024 00:00:00 -0000");

        let at = Utc.with_ymd_and_hms(2023, 11, 9, 7, 5, 3).unwrap();
        assert_eq!(format_timestamp(at), "Thu, 09 Nov 2023 07:05:03 -0000");
    }
}
