/// Session
///
/// Parsing of the pairing URI scanned from the dApp QR code into the
/// session descriptor shared by the whole interactor.
///
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::SESSION_KEY_LENGTH;
use crate::error::{Error, Result};

/// Which ecosystem produced the pairing URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    Wc,
    /// Crypto.com wallet extension, `CWE:` scheme.
    Cwe,
    Unknown,
}

/// Immutable descriptor of one bridge pairing. Created by [`Session::from_uri`]
/// and shared for the lifetime of the interactor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub topic: String,
    pub version: String,
    pub bridge: Url,
    #[serde(with = "hex_key")]
    pub key: [u8; 32],
    pub numerical_version: f64,
    pub source: SessionSource,
    pub is_extension: bool,
}

impl Session {
    /// Parse a `wc:` (or `CWE:`) pairing URI.
    ///
    /// Inputs without a recognized prefix are assumed to have gone through
    /// one round of percent-encoding (some dApps escape the whole URI into
    /// a deep link) and are decoded once before parsing.
    pub fn from_uri(input: &str) -> Result<Session> {
        let mut input = input.trim().to_string();

        if !has_known_prefix(&input) && input.contains('%') {
            input = percent_decode_str(&input)
                .decode_utf8()
                .map_err(|_| Error::InvalidUri)?
                .into_owned();
        }

        // Rebuild as `scheme://authority` so a standard URL parser can
        // take it from here.
        let (scheme, rest) = input.split_once(':').ok_or(Error::InvalidUri)?;
        let source = match scheme {
            "wc" => SessionSource::Wc,
            s if s.eq_ignore_ascii_case("cwe") => SessionSource::Cwe,
            _ => SessionSource::Unknown,
        };
        let rebuilt = format!("{scheme}://{}", rest.trim_start_matches('/'));
        let url = Url::parse(&rebuilt).map_err(|_| Error::InvalidUri)?;

        let topic = url.username().to_string();
        if topic.is_empty() {
            return Err(Error::InvalidUri);
        }
        let version = url.host_str().ok_or(Error::InvalidUri)?.to_string();

        let query: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let bridge = query
            .get("bridge")
            .and_then(|b| Url::parse(b).ok())
            .ok_or(Error::InvalidUri)?;
        // Plaintext schemes are accepted for local relays.
        if !matches!(bridge.scheme(), "https" | "wss" | "http" | "ws") {
            return Err(Error::InvalidUri);
        }

        let key_hex = query.get("key").ok_or(Error::InvalidUri)?;
        let key_bytes = hex::decode(key_hex).map_err(|_| Error::InvalidUri)?;
        let key: [u8; SESSION_KEY_LENGTH] =
            key_bytes.try_into().map_err(|_| Error::InvalidUri)?;

        let is_extension = query.get("role").map(String::as_str) == Some("extension");
        let numerical_version = version.parse::<f64>().unwrap_or(1.0);

        Ok(Session {
            topic,
            version,
            bridge,
            key,
            numerical_version,
            source,
            is_extension,
        })
    }
}

fn has_known_prefix(input: &str) -> bool {
    let lower = input
        .get(..4)
        .map(|p| p.to_ascii_lowercase())
        .unwrap_or_default();
    lower.starts_with("wc:") || lower.starts_with("cwe:")
}

mod hex_key {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = hex::decode(&raw).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("session key must be 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_parse_basic_uri() {
        let uri = format!("wc:abc-123@1?bridge=https%3A%2F%2Fb.example%2F&key={KEY}");
        let session = Session::from_uri(&uri).unwrap();

        assert_eq!(session.topic, "abc-123");
        assert_eq!(session.version, "1");
        assert_eq!(session.bridge.as_str(), "https://b.example/");
        assert_eq!(session.key.len(), 32);
        assert_eq!(session.key[0], 0x00);
        assert_eq!(session.key[31], 0x1f);
        assert_eq!(session.source, SessionSource::Wc);
        assert_eq!(session.numerical_version, 1.0);
        assert!(!session.is_extension);
        assert!(!session.bridge.cannot_be_a_base());
    }

    #[test]
    fn test_parse_percent_encoded_input() {
        let uri = format!(
            "wc%3Aabc-123%401%3Fbridge%3Dhttps%253A%252F%252Fb.example%252F%26key%3D{KEY}"
        );
        let session = Session::from_uri(&uri).unwrap();
        assert_eq!(session.topic, "abc-123");
        assert_eq!(session.bridge.as_str(), "https://b.example/");
    }

    #[test]
    fn test_parse_cwe_variant() {
        let uri = format!("CWE:topic-9@2?bridge=wss%3A%2F%2Fbridge.example&key={KEY}");
        let session = Session::from_uri(&uri).unwrap();
        assert_eq!(session.source, SessionSource::Cwe);
        assert_eq!(session.version, "2");
        assert_eq!(session.numerical_version, 2.0);
    }

    #[test]
    fn test_parse_extension_role() {
        let uri = format!(
            "wc:abc@1?bridge=https%3A%2F%2Fb.example%2F&key={KEY}&role=extension"
        );
        assert!(Session::from_uri(&uri).unwrap().is_extension);
    }

    #[test]
    fn test_reject_short_key() {
        let uri = "wc:abc@1?bridge=https%3A%2F%2Fb.example%2F&key=0011223344";
        assert_eq!(Session::from_uri(uri), Err(Error::InvalidUri));
    }

    #[test]
    fn test_reject_missing_bridge() {
        let uri = format!("wc:abc@1?key={KEY}");
        assert_eq!(Session::from_uri(&uri), Err(Error::InvalidUri));
    }

    #[test]
    fn test_reject_non_http_bridge() {
        let uri = format!("wc:abc@1?bridge=ftp%3A%2F%2Fb.example%2F&key={KEY}");
        assert_eq!(Session::from_uri(&uri), Err(Error::InvalidUri));
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let uri = format!("wc:abc-123@1?bridge=https%3A%2F%2Fb.example%2F&key={KEY}");
        let session = Session::from_uri(&uri).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains(KEY));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
