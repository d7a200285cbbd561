//! Download replies as returned by the store clients.
//!
//! Two stores answer with different shapes and neither carries an explicit
//! format tag, so the shape is detected from the fields present:
//!
//! | Shape | Detected by | Base URLs |
//! |---|---|---|
//! | [`DirectReply`] | `fullPathUrls` | used as-is |
//! | [`MirroredReply`] | `uriPath` + `uriServers` | each server prefixed to `uriPath` |
//! | URL list | top-level JSON array | used as-is, no splits |
//!
//! All shapes normalize into a [`PackageDescriptor`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{PackageDescriptor, SplitDescriptor};

/// Errors raised while decoding or normalizing a store reply.
#[derive(Error, Debug)]
pub enum ReplyError {
    /// The reply is not valid JSON or a field has the wrong type.
    #[error("Malformed reply: {0}")]
    Json(#[from] serde_json::Error),

    /// The reply has neither `fullPathUrls` nor `uriPath`/`uriServers`.
    #[error("Reply carries neither a base URL list nor a mirrored path with servers")]
    MissingSources,

    /// The reply was recognized but lists no usable base URL.
    #[error("Reply lists no base URL")]
    NoBaseUrls,
}

/// Reply whose entries carry complete, ready-to-use URL lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectReply {
    /// Base package mirrors.
    pub full_path_urls: Vec<String>,
    /// Split packages.
    #[serde(default)]
    pub splits: Vec<DirectSplit>,
}

/// Split entry of a [`DirectReply`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSplit {
    /// Split mirrors.
    pub full_path_urls: Vec<String>,
}

/// Reply whose entries carry one path and a list of mirror servers to
/// prefix it with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredReply {
    /// Path of the base package, relative to each server.
    pub uri_path: String,
    /// Mirror servers.
    pub uri_servers: Vec<String>,
    /// Split packages.
    #[serde(default)]
    pub split: Vec<MirroredSplit>,
}

/// Split entry of a [`MirroredReply`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredSplit {
    /// Split type as reported by the store (e.g. `config.arm64_v8a`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Path of the split, relative to each server.
    pub uri_path: String,
    /// Mirror servers.
    pub uri_servers: Vec<String>,
}

/// A store reply in one of the supported shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReply {
    /// Full URL lists (`fullPathUrls`).
    Direct(DirectReply),
    /// Path + mirror servers (`uriPath`, `uriServers`).
    Mirrored(MirroredReply),
    /// Bare list of base package URLs.
    UrlList(Vec<String>),
}

impl StoreReply {
    /// Parses a reply from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyError::Json`] for invalid JSON and
    /// [`ReplyError::MissingSources`] if no known shape matches.
    pub fn from_json(text: &str) -> Result<Self, ReplyError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Detects the reply shape from an already decoded JSON value.
    ///
    /// `fullPathUrls` wins when both shapes are present.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyError::Json`] if the detected shape has wrongly typed
    /// fields and [`ReplyError::MissingSources`] if no known shape matches.
    pub fn from_value(value: Value) -> Result<Self, ReplyError> {
        match &value {
            Value::Array(_) => Ok(Self::UrlList(serde_json::from_value(value)?)),
            Value::Object(map) if map.contains_key("fullPathUrls") => {
                Ok(Self::Direct(serde_json::from_value(value)?))
            }
            Value::Object(map) if map.contains_key("uriPath") && map.contains_key("uriServers") => {
                Ok(Self::Mirrored(serde_json::from_value(value)?))
            }
            _ => Err(ReplyError::MissingSources),
        }
    }

    /// Normalizes the reply into a [`PackageDescriptor`].
    ///
    /// Direct splits have no tag of their own and are tagged `split.{i}`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyError::NoBaseUrls`] if the base mirror list is empty.
    pub fn into_descriptor(
        self,
        package_id: impl Into<String>,
    ) -> Result<PackageDescriptor, ReplyError> {
        let (base_urls, splits) = match self {
            Self::Direct(reply) => {
                let splits = reply
                    .splits
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| SplitDescriptor::new(format!("split.{i}"), s.full_path_urls))
                    .collect();
                (reply.full_path_urls, splits)
            }
            Self::Mirrored(reply) => {
                let base = mirror_urls(&reply.uri_servers, &reply.uri_path);
                let splits = reply
                    .split
                    .into_iter()
                    .map(|s| SplitDescriptor::new(s.kind, mirror_urls(&s.uri_servers, &s.uri_path)))
                    .collect();
                (base, splits)
            }
            Self::UrlList(urls) => (urls, Vec::new()),
        };

        let base_urls: Vec<String> = base_urls.into_iter().filter(|u| !u.is_empty()).collect();
        if base_urls.is_empty() {
            return Err(ReplyError::NoBaseUrls);
        }

        Ok(PackageDescriptor::new(package_id, base_urls, splits))
    }
}

/// Prefix `path` with every server, collapsing a doubled `/` at the seam.
fn mirror_urls(servers: &[String], path: &str) -> Vec<String> {
    servers
        .iter()
        .map(|server| {
            if server.ends_with('/') && path.starts_with('/') {
                format!("{server}{}", &path[1..])
            } else {
                format!("{server}{path}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_direct_reply() {
        let json = r#"{
            "fullPathUrls": ["https://cdn1.example/base.apk", "https://cdn2.example/base.apk"],
            "splits": [
                {"fullPathUrls": ["https://cdn1.example/s0.apk"]},
                {"fullPathUrls": ["https://cdn1.example/s1.apk"]}
            ]
        }"#;

        let reply = StoreReply::from_json(json).unwrap();
        assert!(matches!(reply, StoreReply::Direct(_)));

        let desc = reply.into_descriptor("com.example").unwrap();
        assert_eq!(desc.base_urls.len(), 2);
        assert_eq!(desc.splits.len(), 2);
        assert_eq!(desc.splits[1].tag, "split.1");
        assert_eq!(desc.splits[1].urls, vec!["https://cdn1.example/s1.apk"]);
    }

    #[test]
    fn test_detects_mirrored_reply() {
        let json = r#"{
            "resultCode": "Successful",
            "uriPath": "/apps/base.apk",
            "uriServers": ["https://m1.example/", "https://m2.example"],
            "split": [
                {"type": "config.arm64_v8a", "uriPath": "/apps/abi.apk", "uriServers": ["https://m1.example/"]}
            ]
        }"#;

        let desc = StoreReply::from_json(json)
            .unwrap()
            .into_descriptor("com.example")
            .unwrap();

        assert_eq!(
            desc.base_urls,
            vec![
                "https://m1.example/apps/base.apk",
                "https://m2.example/apps/base.apk"
            ]
        );
        assert_eq!(desc.splits[0].tag, "config.arm64_v8a");
        assert_eq!(desc.splits[0].urls, vec!["https://m1.example/apps/abi.apk"]);
    }

    #[test]
    fn test_direct_wins_when_both_shapes_present() {
        let json = r#"{"fullPathUrls": ["https://a/b.apk"], "uriPath": "/x", "uriServers": []}"#;
        assert!(matches!(
            StoreReply::from_json(json).unwrap(),
            StoreReply::Direct(_)
        ));
    }

    #[test]
    fn test_url_list_has_no_splits() {
        let desc = StoreReply::from_json(r#"["https://a/app.apk"]"#)
            .unwrap()
            .into_descriptor("pkg")
            .unwrap();
        assert!(!desc.has_splits());
        assert_eq!(desc.base_urls, vec!["https://a/app.apk"]);
    }

    #[test]
    fn test_rejects_reply_without_sources() {
        let err = StoreReply::from_json(r#"{"translatedMessage": "not found"}"#).unwrap_err();
        assert!(matches!(err, ReplyError::MissingSources));

        let err = StoreReply::from_json(r#""just a string""#).unwrap_err();
        assert!(matches!(err, ReplyError::MissingSources));
    }

    #[test]
    fn test_rejects_empty_base_list() {
        let err = StoreReply::from_json(r#"{"uriPath": "/a.apk", "uriServers": []}"#)
            .unwrap()
            .into_descriptor("pkg")
            .unwrap_err();
        assert!(matches!(err, ReplyError::NoBaseUrls));
    }

    #[test]
    fn test_wrong_field_type_is_json_error() {
        let err = StoreReply::from_json(r#"{"fullPathUrls": "nope"}"#).unwrap_err();
        assert!(matches!(err, ReplyError::Json(_)));
    }
}
