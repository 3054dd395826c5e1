//! Request and response values exchanged with the offline worker.

use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// How the page issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    #[default]
    SameOrigin,
    Cors,
    NoCors,
}

/// Whether intermediary HTTP caches may answer a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Go to the origin server, ignoring any intermediary cached copy.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub method: String,
    pub mode: RequestMode,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self { url, method: "GET".into(), mode: RequestMode::SameOrigin }
    }

    pub fn navigate(url: Url) -> Self {
        Self { url, method: "GET".into(), mode: RequestMode::Navigate }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Response type as seen by the page.
///
/// Only `Basic` (same-origin, readable) responses are stored at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseKind::Basic),
            "cors" => Ok(ResponseKind::Cors),
            "opaque" => Ok(ResponseKind::Opaque),
            "error" => Ok(ResponseKind::Error),
            other => Err(Error::CorruptEntry(format!("unknown response kind: {other}"))),
        }
    }
}

/// Body of the synthesized response for resources missing while offline.
pub const OFFLINE_MESSAGE: &str = "This resource is not available offline";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
    /// Final URL, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Response {
    /// A same-origin response with a single Content-Type header.
    pub fn new(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: vec![("Content-Type".into(), content_type.into())],
            body: body.into(),
            kind: ResponseKind::Basic,
            url: None,
        }
    }

    /// The 503 JSON payload served when neither cache nor network can answer.
    pub fn offline() -> Self {
        let body = serde_json::json!({ "error": "Offline", "message": OFFLINE_MESSAGE });
        Self::new(503, "application/json", body.to_string())
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_payload() {
        let response = Response::offline();
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.header("content-type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["message"], OFFLINE_MESSAGE);
    }

    #[test]
    fn test_request_helpers() {
        let url = Url::parse("http://localhost:8080/").unwrap();
        let nav = Request::navigate(url.clone());
        assert!(nav.is_navigation() && nav.is_http() && nav.is_get());

        let post = Request::get(url).with_method("post");
        assert_eq!(post.method, "POST");
        assert!(!post.is_get());

        let data = Request::get(Url::parse("data:text/plain,hi").unwrap());
        assert!(!data.is_http());
    }

    #[test]
    fn test_response_kind_round_trip() {
        for kind in [ResponseKind::Basic, ResponseKind::Cors, ResponseKind::Opaque, ResponseKind::Error] {
            assert_eq!(kind.as_str().parse::<ResponseKind>().unwrap(), kind);
        }
        assert!("weird".parse::<ResponseKind>().is_err());
    }

    #[test]
    fn test_ok_range() {
        assert!(Response::new(204, "text/plain", "").ok());
        assert!(!Response::new(304, "text/plain", "").ok());
    }
}
