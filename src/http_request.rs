use http::header::{HeaderName, REFERER, USER_AGENT};
use http::{request, StatusCode, Version};
use serde::{Deserialize, Serialize};

/// HTTP request metadata attached to a log entry.
///
/// Field names and optionality follow the platform's `HttpRequest`
/// object; absent optional values are omitted from the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestInfo {
    pub request_method: String,
    pub request_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_size: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
    #[serde(default)]
    pub cache_lookup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_validated_with_origin_server: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_fill_bytes: Option<String>,
    pub protocol: String,
}

/// The `httpRequest` sub-entry as carried by a record.
///
/// Records built in process carry typed info; records read from their JSON
/// line shape carry whatever object the front-end wrote, unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HttpRequest {
    Info(HttpRequestInfo),
    Raw(serde_json::Value),
}

impl From<HttpRequestInfo> for HttpRequest {
    fn from(info: HttpRequestInfo) -> Self {
        HttpRequest::Info(info)
    }
}

impl From<serde_json::Value> for HttpRequest {
    fn from(value: serde_json::Value) -> Self {
        HttpRequest::Raw(value)
    }
}

impl HttpRequestInfo {
    /// Minimal request info; every optional field is left unset.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            request_method: method.into(),
            request_url: url.into(),
            request_size: None,
            status,
            response_size: None,
            user_agent: None,
            remote_ip: None,
            server_ip: None,
            referer: None,
            latency: None,
            cache_lookup: false,
            cache_hit: None,
            cache_validated_with_origin_server: None,
            cache_fill_bytes: None,
            protocol: protocol.into(),
        }
    }

    /// Build request info from the head of a served request and the
    /// response status.
    ///
    /// Reads the method, URI, protocol version and the `user-agent` and
    /// `referer` headers. Cache lookups are reported as not performed.
    pub fn from_parts(parts: &request::Parts, status: StatusCode) -> Self {
        let header = |name: HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let mut info = Self::new(
            parts.method.as_str(),
            parts.uri.to_string(),
            status.as_u16(),
            protocol(parts.version),
        );
        info.user_agent = header(USER_AGENT);
        info.referer = header(REFERER);
        info.cache_hit = Some(false);
        info
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(format!("{:.9}s", latency.as_secs_f64()));
        self
    }

    pub fn with_remote_ip(mut self, ip: impl Into<String>) -> Self {
        self.remote_ip = Some(ip.into());
        self
    }

    pub fn with_server_ip(mut self, ip: impl Into<String>) -> Self {
        self.server_ip = Some(ip.into());
        self
    }

    pub fn with_request_size(mut self, bytes: u64) -> Self {
        self.request_size = Some(bytes.to_string());
        self
    }

    pub fn with_response_size(mut self, bytes: u64) -> Self {
        self.response_size = Some(bytes.to_string());
        self
    }
}

/// Render a protocol version as `HTTP/<version>`.
pub fn protocol(version: Version) -> String {
    let v = match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    };
    format!("HTTP/{v}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    #[test]
    fn builds_from_request_parts() {
        let (parts, ()) = Request::get("/orders?id=7")
            .version(Version::HTTP_11)
            .header(USER_AGENT, "curl/8.0")
            .header(REFERER, "https://example.com/")
            .body(())
            .unwrap()
            .into_parts();

        let info = HttpRequestInfo::from_parts(&parts, StatusCode::NOT_FOUND);

        assert_eq!(info.request_method, "GET");
        assert_eq!(info.request_url, "/orders?id=7");
        assert_eq!(info.status, 404);
        assert_eq!(info.protocol, "HTTP/1.1");
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(info.referer.as_deref(), Some("https://example.com/"));
        assert!(!info.cache_lookup);
        assert_eq!(info.cache_hit, Some(false));
    }

    #[test]
    fn omits_unset_optionals_and_uses_camel_case() {
        let info = HttpRequestInfo::new("POST", "/x", 201, "HTTP/2.0")
            .with_latency(std::time::Duration::from_millis(1500));
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["requestMethod"], "POST");
        assert_eq!(json["cacheLookup"], false);
        assert_eq!(json["latency"], "1.500000000s");
        assert!(json.get("userAgent").is_none());
        assert!(json.get("cacheHit").is_none());
    }

    #[test]
    fn raw_request_serializes_verbatim() {
        let raw = serde_json::json!({"method": "GET", "url": "/", "headers": {}});
        let req = HttpRequest::from(raw.clone());
        assert_eq!(serde_json::to_value(&req).unwrap(), raw);

        let typed = HttpRequest::from(HttpRequestInfo::new("GET", "/", 200, "HTTP/1.1"));
        assert_eq!(serde_json::to_value(&typed).unwrap()["requestUrl"], "/");
    }
}
