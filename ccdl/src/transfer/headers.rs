//! Request header sets sent to the catalog service and CDN.

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, USER_AGENT};

use crate::error::{FetchError, FetchResult};

/// Identifies the client to the catalog and descriptor endpoints.
const APP_ID: &str = "accc-apps-panel-desktop";
const CLIENT_USER_AGENT: &str = "Adobe Application Manager 2.0";
const API_KEY: &str = "CC_HD_ESD_1_0";

const APP_ID_HEADER: &str = "x-adobe-app-id";
const API_KEY_HEADER: &str = "x-api-key";

/// User agent for plain CDN downloads.
const DOWNLOAD_USER_AGENT: &str = "Creative Cloud";

/// Header naming the build a descriptor request is for.
pub const BUILD_GUID_HEADER: &str = "x-adobe-build-guid";

const COOKIE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const COOKIE_TOKEN_LEN: usize = 26;

/// Request headers for one kind of request.
///
/// Names are case-insensitive; setting a name twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    map: HeaderMap,
}

impl HeaderSet {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`.
    ///
    /// Fails when `value` cannot be sent as a header value.
    pub fn with(mut self, name: HeaderName, value: &str) -> FetchResult<Self> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            FetchError::Config(format!("invalid value for header {}: {}", name, e))
        })?;
        self.map.insert(name, value);
        Ok(self)
    }

    /// Look up a header value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(|v| v.to_str().ok())
    }

    /// The headers as sent on the wire.
    pub fn as_map(&self) -> &HeaderMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The two header sets used during a run.
///
/// The session cookie is generated once so every request of a run presents
/// the same client identity.
#[derive(Debug, Clone)]
pub struct ClientHeaders {
    service: HeaderSet,
    download: HeaderSet,
}

impl ClientHeaders {
    /// Build the header sets, optionally carrying an `Authorization` value.
    pub fn new(auth: Option<&str>) -> FetchResult<Self> {
        let mut service = HeaderSet::new()
            .with(HeaderName::from_static(APP_ID_HEADER), APP_ID)?
            .with(USER_AGENT, CLIENT_USER_AGENT)?
            .with(HeaderName::from_static(API_KEY_HEADER), API_KEY)?
            .with(COOKIE, &session_cookie())?;
        if let Some(auth) = auth {
            service = service.with(AUTHORIZATION, auth)?;
        }

        Ok(Self {
            service,
            download: HeaderSet::new().with(USER_AGENT, DOWNLOAD_USER_AGENT)?,
        })
    }

    /// Headers for catalog and manifest requests.
    pub fn service(&self) -> &HeaderSet {
        &self.service
    }

    /// Headers for a build descriptor request.
    pub fn descriptor(&self, build_id: &str) -> FetchResult<HeaderSet> {
        self.service
            .clone()
            .with(HeaderName::from_static(BUILD_GUID_HEADER), build_id)
    }

    /// Headers for plain CDN package downloads.
    pub fn download(&self) -> &HeaderSet {
        &self.download
    }
}

fn session_cookie() -> String {
    let mut rng = rand::rng();
    let token: String = (0..COOKIE_TOKEN_LEN)
        .map(|_| COOKIE_CHARSET[rng.random_range(0..COOKIE_CHARSET.len())] as char)
        .collect();
    format!("fg={}======", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_headers() {
        let headers = ClientHeaders::new(None).unwrap();
        let service = headers.service();
        assert_eq!(service.get("X-Api-Key"), Some(API_KEY));
        assert_eq!(service.get("x-adobe-app-id"), Some(APP_ID));
        assert_eq!(service.get("User-Agent"), Some(CLIENT_USER_AGENT));
        assert!(service.get("Authorization").is_none());
        assert_eq!(headers.download().get("user-agent"), Some(DOWNLOAD_USER_AGENT));
    }

    #[test]
    fn test_auth_header_added() {
        let headers = ClientHeaders::new(Some("Bearer token")).unwrap();
        assert_eq!(headers.service().get("authorization"), Some("Bearer token"));
        assert!(headers.download().get("Authorization").is_none());
    }

    #[test]
    fn test_invalid_auth_is_config_error() {
        let result = ClientHeaders::new(Some("Bearer a\nb"));
        assert!(matches!(result, Err(FetchError::Config(_))));
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie();
        let token = cookie
            .strip_prefix("fg=")
            .and_then(|s| s.strip_suffix("======"))
            .unwrap();
        assert_eq!(token.len(), COOKIE_TOKEN_LEN);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_descriptor_headers_carry_build_id() {
        let headers = ClientHeaders::new(None).unwrap();
        let descriptor = headers.descriptor("guid-1").unwrap();
        assert_eq!(descriptor.get(BUILD_GUID_HEADER), Some("guid-1"));
        assert_eq!(descriptor.get("Cookie"), headers.service().get("Cookie"));
        assert!(headers.service().get(BUILD_GUID_HEADER).is_none());
    }

    #[test]
    fn test_with_replaces_existing_value() {
        let set = HeaderSet::new()
            .with(USER_AGENT, "a")
            .unwrap()
            .with(HeaderName::from_static("user-agent"), "b")
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("USER-AGENT"), Some("b"));
    }
}
