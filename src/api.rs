// API client module: a small blocking HTTP client bound to the catalog
// base URL. Session headers (bearer token, zone id) are stored on the
// client and applied to every request built from it.

use reqwest::blocking::{multipart, Body, Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Header carrying the catalog service instance identifier.
pub const ZONE_HEADER: &str = "Predix-Zone-Id";

/// Blocking client holding the reqwest client, the catalog base URL and
/// the headers injected into every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl ApiClient {
    /// Build a client for `base_url`. A `None` timeout disables the
    /// reqwest default so long uploads and downloads are not cut off.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: HeaderMap::new(),
        })
    }

    /// Set (or replace) a header sent with every request.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_kv(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Replace the bearer token used for the `Authorization` header.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| CatalogError::InvalidHeader(AUTHORIZATION.as_str().to_string()))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        let url = format!("{}{}", self.base_url, join_path(path));
        debug!(%method, %url, "building request");
        let builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers.clone());
        ApiRequest {
            method,
            path: path.to_string(),
            builder,
        }
    }

    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> ApiRequest {
        self.request(Method::POST, path)
    }

    pub fn delete(&self, path: &str) -> ApiRequest {
        self.request(Method::DELETE, path)
    }
}

/// A request in construction. Body helpers consume and return the request
/// so calls chain the same way reqwest's own builder does.
pub struct ApiRequest {
    method: Method,
    path: String,
    builder: RequestBuilder,
}

impl ApiRequest {
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = header_kv(name, value)?;
        self.builder = self.builder.header(name, value);
        Ok(self)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    /// Raw body: a string, bytes or an open file.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    pub fn multipart(mut self, form: multipart::Form) -> Self {
        self.builder = self.builder.multipart(form);
        self
    }

    /// Send the request and buffer the response. Any status is returned;
    /// use [`ApiResponse::success`] where a 2xx is required.
    pub fn send(self) -> Result<ApiResponse> {
        let res = self.builder.send()?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes()?.to_vec();
        debug!(method = %self.method, path = %self.path, %status, "response received");
        Ok(ApiResponse {
            path: self.path,
            status,
            headers,
            body,
        })
    }
}

/// Buffered response: status, headers and the raw body.
#[derive(Debug)]
pub struct ApiResponse {
    path: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| CatalogError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// Turn a non-2xx response into a [`CatalogError::Status`].
    pub fn success(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(CatalogError::Status {
            status: self.status,
            body: self.text(),
            path: self.path,
        })
    }

    /// The `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

pub fn header_kv(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| CatalogError::InvalidHeader(name.to_string()))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| CatalogError::InvalidHeader(name.as_str().to_string()))?;
    Ok((name, value))
}

/// Field deserializer that reads an explicit JSON `null` as the type's
/// default. Pair it with `#[serde(default)]` so missing keys work too.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn join_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn join_path_adds_missing_slash() {
        assert_eq!(join_path("api/v1"), "/api/v1");
        assert_eq!(join_path("/api/v1"), "/api/v1");
        assert_eq!(join_path(""), "");
    }

    #[test]
    fn header_kv_rejects_bad_names() {
        assert!(header_kv("Predix-Zone-Id", "abc").is_ok());
        assert!(matches!(
            header_kv("bad header", "x"),
            Err(CatalogError::InvalidHeader(_))
        ));
    }

    #[test]
    fn session_headers_are_sent_with_every_request() {
        let server = MockServer::start();
        let probe = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/catalog/taxonomy")
                .header("authorization", "Bearer tok")
                .header("predix-zone-id", "zone-1");
            then.status(200).body("[]");
        });

        let mut api = ApiClient::new(&format!("{}/", server.base_url()), None).unwrap();
        api.set_bearer("tok").unwrap();
        api.set_header(ZONE_HEADER, "zone-1").unwrap();
        let res = api.get("/api/v1/catalog/taxonomy").send().unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        probe.assert();
    }

    #[test]
    fn non_success_status_becomes_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/catalog/analytics/a1");
            then.status(404).body("no such analytic");
        });

        let api = ApiClient::new(&server.base_url(), None).unwrap();
        let err = api
            .delete("/api/v1/catalog/analytics/a1")
            .send()
            .unwrap()
            .success()
            .unwrap_err();

        match err {
            CatalogError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "no such analytic");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/catalog/analytics");
            then.status(200).body("<html>maintenance</html>");
        });

        let api = ApiClient::new(&server.base_url(), None).unwrap();
        let res = api.get("/api/v1/catalog/analytics").send().unwrap();
        let decoded: Result<serde_json::Value> = res.json();

        assert!(matches!(decoded, Err(CatalogError::Decode { .. })));
    }
}
