// Authenticated passthrough to any catalog endpoint under `/api`.

use reqwest::Method;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::api::{ApiClient, ApiResponse};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Default)]
pub struct CurlRequest {
    /// Path below `/api`.
    pub path: String,
    /// Explicit method (`-X`); wins over the POST implied by data.
    pub method: Option<String>,
    /// Raw `Name: value` header strings (`-H`).
    pub headers: Vec<String>,
    /// Body text, or `@file` to read it from a file (`-d`).
    pub data: Option<String>,
}

impl CurlRequest {
    pub fn body(&self) -> Result<Option<String>> {
        match self.data.as_deref() {
            None => Ok(None),
            Some(data) => match data.strip_prefix('@') {
                Some(file) => std::fs::read_to_string(file)
                    .map(Some)
                    .map_err(|e| CatalogError::io(format!("Error creating request ({})", file), e)),
                None => Ok(Some(data.to_string())),
            },
        }
    }

    /// `-X` if given, else POST when there is a body, else GET.
    pub fn method(&self, body: Option<&str>) -> Result<Method> {
        match self.method.as_deref() {
            Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|_| CatalogError::Input(format!("invalid HTTP method {}", m))),
            None if self.data.is_some() || body.is_some_and(|b| !b.is_empty()) => Ok(Method::POST),
            None => Ok(Method::GET),
        }
    }

    /// Header pairs; entries without a `:` are skipped.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|h| match h.split_once(':') {
                Some((name, value)) => Some((name.to_string(), value.trim_matches(' ').to_string())),
                None => {
                    warn!(header = %h, "ignoring header without ':'");
                    None
                }
            })
            .collect()
    }

    pub fn send(&self, api: &ApiClient) -> Result<ApiResponse> {
        let body = self.body()?;
        let method = self.method(body.as_deref())?;
        let path = format!("/api/{}", self.path.trim_start_matches('/'));

        let mut request = api.request(method, &path);
        for (name, value) in self.header_pairs() {
            request = request.header(&name, &value)?;
        }
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            request = request.body(body);
        }
        request.send()
    }
}

/// Response headers as `Name: value` lines.
pub fn format_headers(res: &ApiResponse) -> String {
    res.headers()
        .iter()
        .map(|(name, value)| format!("{}: {}", name.as_str(), String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The body for display: JSON responses are re-indented by three spaces
/// when they parse, everything else is shown as is.
pub fn format_body(res: &ApiResponse) -> String {
    let text = res.text();
    if res.content_type() != Some("application/json") {
        return text;
    }
    pretty_json(&text).unwrap_or(text)
}

fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

/// Write `body` to `path`, creating missing parent directories.
pub fn write_output(path: &Path, body: &[u8]) -> Result<()> {
    if !path.exists() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| CatalogError::io(format!("creating {}", dir.display()), e))?;
        }
    }
    std::fs::write(path, body).map_err(|e| CatalogError::io(format!("writing {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn req(method: Option<&str>, data: Option<&str>) -> CurlRequest {
        CurlRequest {
            path: "/v1/catalog/analytics".into(),
            method: method.map(str::to_string),
            headers: Vec::new(),
            data: data.map(str::to_string),
        }
    }

    #[test]
    fn method_selection() {
        assert_eq!(req(None, None).method(None).unwrap(), Method::GET);
        assert_eq!(req(None, Some("{}")).method(Some("{}")).unwrap(), Method::POST);
        assert_eq!(req(Some("put"), Some("{}")).method(Some("{}")).unwrap(), Method::PUT);
        assert_eq!(req(Some("DELETE"), None).method(None).unwrap(), Method::DELETE);
    }

    #[test]
    fn data_can_come_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("body.json");
        std::fs::write(&file, r#"{"a":1}"#).unwrap();
        let r = req(None, Some(&format!("@{}", file.display())));
        assert_eq!(r.body().unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn headers_split_on_first_colon() {
        let r = CurlRequest {
            headers: vec![
                "Accept: application/json".into(),
                "X-Url:  http://x:80 ".into(),
                "garbage".into(),
            ],
            ..Default::default()
        };
        assert_eq!(
            r.header_pairs(),
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("X-Url".to_string(), "http://x:80".to_string()),
            ]
        );
    }

    #[test]
    fn json_response_is_reindented() {
        let server = MockServer::start();
        let hit = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/catalog/taxonomy")
                .header("x-trace", "1")
                .body(r#"{"node_name":"a"}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"ok":true}"#);
        });

        let api = ApiClient::new(&server.base_url(), None).unwrap();
        let r = CurlRequest {
            path: "v1/catalog/taxonomy".into(),
            method: None,
            headers: vec!["x-trace: 1".into()],
            data: Some(r#"{"node_name":"a"}"#.into()),
        };
        let res = r.send(&api).unwrap();

        hit.assert();
        assert_eq!(format_body(&res), "{\n   \"ok\": true\n}");
        assert!(format_headers(&res).contains("content-type: application/json"));
    }

    #[test]
    fn output_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.txt");
        write_output(&target, b"hello").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }
}
