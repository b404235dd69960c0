//! Supabase Storage backend (REST API)

use super::{
    ObjectEntry, Storage, StorageError, StorageErrorKind, StorageResult, UploadOptions, LIST_LIMIT,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct SupabaseStorage {
    base_url: String,
    api_key: String,
    bucket: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    sort_by: SortBy,
}

#[derive(Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Error body: `{"statusCode": "404", "error": "not_found", "message": "Object not found"}`
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ErrorBody {
    status_code: Option<serde_json::Value>,
    error: Option<String>,
    message: Option<String>,
}

/// Classify a failed response by the status code in the body when there is
/// one (the API wraps some 404s in a 400), else by the HTTP status.
pub(crate) fn classify(http_status: u16, body: &str) -> StorageError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let body_status = parsed.status_code.as_ref().and_then(|v| match v {
        serde_json::Value::String(s) => s.parse::<u16>().ok(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    });
    let status = body_status.unwrap_or(http_status);
    let kind = match status {
        404 => StorageErrorKind::NotFound,
        409 => StorageErrorKind::AlreadyExists,
        401 | 403 => StorageErrorKind::PermissionDenied,
        _ => StorageErrorKind::Transient,
    };
    let message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("request failed with status {}", http_status));
    StorageError::new(kind, message)
}

impl SupabaseStorage {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
        timeout_seconds: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
            client,
        }
    }

    /// `{base}/storage/v1/{segments...}/{object path}`
    pub(crate) fn endpoint(&self, segments: &[&str], path: &str) -> StorageResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::transient(format!("invalid storage url: {}", e)))?;
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| StorageError::transient("storage url cannot be a base"))?;
            parts.pop_if_empty().extend(["storage", "v1"]).extend(segments);
            parts.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn auth_headers(&self) -> StorageResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| StorageError::transient(format!("invalid auth header: {}", e)))?;
        let apikey = HeaderValue::from_str(&self.api_key)
            .map_err(|e| StorageError::transient(format!("invalid apikey header: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", apikey);
        Ok(headers)
    }

    async fn check(resp: Response) -> StorageResult<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        debug!(status, body = %body, "storage request failed");
        Err(classify(status, &body))
    }

    async fn send_object(
        &self,
        method: reqwest::Method,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> StorageResult<()> {
        let url = self.endpoint(&["object", self.bucket.as_str()], path)?;
        let mut headers = self.auth_headers()?;
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| StorageError::transient(format!("invalid content type: {}", e)))?;
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert("x-upsert", HeaderValue::from_static(if upsert { "true" } else { "false" }));
        headers.insert("cache-control", HeaderValue::from_static("max-age=3600"));

        let resp = self
            .client
            .request(method, url)
            .headers(headers)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::transient(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for SupabaseStorage {
    fn backend_tag(&self) -> &'static str {
        "supabase"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(name = "supabase_list", skip(self))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        let url = self.endpoint(&["object", "list", self.bucket.as_str()], "")?;
        let body = ListRequest {
            prefix,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let resp = self
            .client
            .post(url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::transient(e.to_string()))?;
        let resp = Self::check(resp).await?;
        resp.json::<Vec<ObjectEntry>>()
            .await
            .map_err(|e| StorageError::transient(format!("list response parse failed: {}", e)))
    }

    #[instrument(name = "supabase_upload", skip(self, bytes, options), fields(len = bytes.len()))]
    async fn upload(&self, path: &str, bytes: Vec<u8>, options: UploadOptions) -> StorageResult<()> {
        self.send_object(reqwest::Method::POST, path, bytes, &options.content_type, options.upsert)
            .await
    }

    #[instrument(name = "supabase_download", skip(self))]
    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        let url = self.endpoint(&["object", self.bucket.as_str()], path)?;
        let resp = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| StorageError::transient(e.to_string()))?;
        let resp = Self::check(resp).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| StorageError::transient(format!("read body failed: {}", e)))
    }

    #[instrument(name = "supabase_update", skip(self, bytes), fields(len = bytes.len()))]
    async fn update(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.send_object(reqwest::Method::PUT, path, bytes, content_type, true)
            .await
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.endpoint(&["object", "public", self.bucket.as_str()], path)
            .ok()
            .map(|u| u.to_string())
    }

    #[instrument(name = "supabase_sign", skip(self))]
    async fn create_signed_url(&self, path: &str, ttl_seconds: u64) -> StorageResult<String> {
        let url = self.endpoint(&["object", "sign", self.bucket.as_str()], path)?;
        let resp = self
            .client
            .post(url)
            .headers(self.auth_headers()?)
            .json(&SignRequest {
                expires_in: ttl_seconds,
            })
            .send()
            .await
            .map_err(|e| StorageError::transient(e.to_string()))?;
        let resp = Self::check(resp).await?;
        let signed: SignResponse = resp
            .json()
            .await
            .map_err(|e| StorageError::transient(format!("sign response parse failed: {}", e)))?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStorage {
        SupabaseStorage::new("https://abc.supabase.co/", "anon-key", "robodoc", 30)
    }

    #[test]
    fn test_endpoint_layout() {
        let s = store();
        let url = s.endpoint(&["object", "robodoc"], "SCARA/2525/Incoming/a.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/storage/v1/object/robodoc/SCARA/2525/Incoming/a.jpg"
        );
        let list = s.endpoint(&["object", "list", "robodoc"], "").unwrap();
        assert_eq!(list.as_str(), "https://abc.supabase.co/storage/v1/object/list/robodoc");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let url = store().endpoint(&["object", "robodoc"], "SCARA/25 25/a.jpg").unwrap();
        assert!(url.as_str().ends_with("/robodoc/SCARA/25%2025/a.jpg"));
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            store().public_url("IVR/7001/Incoming/manifest.json").as_deref(),
            Some("https://abc.supabase.co/storage/v1/object/public/robodoc/IVR/7001/Incoming/manifest.json")
        );
    }

    #[test]
    fn test_classify_body_status_wins() {
        let e = classify(400, r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#);
        assert_eq!(e.kind, StorageErrorKind::NotFound);
        assert_eq!(e.message, "Bucket not found");

        let e = classify(400, r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#);
        assert_eq!(e.kind, StorageErrorKind::AlreadyExists);
    }

    #[test]
    fn test_classify_http_status_fallback() {
        assert_eq!(classify(404, "").kind, StorageErrorKind::NotFound);
        assert_eq!(classify(403, "<html>").kind, StorageErrorKind::PermissionDenied);
        let e = classify(502, "");
        assert_eq!(e.kind, StorageErrorKind::Transient);
        assert_eq!(e.message, "request failed with status 502");
    }

    #[test]
    fn test_classify_numeric_status_and_error_field() {
        let e = classify(400, r#"{"statusCode":403,"error":"Unauthorized"}"#);
        assert_eq!(e.kind, StorageErrorKind::PermissionDenied);
        assert_eq!(e.message, "Unauthorized");
    }

    #[test]
    fn test_classify_out_of_range_body_status() {
        // 65940 wraps to 404 if narrowed
        let e = classify(500, r#"{"statusCode":65940,"message":"boom"}"#);
        assert_eq!(e.kind, StorageErrorKind::Transient);

        let e = classify(404, r#"{"statusCode":-1}"#);
        assert_eq!(e.kind, StorageErrorKind::NotFound);
    }
}
