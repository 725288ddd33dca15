use academy_core::envelope::ResponseBody;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

mod upload;

pub use upload::{UploadRequest, UploadedFile, Uploader};

/// Failures surfaced by the course API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not reach the server: {0}")]
    Transport(String),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("response is missing `{0}`")]
    MissingField(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never got an answer.
    Connectivity,
    /// The server answered but refused the request (non-2xx or `ok: false`).
    Api,
    /// The answer could not be understood.
    Protocol,
    /// Something failed before the request left the process.
    Local,
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Transport(_) => ApiErrorKind::Connectivity,
            ApiError::Status { .. } | ApiError::Rejected(_) => ApiErrorKind::Api,
            ApiError::Decode(_) | ApiError::MissingField(_) => ApiErrorKind::Protocol,
            ApiError::InvalidUrl { .. } | ApiError::Io(_) => ApiErrorKind::Local,
        }
    }
}

const MAX_ERROR_BODY: usize = 200;

pub fn default_http_client(timeout_secs: u64) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("academy/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Normalize a base URL so that relative endpoints are appended to its path.
pub(crate) fn normalize_base(base_url: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| ApiError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: "not a base url".into(),
        });
    }
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

/// Thin wrapper over `reqwest` that speaks the backend's envelope dialect.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client,
            base: normalize_base(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded,
    /// so identifiers coming back from the server can be used as-is.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl {
                url: self.base.to_string(),
                reason: "cannot mutate url segments".into(),
            })?;
            path.pop_if_empty();
            for s in segments {
                path.push(s);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Send a JSON request and return the normalized payload.
    ///
    /// Connectivity failures, non-2xx statuses and `ok: false` envelopes are
    /// all errors; a successful answer with no payload is `Ok(None)`.
    pub async fn fetch_api(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "api request");
        let mut req = self.request(method, url);
        if let Some(b) = body {
            req = req.json(b);
        }
        self.execute(req).await
    }

    /// POST a multipart form. The structured part is expected under the
    /// `data` field and each file as its own part.
    pub async fn send_multipart(
        &self,
        segments: &[&str],
        form: reqwest::multipart::Form,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "api multipart request");
        let req = self.request(Method::POST, url).multipart(form);
        self.execute(req).await
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Option<Value>, ApiError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("reading body failed: {e}")))?;

        let parsed: Option<Value> = if text.trim().is_empty() {
            Some(Value::Null)
        } else {
            serde_json::from_str(&text).ok()
        };

        if !status.is_success() {
            let message = parsed
                .map(ResponseBody::classify)
                .and_then(|b| b.message().map(str::to_string))
                .unwrap_or_else(|| truncate(&text));
            warn!(status = status.as_u16(), %message, "api request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = parsed
            .map(ResponseBody::classify)
            .ok_or_else(|| ApiError::Decode(format!("body is not JSON: {}", truncate(&text))))?;

        if let ResponseBody::Envelope { ok: false, .. } = &body {
            let message = body.message().unwrap_or("request failed").to_string();
            warn!(%message, "api rejected request");
            return Err(ApiError::Rejected(message));
        }

        Ok(body.into_payload())
    }
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let api = ApiClient::new(Client::new(), "https://host/api/v1", None).unwrap();
        let url = api.endpoint(&["courses", "42", "modules"]).unwrap();
        assert_eq!(url.as_str(), "https://host/api/v1/courses/42/modules");
    }

    #[test]
    fn segments_are_encoded() {
        let api = ApiClient::new(Client::new(), "https://host/", None).unwrap();
        let url = api.endpoint(&["lessons", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://host/lessons/a%2Fb%20c");
    }

    #[test]
    fn invalid_base_is_rejected() {
        let err = ApiClient::new(Client::new(), "not a url", None).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Local);
    }

    #[test]
    fn blank_token_is_dropped() {
        let api = ApiClient::new(Client::new(), "https://host/", Some("  ".into())).unwrap();
        assert!(api.token.is_none());
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(500);
        assert_eq!(truncate(&long).chars().count(), MAX_ERROR_BODY + 1);
    }
}
