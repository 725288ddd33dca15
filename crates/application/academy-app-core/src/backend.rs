use anyhow::{Context, Result};
use academy_infra::{default_http_client, ApiClient};
use academy_wizard::HttpCourseApi;

use crate::domain::AppSettings;

/// Build the HTTP course backend described by `settings`.
pub fn http_course_api(settings: &AppSettings) -> Result<HttpCourseApi> {
    let client = default_http_client(settings.request_timeout_secs)
        .context("Failed to build HTTP client")?;
    let api = ApiClient::new(client, &settings.api_base_url, settings.api_token.clone())
        .with_context(|| format!("Invalid API base URL {}", settings.api_base_url))?;
    Ok(HttpCourseApi::new(api, settings.upload_concurrency))
}
