use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

const JSON_CONTENT_TYPE: &str = "application/json";

pub struct SongClient {
    http: reqwest::Client,
    base_url: String,
}

impl SongClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let base = url::Url::parse(&config.api_base_url)
            .map_err(|e| AppError::Config(format!("Invalid api_base_url: {}", e)))?;

        // The backend may be cold-started, so requests get a generous timeout.
        let http = reqwest::Client::builder()
            .user_agent("Songdeck/0.1.0")
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<reqwest::Response> {
        let url = self.endpoint(path);
        let response = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .query(query)
            .send()
            .await?;
        self.check_response(response).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<reqwest::Response> {
        let url = self.endpoint(path);
        let response = self
            .http
            .delete(&url)
            .headers(self.default_headers())
            .send()
            .await?;
        self.check_response(response).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> AppResult<reqwest::Response> {
        let url = self.endpoint(path);
        let response = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .multipart(form)
            .send()
            .await?;
        self.check_response(response).await
    }

    /// Fetch an absolute URL (song files live on a CDN, not under the API base).
    pub async fn get_absolute(&self, url: &str) -> AppResult<reqwest::Response> {
        let response = self.http.get(url).send().await?;
        self.check_response(response).await
    }

    async fn check_response(&self, response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(AppError::NotFound("Resource not found".into()))
        } else if status == reqwest::StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| "File already exists.".into());
            Err(AppError::Conflict(message))
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            let message = error_message(&body).unwrap_or(body);
            Err(AppError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Pull `message` out of a JSON error body, if the body is JSON.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")
        .and_then(|v| v.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
