use crate::constants::*;
use crate::data_structures::{DiscussionView, TopicMeta};
use crate::errors::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use async_recursion::async_recursion;
use bytes::Bytes;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT))
            .build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[async_recursion]
    async fn fetch_bytes(&self, url: &str, attempt: u32) -> AppResult<Bytes> {
        let url_tag = url
            .split('?')
            .next()
            .unwrap_or(url)
            .split('/')
            .next_back()
            .unwrap_or("unknown");
        let log_prefix = format!("API Req GET {}", url_tag);

        let mut request_builder = self.client.get(url).headers(BASE_HEADERS.clone());
        if let Some(token) = &self.token {
            let header = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| AppError::Argument("Token is not a valid header value".into()))?;
            request_builder = request_builder.header(AUTHORIZATION, header);
        }

        match request_builder.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    resp.bytes().await.map_err(AppError::Reqwest)
                } else {
                    // Auth and not-found failures never heal on retry.
                    let retryable = status.is_server_error() || status.as_u16() == 429;
                    let resp_text = resp.text().await.unwrap_or_else(|_| "[text error]".into());
                    let err_name = status.canonical_reason().unwrap_or("Http Error");
                    let msg = format!(
                        "{} - {} (Status: {}) (Try {}/{}) Resp: {}...",
                        log_prefix,
                        err_name,
                        status,
                        attempt + 1,
                        MAX_RETRIES + 1,
                        resp_text.chars().take(100).collect::<String>()
                    );

                    if !retryable || attempt >= MAX_RETRIES {
                        log(LogLevel::Error, &msg);
                        Err(AppError::Api {
                            status: status.as_u16(),
                            message: err_name.to_string(),
                        })
                    } else {
                        log(LogLevel::Warning, &msg);
                        sleep(Duration::from_secs_f32(1.0 * (attempt + 1) as f32)).await;
                        self.fetch_bytes(url, attempt + 1).await
                    }
                }
            }

            Err(e) => {
                let err_name = if e.is_timeout() {
                    "Timeout"
                } else if e.is_connect() {
                    "Connection"
                } else {
                    "Request"
                };
                let msg = format!(
                    "{} - {} Error (Try {}/{})",
                    log_prefix,
                    err_name,
                    attempt + 1,
                    MAX_RETRIES + 1
                );

                if attempt >= MAX_RETRIES {
                    log(LogLevel::Error, &format!("{} Err: {}", msg, e));
                    if e.is_timeout() {
                        Err(AppError::Timeout)
                    } else {
                        Err(AppError::Reqwest(e))
                    }
                } else {
                    log(LogLevel::Warning, &msg);
                    sleep(Duration::from_secs_f32(1.0 * (attempt + 1) as f32)).await;
                    self.fetch_bytes(url, attempt + 1).await
                }
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let mut bytes_vec = self.fetch_bytes(url, 0).await?.to_vec();
        simd_json::from_slice(&mut bytes_vec).map_err(AppError::SimdJsonParse)
    }

    /// Topic metadata; supplies the title the export file is named after.
    pub async fn fetch_topic(&self, course_id: i64, topic_id: i64) -> AppResult<TopicMeta> {
        self.fetch(&topic_endpoint(&self.base_url, course_id, topic_id))
            .await
    }

    /// Full discussion view: the participant list plus the nested entry
    /// tree, in one payload.
    pub async fn fetch_view(&self, course_id: i64, topic_id: i64) -> AppResult<DiscussionView> {
        self.fetch(&view_endpoint(&self.base_url, course_id, topic_id))
            .await
    }
}
