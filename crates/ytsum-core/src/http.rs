use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HttpError;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used by the transcript provider and the summarizer.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, HttpError>;
}

/// Production backend using reqwest.
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn json_request(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client.post(url).json(body)
    }

    async fn into_response(
        url: &str,
        result: reqwest::Result<reqwest::Response>,
    ) -> Result<HttpResponse, HttpError> {
        let response = result.map_err(|e| http_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| http_error(url, e))?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn http_error(url: &str, err: reqwest::Error) -> HttpError {
    HttpError {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let result = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await;
        Self::into_response(url, result).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, HttpError> {
        let result = self.json_request(url, body).send().await;
        Self::into_response(url, result).await
    }
}

/// A request seen by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    Get { url: String },
    Post { url: String, body: Value },
}

/// Test backend with queued responses. Every request is recorded.
#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: HttpResponse) -> &Self {
        self.push(Ok(response))
    }

    pub fn push_error(&self, error: HttpError) -> &Self {
        self.push(Err(error))
    }

    fn push(&self, entry: Result<HttpResponse, HttpError>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(entry);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next(&self, request: RecordedRequest) -> Result<HttpResponse, HttpError> {
        let url = match &request {
            RecordedRequest::Get { url } | RecordedRequest::Post { url, .. } => url.clone(),
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(HttpError {
                    url,
                    reason: "FakeBackend exhausted".to_string(),
                })
            })
    }
}

#[async_trait]
impl HttpBackend for FakeBackend {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.next(RecordedRequest::Get {
            url: url.to_string(),
        })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, HttpError> {
        self.next(RecordedRequest::Post {
            url: url.to_string(),
            body: body.clone(),
        })
    }
}
