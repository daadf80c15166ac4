//! HTTP Transport
//!
//! HTTP client interface and implementations for provider requests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ConnectionError, LifecycleError, ProviderError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LifecycleError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Self {
        Self::with_options(Duration::from_secs(30), 1048576) // 1MB
    }

    /// Create a transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none()) // Don't follow redirects for token endpoints
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            default_timeout: timeout,
            max_response_size,
        }
    }
}

impl Default for ReqwestHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LifecycleError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder = req_builder.timeout(timeout);

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LifecycleError::Connection(ConnectionError::Timeout { timeout })
            } else {
                LifecycleError::Connection(ConnectionError::Failed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();

        // A token endpoint never redirects; treat one as a broken response.
        if (300..400).contains(&status) {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(LifecycleError::Provider(ProviderError::Malformed {
                message: format!("unexpected redirect to {}", location),
            }));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(LifecycleError::Provider(ProviderError::Malformed {
                    message: format!("response too large: {} bytes", len),
                }));
            }
        }

        let body = response.text().await.map_err(|e| {
            LifecycleError::Provider(ProviderError::Malformed {
                message: e.to_string(),
            })
        })?;

        if body.len() > self.max_response_size {
            return Err(LifecycleError::Provider(ProviderError::Malformed {
                message: format!("response too large: {} bytes", body.len()),
            }));
        }

        Ok(HttpResponse { status, body })
    }
}

/// Mock HTTP transport for testing.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: std::sync::Mutex<Vec<HttpResponse>>,
    request_history: std::sync::Mutex<Vec<HttpRequest>>,
}

impl MockHttpTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        self.queue_response(HttpResponse {
            status,
            body: serde_json::to_string(body).unwrap(),
        })
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().unwrap().clone()
    }

    /// Get the last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LifecycleError> {
        self.request_history.lock().unwrap().push(request);

        self.responses.lock().unwrap().pop().ok_or_else(|| {
            LifecycleError::Connection(ConnectionError::Failed {
                message: "No mock response available".to_string(),
            })
        })
    }
}
