//! HTTP transport abstraction.
//!
//! [`BackendClient`](crate::client::BackendClient) owns retry, failover and
//! envelope parsing; a [`Transport`] only moves bytes. [`ReqwestTransport`]
//! is the production implementation and [`mock::MockTransport`] a scripted
//! one for tests.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{Error, Result};

/// Content type of every POST body. A simple content type keeps browsers
/// and Apps Script from requiring a CORS preflight.
pub const PLAIN_TEXT_UTF8: &str = "text/plain;charset=utf-8";

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves requests to the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as `text/plain;charset=utf-8`.
    async fn post(&self, url: &str, body: String) -> Result<HttpResponse>;

    /// GETs `url`.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT_UTF8));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(url, format!("failed to read body: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, url: &str, body: String) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, PLAIN_TEXT_UTF8)
            .body(body)
            .send()
            .await?;
        Self::read(url, response).await
    }

    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        Self::read(url, response).await
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! Scripted transport for tests. Enabled by the `test-util` feature.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{HttpResponse, Transport};
    use crate::error::{Error, Result};

    /// One scripted reply.
    #[derive(Debug, Clone)]
    pub enum MockReply {
        /// Respond with a status and body
        Respond(HttpResponse),
        /// Fail as if the connection dropped
        Fail(String),
    }

    impl MockReply {
        /// A JSON response.
        pub fn json(status: u16, value: Value) -> Self {
            MockReply::Respond(HttpResponse::new(status, value.to_string()))
        }

        /// A raw text response.
        pub fn text(status: u16, body: impl Into<String>) -> Self {
            MockReply::Respond(HttpResponse::new(status, body))
        }

        /// A transport failure.
        pub fn fail(message: impl Into<String>) -> Self {
            MockReply::Fail(message.into())
        }
    }

    /// A request the mock received.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        /// `POST` or `GET`
        pub method: &'static str,
        /// Target URL
        pub url: String,
        /// Body text (empty for GET)
        pub body: String,
    }

    impl RecordedRequest {
        /// Body parsed as JSON, `Null` when it is not JSON.
        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap_or(Value::Null)
        }
    }

    #[derive(Debug, Default)]
    struct Script {
        replies: VecDeque<(Option<String>, MockReply)>,
        requests: Vec<RecordedRequest>,
    }

    /// Transport that answers from a queue of scripted replies.
    ///
    /// Each request takes the first queued reply whose URL filter (a
    /// substring) matches, or that has no filter. An empty queue is a
    /// transport failure.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        script: Mutex<Script>,
    }

    impl MockTransport {
        /// Creates a mock with the given replies in order.
        pub fn new(replies: Vec<MockReply>) -> Self {
            let mock = Self::default();
            for reply in replies {
                mock.push(reply);
            }
            mock
        }

        /// Creates a mock that answers once with `value`.
        pub fn with_json(value: Value) -> Self {
            Self::new(vec![MockReply::json(200, value)])
        }

        /// Queues a reply for any URL.
        pub fn push(&self, reply: MockReply) -> &Self {
            self.lock().replies.push_back((None, reply));
            self
        }

        /// Queues a reply for the first URL containing `url_part`.
        pub fn push_for(&self, url_part: impl Into<String>, reply: MockReply) -> &Self {
            self.lock().replies.push_back((Some(url_part.into()), reply));
            self
        }

        /// Requests received so far.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.lock().requests.clone()
        }

        /// Number of requests received so far.
        pub fn request_count(&self) -> usize {
            self.lock().requests.len()
        }

        /// Replies not consumed yet.
        pub fn remaining(&self) -> usize {
            self.lock().replies.len()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn answer(&self, method: &'static str, url: &str, body: String) -> Result<HttpResponse> {
            let mut script = self.lock();
            script.requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body,
            });
            let position = script
                .replies
                .iter()
                .position(|(filter, _)| filter.as_deref().is_none_or(|f| url.contains(f)));
            match position.and_then(|i| script.replies.remove(i)) {
                Some((_, MockReply::Respond(response))) => Ok(response),
                Some((_, MockReply::Fail(message))) => Err(Error::transport(url, message)),
                None => Err(Error::transport(url, "no scripted reply")),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, url: &str, body: String) -> Result<HttpResponse> {
            self.answer("POST", url, body)
        }

        async fn get(&self, url: &str) -> Result<HttpResponse> {
            self.answer("GET", url, String::new())
        }
    }
}
