use std::future::Future;

use bytes::Bytes;
use reqwest::{Client, ClientBuilder, StatusCode};

use crate::error::{ProxyError, ProxyResult};

/// Status and body of a completed GET request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body of a 2xx response, [`ProxyError::HttpError`] otherwise.
    pub fn into_success(self) -> ProxyResult<Bytes> {
        if self.status.is_success() {
            Ok(self.body)
        } else {
            Err(ProxyError::HttpError(self.status))
        }
    }
}

/// Fetches manifests and segments.
pub trait Transport: Send + Sync + 'static {
    /// Issues a GET request. Only failures to obtain a response are errors;
    /// non-2xx responses are returned as they are.
    fn get(&self, url: &str) -> impl Future<Output = ProxyResult<TransportResponse>> + Send;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> ProxyResult<Self> {
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Transport for HttpClient {
    async fn get(&self, url: &str) -> ProxyResult<TransportResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}
