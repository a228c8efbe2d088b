//! Blocking bridge over the async HTTP client.

use reqwest::{RequestBuilder, StatusCode};
use tracing::debug;

use crate::error::ServiceError;

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn into_error(self, method: &str, url: &str) -> ServiceError {
        ServiceError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status: self.status.as_u16(),
            body: self.body,
        }
    }
}

/// HTTP client driven by a dedicated current-thread runtime.
///
/// Every call blocks until the response body has been read.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ServiceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ServiceError::Runtime)?;
        let client = {
            let _guard = runtime.enter();
            reqwest::Client::builder()
                .user_agent(concat!("modsync/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|source| ServiceError::Transport {
                    url: String::new(),
                    source,
                })?
        };
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn execute(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<HttpResponse, ServiceError> {
        debug!(method, url, "Sending request");
        let transport_error = |source| ServiceError::Transport {
            url: url.to_string(),
            source,
        };
        self.runtime.block_on(async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            let body = response.text().await.map_err(transport_error)?;
            debug!(method, url, status = status.as_u16(), "Received response");
            Ok(HttpResponse { status, body })
        })
    }
}
