//! Shared reqwest plumbing for the HTTP adapters

use paa_pipeline_domain::AdapterError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default request timeout for service calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

/// Classify a transport-level failure
pub(crate) fn send_error(e: reqwest::Error, timeout: Duration) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout(timeout)
    } else {
        AdapterError::Network(e.to_string())
    }
}

/// Pass successful responses through and classify everything else
pub(crate) async fn check(response: Response, service: &str) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AdapterError::Auth(format!(
            "{} rejected the credentials",
            service
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(AdapterError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(AdapterError::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    format!("{} returned {}", service, status)
                } else {
                    body
                },
            })
        }
    }
}

pub(crate) async fn json<T: DeserializeOwned>(response: Response) -> Result<T, AdapterError> {
    response
        .json()
        .await
        .map_err(|e| AdapterError::InvalidResponse(e.to_string()))
}
