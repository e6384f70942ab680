// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;

/// HTTP response with status code and raw body
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Full response body
    pub body: Bytes,
}

/// HTTP client abstraction for testability
///
/// Providers depend on this trait instead of a concrete client so that
/// tests can serve canned responses and forced failures.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request with the given extra headers
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse, ApiError>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<HttpResponse, ApiError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        Ok(HttpResponse { status, body })
    }
}

/// GET a URL and decode its JSON body
///
/// Non-2xx responses are mapped to [`ApiError::Status`] with the body
/// retained verbatim; decoding failures to [`ApiError::Decode`].
pub async fn get_json<C, T>(
    client: &C,
    url: &Url,
    headers: &[(String, String)],
) -> Result<T, ApiError>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let response = client.get(url, headers).await?;
    decode_json(url, &response)
}

/// Decode an HTTP response body as JSON, enforcing the error taxonomy
pub fn decode_json<T: DeserializeOwned>(url: &Url, response: &HttpResponse) -> Result<T, ApiError> {
    if !(200..300).contains(&response.status) {
        return Err(ApiError::Status {
            url: url.to_string(),
            code: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        source: e,
    })
}
