//! Request dispatch against a host + endpoint map.
//!
//! Every request carries JSON content headers, a JSON body and a fixed
//! 60-second timeout. The HTTP status is not inspected: any response that
//! arrives is returned as its raw body, and callers decide from the payload
//! whether the call succeeded.

use crate::error::{SyncError, SyncResult};
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Header name -> value. Later inserts replace earlier ones.
pub type Headers = BTreeMap<String, String>;

/// Sends requests to one external service.
pub struct HttpDispatcher {
    host: String,
    endpoints: BTreeMap<String, String>,
    http_client: Client,
}

impl HttpDispatcher {
    /// Creates a dispatcher for `host` with the given endpoint map.
    pub fn new(host: impl Into<String>, endpoints: BTreeMap<String, String>) -> SyncResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Dispatch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            host: host.into(),
            endpoints,
            http_client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoints(&self) -> &BTreeMap<String, String> {
        &self.endpoints
    }

    /// Default content headers overlaid with the caller's headers.
    pub fn merge_headers(extra: &Headers) -> Headers {
        let mut headers = Headers::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("accept".to_string(), "application/json".to_string()),
        ]);
        headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    /// Resolves `host + endpoints[key]` plus the query string, if any.
    ///
    /// Fails without touching the network when the host is empty or the key
    /// is unknown.
    pub fn url_for(&self, endpoint_key: &str, query: &[(String, String)]) -> SyncResult<String> {
        if self.host.is_empty() {
            return Err(SyncError::Dispatch("Host is not configured".to_string()));
        }

        let path = self
            .endpoints
            .get(endpoint_key)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| {
                SyncError::Dispatch(format!("Endpoint '{}' is not configured", endpoint_key))
            })?;

        let mut url = format!("{}{}", self.host, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&literal_query_string(query)?);
        }
        Ok(url)
    }

    /// Sends one request and returns the raw response body.
    ///
    /// # Arguments
    /// * `endpoint_key` - Key into the endpoint map (e.g. `"post"`)
    /// * `body` - JSON body; not sent for GET requests
    /// * `query` - Query parameters, appended in order
    /// * `headers` - Caller headers, overriding the defaults
    /// * `method` - HTTP method
    pub async fn send(
        &self,
        endpoint_key: &str,
        body: &Value,
        query: &[(String, String)],
        headers: &Headers,
        method: Method,
    ) -> SyncResult<String> {
        let url = self.url_for(endpoint_key, query)?;
        let headers = Self::merge_headers(headers);

        debug!(endpoint = %endpoint_key, method = %method, url = %url, "Sending request");

        let mut request = self.http_client.request(method.clone(), &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if method != Method::GET {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Dispatch(e.to_string()))?;

        debug!(endpoint = %endpoint_key, status = %response.status(), "Response received");

        response
            .text()
            .await
            .map_err(|e| SyncError::Dispatch(e.to_string()))
    }
}

/// Form-encodes `params`, then decodes the result again.
///
/// The external services this talks to expect literal characters in the
/// query string, so `q=a b&tag=x/y` goes out as written rather than as
/// `q=a+b&tag=x%2Fy`.
pub fn literal_query_string(params: &[(String, String)]) -> SyncResult<String> {
    let encoded = serde_urlencoded::to_string(params)
        .map_err(|e| SyncError::Dispatch(format!("Failed to encode query: {}", e)))?;
    let spaced = encoded.replace('+', " ");
    let decoded = urlencoding::decode_binary(spaced.as_bytes());
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}
