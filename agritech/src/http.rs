use crate::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Deadline for third-party provider calls unless a client overrides it.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request knobs for [`HttpClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Query pairs appended to the URL, encoded by reqwest.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// Send cookies/credentials along with the request. Default true.
    pub with_credentials: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            query: Vec::new(),
            headers: HeaderMap::new(),
            with_credentials: true,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    /// Returns an application error if the body cannot be serialized.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in &headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }
}

/// JSON client bound to one base URL (the dashboard backend).
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
    default_headers: HeaderMap,
}

impl HttpClient {
    /// Creates a client for `base_url`, e.g. `http://localhost:8000/api`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout: None,
            default_headers,
        }
    }

    /// Fails requests that take longer than `timeout` with [`Error::Timeout`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header sent with every request. Caller headers still win.
    #[must_use]
    pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `endpoint` onto the base URL; a leading slash is optional.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Issues a request and decodes the JSON response as `T`.
    ///
    /// # Errors
    /// - [`Error::Transport`] when no response arrives
    /// - [`Error::Timeout`] when the configured timeout elapses
    /// - [`Error::Protocol`] for non-2xx statuses
    /// - [`Error::Application`] when the query cannot be encoded, a 2xx
    ///   body carries an `error` field or does not decode as `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, Error> {
        let (url, request) = self.prepare(endpoint, &options);
        self.send(&url, &options, request).await
    }

    fn prepare(&self, endpoint: &str, options: &RequestOptions) -> (String, RequestBuilder) {
        let url = self.url(endpoint);
        let mut headers = self.default_headers.clone();
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if let Some(timeout) = self.timeout {
            request = apply_timeout(request, timeout);
        }
        (url, request)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
        request: RequestBuilder,
    ) -> Result<T, Error> {
        // Browser credential modes only exist on wasm32.
        #[cfg(target_arch = "wasm32")]
        let request = if options.with_credentials {
            request.fetch_credentials_include()
        } else {
            request.fetch_credentials_same_origin()
        };

        tracing::debug!(
            method = %options.method,
            %url,
            with_credentials = options.with_credentials,
            "sending request"
        );
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = Error::from(err);
                tracing::error!(%url, error = %err, "request failed");
                return Err(err);
            }
        };

        read_json(response).await.inspect_err(|err| {
            tracing::error!(%url, error = %err, "request failed");
        })
    }

    /// # Errors
    /// See [`HttpClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.request(endpoint, RequestOptions::default()).await
    }

    /// GET with URL-encoded query parameters. Values must be scalars;
    /// anything else fails before a request is sent.
    ///
    /// # Errors
    /// See [`HttpClient::request`].
    pub async fn get_with_query<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T, Error>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let options = RequestOptions::default();
        let (url, request) = self.prepare(endpoint, &options);
        self.send(&url, &options, request.query(query)).await
    }

    /// # Errors
    /// See [`HttpClient::request`].
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let options = RequestOptions::new(Method::POST).with_body(body)?;
        self.request(endpoint, options).await
    }

    /// # Errors
    /// See [`HttpClient::request`].
    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let options = RequestOptions::new(Method::PUT).with_body(body)?;
        self.request(endpoint, options).await
    }

    /// # Errors
    /// See [`HttpClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        self.request(endpoint, RequestOptions::new(Method::DELETE))
            .await
    }
}

/// Per-request deadline; reqwest has no timer on wasm32.
pub(crate) fn apply_timeout(request: RequestBuilder, timeout: Duration) -> RequestBuilder {
    #[cfg(not(target_arch = "wasm32"))]
    let request = request.timeout(timeout);
    #[cfg(target_arch = "wasm32")]
    let _ = timeout;
    request
}

/// Decodes a response, classifying non-2xx statuses and 2xx bodies that
/// carry an `error` field.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::from_status(status, &body));
    }

    let value: Value = serde_json::from_str(&body)?;
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(Error::Application(message.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_normalizes_leading_and_trailing_slashes() {
        let client = HttpClient::new("http://localhost:8000/api/");
        assert_eq!(client.url("auth/login"), "http://localhost:8000/api/auth/login");
        assert_eq!(client.url("/auth/login"), "http://localhost:8000/api/auth/login");
    }

    #[test]
    fn query_pairs_accumulate_in_order() {
        let options = RequestOptions::default()
            .with_query([("lat", "48.85")])
            .with_query([("lon".to_string(), 2.35.to_string())]);
        assert_eq!(
            options.query,
            vec![
                ("lat".to_string(), "48.85".to_string()),
                ("lon".to_string(), "2.35".to_string())
            ]
        );
    }

    #[test]
    fn caller_headers_override_defaults() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let options = RequestOptions::default().with_headers(headers);
        assert_eq!(options.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert!(options.with_credentials);
        assert_eq!(options.method, Method::GET);
    }
}
