use reqwest::{Method, RequestBuilder, Response};

use crate::error::VaultError;

/// A simple wrapper on an HTTP client for making requests. Sets a
/// User-Agent identifying the client. No timeout is applied and nothing is
/// retried: every call here is user-triggered, and a transport failure must
/// surface immediately rather than re-run behind the user's back.
pub(crate) struct Request {
    client: reqwest::Client,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new() -> Self {
        let client = reqwest::Client::new();
        Self { client }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).header(
            "User-Agent",
            format!("chronovault-core/{}", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Creates a POST request builder with defaults applied.
    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Sends a request built by `req`/`post`, mapping transport failures to
    /// [`VaultError::NetworkError`] with the target URL attached.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, VaultError> {
        let (client, request) = request_builder.build_split();
        let request = request.map_err(|err| VaultError::NetworkError {
            url: err
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            error: format!("request build failed: {err}"),
        })?;
        let url = request.url().to_string();

        client
            .execute(request)
            .await
            .map_err(|err| VaultError::NetworkError {
                url,
                error: format!("request failed: {err}"),
            })
    }
}
