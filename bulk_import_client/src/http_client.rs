use std::time::Instant;

use futures::TryStreamExt;
use http::header::CONTENT_LENGTH;
use reqwest::header::HeaderValue;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::interface::{
    RequestBody, ResponseBody, Transport, TransportError, TransportRequest, TransportResponse, TransportResult,
};

/// Request extension naming the API operation, picked up by [`RequestLogger`].
#[derive(Debug, Clone, Copy)]
pub struct Api(pub &'static str);

/// builds the client to talk to the bulk import API.
pub fn build_http_client(config: &ClientConfig) -> std::result::Result<ClientWithMiddleware, reqwest::Error> {
    let reqwest_client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .build()?;
    Ok(ClientBuilder::new(reqwest_client).with(RequestLogger).build())
}

/// Logs method, path, outcome and latency of every request.
pub struct RequestLogger;

#[async_trait::async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let api = extensions.get::<Api>().map(|a| a.0).unwrap_or("unknown");
        let method = req.method().clone();
        let path = req.url().path().to_owned();
        let start = Instant::now();

        let res = next.run(req, extensions).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &res {
            Ok(response) => debug!(api, %method, %path, status = response.status().as_u16(), elapsed_ms, "request done"),
            Err(e) => info!(api, %method, %path, elapsed_ms, error = %e, "request failed"),
        }
        res
    }
}

/// [`Transport`] over HTTPS. Does not retry.
pub struct HttpTransport {
    base_url: String,
    client: ClientWithMiddleware,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let client = build_http_client(config).map_err(TransportError::new)?;
        Ok(Self::from_client(config.base_url(), client))
    }

    /// Uses a preconfigured client; `base_url` must not end in `/`.
    pub fn from_client(base_url: impl Into<String>, client: ClientWithMiddleware) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> TransportResult<TransportResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .with_extension(Api(request.operation));
        let builder = match request.body {
            RequestBody::Binary { data, .. } => builder.body(data),
            RequestBody::Empty => builder.header(CONTENT_LENGTH, HeaderValue::from_static("0")),
        };

        let response = builder.send().await.map_err(TransportError::new)?;
        let status = response.status();
        let body = response.bytes_stream().map_err(TransportError::new);

        Ok(TransportResponse {
            status: status.as_u16(),
            status_message: status.canonical_reason().unwrap_or_default().to_owned(),
            body: ResponseBody::from_stream(body),
        })
    }
}
