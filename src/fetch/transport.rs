//! The transport seam: one HTTP exchange, no redirect handling.

use reqwest::{cookie::Jar, header};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::types::{Method, RawResponse, Request};
use crate::TARGET_WEB_REQUEST;

const FEED_ACCEPT: &str = concat!(
    "application/feed+json, application/json, application/rss+xml, ",
    "application/atom+xml, application/xml, text/xml, */*;q=0.9"
);

/// Performs exactly one request and reports whatever the server answered.
///
/// Implementations must not follow redirects themselves; the
/// [`FetchClient`](super::FetchClient) resolves and validates every hop.
/// Timeouts, DNS, TLS and connection failures are reported as `Self::Error`.
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, Self::Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("feedwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        debug!(
            target: TARGET_WEB_REQUEST,
            "Creating HTTP transport with timeout {:?}",
            config.timeout
        );

        let cookie_store = Jar::default();
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .cookie_provider(Arc::new(cookie_store))
            .gzip(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

impl Transport for ReqwestTransport {
    type Error = reqwest::Error;

    async fn send(&self, request: &Request) -> Result<RawResponse, Self::Error> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str())
            .header(header::ACCEPT, FEED_ACCEPT);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(
            target: TARGET_WEB_REQUEST,
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(RawResponse { status, headers, body })
    }
}
