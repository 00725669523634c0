use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{FetchError, ServerErrorKind};
use super::redirect::resolve_location;
use super::status::{classify_status, StatusOutcome};
use super::transport::Transport;
use super::types::{Method, Request, Response, IF_MODIFIED_SINCE, LOCATION, MAX_REDIRECTS};
use crate::clock::{Clock, SystemClock};
use crate::TARGET_WEB_REQUEST;

/// Conditional, redirect-aware feed fetcher.
///
/// Holds no per-call state, so one client can serve concurrent fetches of
/// independent feeds.
pub struct FetchClient<T: Transport> {
    transport: T,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: T, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `url`, skipping the body when the feed is unchanged since `modified_since`.
    ///
    /// With `modified_since` set, a conditional HEAD is sent first and a 304
    /// answer is returned as is. Otherwise a GET follows, carrying the same
    /// `If-Modified-Since` header.
    pub async fn get_response(
        &self,
        url: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Response, FetchError> {
        if let Some(since) = modified_since {
            let head = self.request(Method::Head, url, Some(since)).await?;
            if head.is_not_modified() {
                info!(
                    target: TARGET_WEB_REQUEST,
                    "Feed {} not modified since {}",
                    url,
                    since.to_rfc2822()
                );
                return Ok(head);
            }
            debug!(
                target: TARGET_WEB_REQUEST,
                "HEAD {} returned {}, fetching body",
                url,
                head.status_code()
            );
        }

        self.request(Method::Get, url, modified_since).await
    }

    /// Send `method` to `url`, following up to [`MAX_REDIRECTS`] redirects.
    ///
    /// Each hop is timed on its own; the returned duration is the last hop's.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Response, FetchError> {
        let headers = match modified_since {
            Some(since) => vec![(IF_MODIFIED_SINCE.to_string(), since.to_rfc2822())],
            None => Vec::new(),
        };

        let mut method = method;
        let mut current_url = url.to_string();
        let mut redirect_count: u32 = 0;

        loop {
            let request = Request::new(method, current_url.as_str(), headers.clone());

            let started = self.clock.monotonic();
            let raw = self.transport.send(&request).await.map_err(|err| {
                warn!(target: TARGET_WEB_REQUEST, "{} {} failed: {}", method, current_url, err);
                FetchError::transport(err)
            })?;
            let duration = self.clock.monotonic().saturating_duration_since(started);

            debug!(
                target: TARGET_WEB_REQUEST,
                "{} {} -> {} in {:.3}s (hop {})",
                method,
                current_url,
                raw.status,
                duration.as_secs_f64(),
                redirect_count
            );

            match classify_status(raw.status, method) {
                StatusOutcome::Success => return Ok(Response::from_raw(raw, current_url, duration)),
                StatusOutcome::NotFound => {
                    return Err(FetchError::NotFound {
                        url: current_url,
                        duration,
                    })
                }
                StatusOutcome::ServerError => {
                    warn!(
                        target: TARGET_WEB_REQUEST,
                        "Unexpected status {} from {}",
                        raw.status,
                        current_url
                    );
                    return Err(FetchError::server(
                        ServerErrorKind::UnexpectedStatus(raw.status),
                        Some(raw),
                        duration,
                    ));
                }
                StatusOutcome::Redirect(next_method) => {
                    let location = raw.header(LOCATION).unwrap_or_default();
                    let next_url = match resolve_location(&current_url, location) {
                        Ok(next_url) => next_url,
                        Err(kind) => {
                            warn!(
                                target: TARGET_WEB_REQUEST,
                                "Rejecting redirect from {}: {}",
                                current_url,
                                kind
                            );
                            return Err(FetchError::server(kind, Some(raw), duration));
                        }
                    };

                    redirect_count += 1;
                    if redirect_count > MAX_REDIRECTS {
                        warn!(
                            target: TARGET_WEB_REQUEST,
                            "Too many redirects starting from {}",
                            url
                        );
                        return Err(FetchError::server(
                            ServerErrorKind::TooManyRedirects(MAX_REDIRECTS),
                            Some(raw),
                            duration,
                        ));
                    }

                    debug!(
                        target: TARGET_WEB_REQUEST,
                        "Following {} redirect {} -> {}",
                        raw.status,
                        current_url,
                        next_url
                    );
                    method = next_method;
                    current_url = next_url;
                }
            }
        }
    }
}
