//! Conditional feed fetching on top of a pluggable HTTP transport.
//!
//! The [`FetchClient`] adds three things to a bare transport: If-Modified-Since
//! requests (HEAD first, GET only when the feed changed), bounded redirect
//! following with scheme validation, and classification of every status code
//! into a [`Response`] or a [`FetchError`]. Retries are left to the caller.

mod client;
mod error;
mod redirect;
mod status;
mod transport;
mod types;

pub use self::client::FetchClient;
pub use self::error::{FetchError, ServerErrorKind};
pub use self::redirect::{normalize_path, resolve_location};
pub use self::status::{classify_status, is_redirect, StatusOutcome};
pub use self::transport::{ReqwestTransport, Transport, TransportConfig};
pub use self::types::{
    Method, RawResponse, Request, Response, IF_MODIFIED_SINCE, LOCATION, MAX_REDIRECTS,
};

#[cfg(test)]
pub(crate) use self::transport::testing;
