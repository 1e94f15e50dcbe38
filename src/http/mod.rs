//! Authenticated HTTP request pipeline.
//!
//! A [`RequestDescriptor`] is turned into a URL and headers, its body is
//! transcoded to the wire key convention, the [`Transport`] performs the call
//! and the response is classified by status before anything is decoded.

pub mod client;
pub mod codec;
pub mod request;
pub mod transport;

pub use client::HttpClient;
pub use codec::{JsonCodec, KeyConvention};
pub use request::{HttpMethod, RequestDescriptor, RequestOptions};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse};

use serde::Serialize;

use crate::error::{AuthError, Result};

/// Capture a request body, reporting failures as [`AuthError::Encoding`].
pub fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(AuthError::Encoding)
}
