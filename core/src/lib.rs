//! Small helper for building HTTP API wrappers.
//!
//! # Overview
//! A `Dispatcher` is configured once with a base URL, a default method, a
//! response format and default parameters. Each `call` appends a section to
//! the base URL, merges parameters, encodes them for the method, sends the
//! request through a `Transport` and normalizes the response body into a
//! `ParsedBody`.
//!
//! # Design
//! - Configuration errors are raised; transport failures are swallowed and
//!   turn into `Ok(None)`; decode failures are data (`ParsedBody::Error`).
//! - Default parameters win over call-site parameters on key collision.
//! - The transport is injected, so tests run against in-memory stubs and
//!   callers that own their I/O can use `prepare` / `complete` directly.
//! - `quick` offers one-shot requests for callers without an endpoint.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod params;
pub mod parser;
pub mod quick;
pub mod transport;
mod xml;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, LastCall, PreparedCall};
pub use error::{DispatchError, TransportError};
pub use http::{ContentType, HttpMethod, HttpRequest, HttpResponse, DEFAULT_USER_AGENT};
pub use params::{Params, Payload};
pub use parser::{parse, parse_bytes, parse_response, DecodeError, DecodeErrorKind, ParsedBody, ResponseFormat};
pub use quick::QuickOptions;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
