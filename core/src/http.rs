//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! dispatcher builds `HttpRequest` values and parses `HttpResponse` values;
//! a `Transport` implementation (or the caller itself) performs the actual
//! network exchange.
//!
//! All fields use owned types (`String`, `Vec`) so a request can be handed to
//! any transport and kept in the last-call record without lifetime concerns.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DispatchError;

/// Connect timeout applied to every request unless configured otherwise.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `User-Agent` sent unless a default header replaces it.
pub const DEFAULT_USER_AGENT: &str = concat!("apicaller/", env!("CARGO_PKG_VERSION"));

/// Largest response body a transport reads before giving up.
pub const MAX_RESPONSE_BODY: u64 = 64 * 1024 * 1024;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens are matched exactly: `"get"` is rejected.
impl FromStr for HttpMethod {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(DispatchError::InvalidMethod(other.to_string())),
        }
    }
}

/// Content type override for a call whose payload is already serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Xml => "xml",
        }
    }

    /// Value sent in the `Content-Type` request header.
    pub fn header_value(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "text/xml",
        }
    }
}

impl FromStr for ContentType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ContentType::Json),
            "xml" => Ok(ContentType::Xml),
            other => Err(DispatchError::InvalidContentType(other.to_string())),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Dispatcher::prepare`. `url` is absolute and already carries the
/// query string for GET requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub connect_timeout: Duration,
}

impl HttpRequest {
    /// First header matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// The status code is carried for inspection only; the dispatcher hands the
/// body to the parser whatever the status. The body is kept as the bytes
/// the server sent, so an undecodable body still reaches the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, with invalid UTF-8 sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
