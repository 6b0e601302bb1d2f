//! Endpoint configuration, request building and the `call` operation.
//!
//! # Design
//! A `Dispatcher` owns one endpoint: base URL, default method, default
//! response format, default parameters and headers. `call` turns a section
//! and a payload into an `HttpRequest`, hands it to the injected `Transport`,
//! parses whatever comes back and records the exchange in a single
//! last-call slot that the next call overwrites.
//!
//! The work is split the same way for callers that run their own I/O:
//! `prepare` builds the request without touching the network and
//! `complete` takes the transport outcome. `call` is those two steps joined
//! by `Transport::send`.
//!
//! Setters and `call` take `&mut self`, so one instance serves one caller at
//! a time. Sharing an instance across threads means wrapping it in a
//! `Mutex`, which also makes the last-call record consistent.

use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, warn};
use url::Url;

use crate::error::{DispatchError, TransportError};
use crate::http::{
    ContentType, HttpMethod, HttpRequest, HttpResponse, DEFAULT_CONNECT_TIMEOUT, DEFAULT_USER_AGENT,
    FORM_CONTENT_TYPE,
};
use crate::params::{Params, Payload};
use crate::parser::{parse_response, ParsedBody, ResponseFormat};
use crate::transport::Transport;

/// Snapshot of the most recent `call`.
///
/// Every field is `None` until the first call. After a transport failure
/// `url` and `params` describe the attempt while `response` and `data` stay
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastCall {
    pub section: Option<String>,
    /// Effective request URL, including the query string for GET.
    pub url: Option<String>,
    /// Payload actually sent, after default parameters were merged in.
    pub params: Option<Payload>,
    pub response: Option<HttpResponse>,
    pub data: Option<ParsedBody>,
}

impl LastCall {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
    }
}

/// A fully built request waiting for its transport outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub section: String,
    pub request: HttpRequest,
    pub payload: Payload,
    pub response_format: ResponseFormat,
}

/// Calls one HTTP API endpoint and normalizes its responses.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    base_url: Option<String>,
    method: HttpMethod,
    response_format: ResponseFormat,
    default_params: Params,
    default_headers: IndexMap<String, String>,
    connect_timeout: Duration,
    last_call: LastCall,
}

impl<T: Transport> Dispatcher<T> {
    /// An unconfigured dispatcher: no base URL, GET, format `none`, and a
    /// default `User-Agent` header.
    pub fn new(transport: T) -> Self {
        let mut default_headers = IndexMap::new();
        default_headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self {
            transport,
            base_url: None,
            method: HttpMethod::Get,
            response_format: ResponseFormat::None,
            default_params: Params::new(),
            default_headers,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            last_call: LastCall::default(),
        }
    }

    /// Construct and `configure` in one step.
    pub fn with_endpoint(
        transport: T,
        base_url: &str,
        method: &str,
        response_format: &str,
    ) -> Result<Self, DispatchError> {
        let mut dispatcher = Self::new(transport);
        dispatcher.configure(base_url, method, response_format)?;
        Ok(dispatcher)
    }

    /// Set the endpoint. The URL and method are validated; an unrecognized
    /// response format is accepted and behaves as `none`. Nothing changes
    /// when validation fails.
    pub fn configure(
        &mut self,
        base_url: &str,
        method: &str,
        response_format: &str,
    ) -> Result<&mut Self, DispatchError> {
        validate_base_url(base_url)?;
        let method: HttpMethod = method.parse()?;
        self.base_url = Some(base_url.to_string());
        self.method = method;
        self.set_response_format(response_format);
        Ok(self)
    }

    /// Replace the base URL. This is the only path that changes it.
    pub fn set_base_url(&mut self, base_url: &str) -> Result<&mut Self, DispatchError> {
        validate_base_url(base_url)?;
        self.base_url = Some(base_url.to_string());
        Ok(self)
    }

    pub fn set_method(&mut self, method: &str) -> Result<&mut Self, DispatchError> {
        self.method = method.parse()?;
        Ok(self)
    }

    pub fn set_response_format(&mut self, response_format: &str) -> &mut Self {
        if !ResponseFormat::is_known_token(response_format) {
            debug!(format = response_format, "unrecognized response format, passing bodies through");
        }
        self.response_format = ResponseFormat::from_token(response_format);
        self
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = timeout;
        self
    }

    /// Insert or overwrite a parameter merged into every form-encoded call.
    pub fn set_default_parameter(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.default_params.insert(name, value);
        self
    }

    pub fn clear_default_parameters(&mut self) -> &mut Self {
        self.default_params.clear();
        self
    }

    /// Insert or overwrite a header sent with every request.
    pub fn set_default_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn response_format(&self) -> ResponseFormat {
        self.response_format
    }

    pub fn default_parameters(&self) -> &Params {
        &self.default_params
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn last_call(&self) -> &LastCall {
        &self.last_call
    }

    /// Build the request for `section` without sending it.
    ///
    /// Without a content type, `payload` is overlaid with the default
    /// parameters and the defaults win on collision. With one, the payload
    /// is sent as given and defaults are left out.
    pub fn prepare(
        &self,
        section: &str,
        payload: impl Into<Payload>,
        content_type: Option<&str>,
    ) -> Result<PreparedCall, DispatchError> {
        let base_url = self.base_url.as_deref().ok_or(DispatchError::MissingUrl)?;
        let content_type = content_type.map(str::parse::<ContentType>).transpose()?;

        let payload: Payload = payload.into();
        let payload = match (payload, content_type) {
            (Payload::Form(params), None) => Payload::Form(params.overlaid_with(&self.default_params)),
            (payload, _) => payload,
        };

        let request = self.build_request(format!("{base_url}{section}"), &payload, content_type);
        Ok(PreparedCall {
            section: section.to_string(),
            request,
            payload,
            response_format: self.response_format,
        })
    }

    /// Record the outcome of a prepared call and parse its body.
    ///
    /// Returns `None` when the transport failed; the last-call record still
    /// holds the attempted URL and payload.
    pub fn complete(
        &mut self,
        prepared: PreparedCall,
        outcome: Result<HttpResponse, TransportError>,
    ) -> Option<ParsedBody> {
        let PreparedCall {
            section,
            request,
            payload,
            response_format,
        } = prepared;

        self.last_call = LastCall {
            section: Some(section),
            url: Some(request.url),
            params: Some(payload),
            response: None,
            data: None,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    url = self.last_call.url.as_deref().unwrap_or_default(),
                    error = %err,
                    "transport failed, call yields no result"
                );
                return None;
            }
        };

        let data = parse_response(&response, response_format);
        self.last_call.response = Some(response);
        self.last_call.data = Some(data.clone());
        Some(data)
    }

    /// Send a request to `base_url + section` and parse the response.
    ///
    /// Raises only for a missing base URL or an unsupported content type.
    /// A transport failure yields `Ok(None)`. Decode failures arrive as
    /// `ParsedBody::Error`.
    pub fn call(
        &mut self,
        section: &str,
        payload: impl Into<Payload>,
        content_type: Option<&str>,
    ) -> Result<Option<ParsedBody>, DispatchError> {
        let prepared = self.prepare(section, payload, content_type)?;
        debug!(
            method = %prepared.request.method,
            url = %prepared.request.url,
            "dispatching call"
        );
        let outcome = self.transport.send(&prepared.request);
        Ok(self.complete(prepared, outcome))
    }

    fn build_request(
        &self,
        target: String,
        payload: &Payload,
        content_type: Option<ContentType>,
    ) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let (url, body) = match (self.method, payload, content_type) {
            (HttpMethod::Get, payload, _) => (append_query(target, &payload.encode()), None),
            (_, Payload::Raw(body), Some(content_type)) => {
                set_content_type(&mut headers, content_type.header_value());
                (target, Some(body.clone()))
            }
            (_, payload, _) => {
                set_content_type(&mut headers, FORM_CONTENT_TYPE);
                (target, Some(payload.encode()))
            }
        };

        HttpRequest {
            method: self.method,
            url,
            headers,
            body,
            connect_timeout: self.connect_timeout,
        }
    }
}

/// A base URL must parse as an absolute URL and name a host.
pub(crate) fn validate_base_url(raw: &str) -> Result<(), DispatchError> {
    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(DispatchError::InvalidUrl(raw.to_string())),
    }
}

pub(crate) fn append_query(mut url: String, query: &str) -> String {
    if query.is_empty() {
        return url;
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(query);
    url
}

fn set_content_type(headers: &mut Vec<(String, String)>, value: &str) {
    headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
    headers.push(("Content-Type".to_string(), value.to_string()));
}
