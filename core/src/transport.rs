//! The network boundary.
//!
//! `Transport` is the only place a call suspends on I/O. The dispatcher
//! never inspects the status code: any exchange that produced a response is
//! a success, and only connection-level trouble is a `TransportError`.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one request description against the network.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse, MAX_RESPONSE_BODY};

    /// Blocking transport backed by ureq.
    ///
    /// A fresh agent is built per request so the request's connect timeout
    /// applies. The read timeout is left at ureq's default. Status codes are
    /// not treated as errors, so 4xx/5xx bodies come back as data. Bodies are
    /// read as bytes up to `MAX_RESPONSE_BODY`; decoding is the parser's job.
    #[derive(Debug, Clone, Default)]
    pub struct UreqTransport;

    impl UreqTransport {
        pub fn new() -> Self {
            Self
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_connect(Some(req.connect_timeout))
                .build()
                .new_agent();

            let result = match (req.method, req.body.as_deref()) {
                (HttpMethod::Get, _) => {
                    let mut builder = agent.get(&req.url);
                    for (name, value) in &req.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    builder.call()
                }
                (HttpMethod::Delete, body) => {
                    let mut builder = agent.delete(&req.url).force_send_body();
                    for (name, value) in &req.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    builder.send(body.unwrap_or_default().as_bytes())
                }
                (method, body) => {
                    let mut builder = if method == HttpMethod::Put {
                        agent.put(&req.url)
                    } else {
                        agent.post(&req.url)
                    };
                    for (name, value) in &req.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    match body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
            };

            let mut response = result.map_err(map_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();
            let body = response
                .body_mut()
                .with_config()
                .limit(MAX_RESPONSE_BODY)
                .read_to_vec()
                .map_err(|err| TransportError::Body(err.to_string()))?;

            Ok(HttpResponse { status, headers, body })
        }
    }

    fn map_error(err: ureq::Error) -> TransportError {
        if matches!(err, ureq::Error::Timeout(_)) {
            TransportError::Timeout(err.to_string())
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}
