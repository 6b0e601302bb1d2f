//! One-shot requests without a configured dispatcher.
//!
//! Each function validates the URL, sends one request through the given
//! transport and parses the body. Optional inputs travel in `QuickOptions`
//! rather than being inferred from argument positions.

use tracing::warn;

use crate::dispatcher::{append_query, validate_base_url};
use crate::error::DispatchError;
use crate::http::{
    HttpMethod, HttpRequest, DEFAULT_CONNECT_TIMEOUT, DEFAULT_USER_AGENT, FORM_CONTENT_TYPE,
};
use crate::params::Params;
use crate::parser::{parse_response, ParsedBody, ResponseFormat};
use crate::transport::Transport;

type Callback<'a> = Box<dyn FnOnce(ParsedBody) -> ParsedBody + 'a>;

#[derive(Default)]
pub struct QuickOptions<'a> {
    pub params: Option<Params>,
    pub response_format: ResponseFormat,
    /// Applied to the parsed body before it is returned.
    pub callback: Option<Callback<'a>>,
}

impl<'a> QuickOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn callback(mut self, callback: impl FnOnce(ParsedBody) -> ParsedBody + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

pub fn get<T: Transport>(
    transport: &T,
    url: &str,
    options: QuickOptions<'_>,
) -> Result<Option<ParsedBody>, DispatchError> {
    request(transport, HttpMethod::Get, url, options)
}

pub fn post<T: Transport>(
    transport: &T,
    url: &str,
    options: QuickOptions<'_>,
) -> Result<Option<ParsedBody>, DispatchError> {
    request(transport, HttpMethod::Post, url, options)
}

pub fn put<T: Transport>(
    transport: &T,
    url: &str,
    options: QuickOptions<'_>,
) -> Result<Option<ParsedBody>, DispatchError> {
    request(transport, HttpMethod::Put, url, options)
}

pub fn delete<T: Transport>(
    transport: &T,
    url: &str,
    options: QuickOptions<'_>,
) -> Result<Option<ParsedBody>, DispatchError> {
    request(transport, HttpMethod::Delete, url, options)
}

/// GET carries the params in the query string; other methods send them
/// form-encoded in the body.
pub fn request<T: Transport>(
    transport: &T,
    method: HttpMethod,
    url: &str,
    options: QuickOptions<'_>,
) -> Result<Option<ParsedBody>, DispatchError> {
    validate_base_url(url)?;

    let QuickOptions {
        params,
        response_format,
        callback,
    } = options;
    let encoded = params.map(|p| p.to_form_string()).unwrap_or_default();

    let mut headers = vec![("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())];
    let (url, body) = match method {
        HttpMethod::Get => (append_query(url.to_string(), &encoded), None),
        _ => {
            headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
            (url.to_string(), Some(encoded))
        }
    };
    let request = HttpRequest {
        method,
        url,
        headers,
        body,
        connect_timeout: DEFAULT_CONNECT_TIMEOUT,
    };

    let response = match transport.send(&request) {
        Ok(response) => response,
        Err(err) => {
            warn!(url = %request.url, error = %err, "transport failed, request yields no result");
            return Ok(None);
        }
    };

    let parsed = parse_response(&response, response_format);
    Ok(Some(match callback {
        Some(callback) => callback(parsed),
        None => parsed,
    }))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpResponse;

    struct Echo {
        seen: RefCell<Option<HttpRequest>>,
    }

    impl Transport for Echo {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            *self.seen.borrow_mut() = Some(request.clone());
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: json!({ "url": request.url, "body": request.body }).to_string().into_bytes(),
            })
        }
    }

    fn echo() -> Echo {
        Echo {
            seen: RefCell::new(None),
        }
    }

    #[test]
    fn get_appends_params_and_parses() {
        let transport = echo();
        let parsed = get(
            &transport,
            "http://www.geoplugin.net/json.gp",
            QuickOptions::new()
                .params(Params::new().with("ip", "8.8.8.8"))
                .response_format(ResponseFormat::Json),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            parsed.as_data().unwrap()["url"],
            "http://www.geoplugin.net/json.gp?ip=8.8.8.8"
        );
    }

    #[test]
    fn default_options_return_raw_body() {
        let transport = echo();
        let parsed = get(&transport, "http://localhost/x", QuickOptions::new()).unwrap().unwrap();
        assert!(parsed.as_raw().unwrap().contains("http://localhost/x"));
    }

    #[test]
    fn callback_transforms_result() {
        let transport = echo();
        let parsed = post(
            &transport,
            "http://localhost/items",
            QuickOptions::new()
                .params(Params::new().with("name", "a b"))
                .response_format(ResponseFormat::Json)
                .callback(|body| ParsedBody::Data(body.into_value()["body"].clone())),
        )
        .unwrap()
        .unwrap();

        assert_eq!(parsed, ParsedBody::Data(json!("name=a+b")));
        let seen = transport.seen.borrow().clone().unwrap();
        assert_eq!(seen.method, HttpMethod::Post);
        assert_eq!(seen.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(seen.header("user-agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn invalid_url_is_rejected_before_sending() {
        let transport = echo();
        let err = delete(&transport, "localhost/items", QuickOptions::new()).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidUrl(_)));
        assert!(transport.seen.borrow().is_none());
    }

    #[test]
    fn transport_failure_is_none() {
        struct Down;
        impl Transport for Down {
            fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
                Err(TransportError::Timeout("connect".to_string()))
            }
        }
        assert_eq!(put(&Down, "http://localhost/", QuickOptions::new()).unwrap(), None);
    }
}
