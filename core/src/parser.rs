//! Response body normalization.
//!
//! # Design
//! `parse` never fails. A body that cannot be decoded comes back as
//! `ParsedBody::Error`, carrying one kind from a fixed taxonomy so callers can
//! branch on it, and rendering as the single-key map `{"error": <message>}`
//! when a generic value is wanted.
//!
//! JSON and XML share the same taxonomy: XML is first converted to the same
//! generic value a JSON body decodes into, and both paths report failures
//! through `DecodeError`.

use std::fmt;

use serde_json::{json, Value};
use tracing::debug;

use crate::http::HttpResponse;
use crate::xml::xml_to_value;

/// Deepest nesting accepted by either decoder. Matches serde_json's own
/// recursion limit.
pub const MAX_DEPTH: usize = 128;

/// How a response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Body is returned unchanged.
    #[default]
    None,
    Json,
    Xml,
    /// Chosen from the response `Content-Type` header.
    Auto,
}

impl ResponseFormat {
    /// Lenient token mapping: anything unrecognized is `None`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "json" => ResponseFormat::Json,
            "xml" => ResponseFormat::Xml,
            "auto" => ResponseFormat::Auto,
            _ => ResponseFormat::None,
        }
    }

    pub fn is_known_token(token: &str) -> bool {
        matches!(token, "none" | "json" | "xml" | "auto")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::None => "none",
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
            ResponseFormat::Auto => "auto",
        }
    }

    /// Resolve `Auto` against a response `Content-Type` header value.
    pub fn resolve(self, content_type: Option<&str>) -> Self {
        if self != ResponseFormat::Auto {
            return self;
        }
        let Some(content_type) = content_type.map(str::to_ascii_lowercase) else {
            return ResponseFormat::None;
        };
        if content_type.contains("application/json") {
            ResponseFormat::Json
        } else if content_type.contains("application/xml") || content_type.contains("text/xml") {
            ResponseFormat::Xml
        } else {
            ResponseFormat::None
        }
    }
}

impl From<&str> for ResponseFormat {
    fn from(token: &str) -> Self {
        ResponseFormat::from_token(token)
    }
}

/// Why a body could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    DepthExceeded,
    StateMismatch,
    ControlCharacter,
    Syntax,
    MalformedEncoding,
    Unknown,
}

impl DecodeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeErrorKind::DepthExceeded => "depth-exceeded",
            DecodeErrorKind::StateMismatch => "state-mismatch",
            DecodeErrorKind::ControlCharacter => "control-character",
            DecodeErrorKind::Syntax => "syntax-error",
            DecodeErrorKind::MalformedEncoding => "bad-encoding",
            DecodeErrorKind::Unknown => "unknown",
        }
    }
}

/// A decode failure returned as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    /// `Json` or `Xml`.
    pub format: ResponseFormat,
    /// Decoder's own description, for logs.
    pub detail: String,
}

impl DecodeError {
    /// Fixed message for the kind, the text placed under `"error"`.
    pub fn message(&self) -> &'static str {
        match (self.kind, self.format) {
            (DecodeErrorKind::DepthExceeded, _) => "Maximum stack depth exceeded",
            (DecodeErrorKind::StateMismatch, _) => "Underflow or the modes mismatch",
            (DecodeErrorKind::ControlCharacter, _) => "Unexpected control character found",
            (DecodeErrorKind::Syntax, ResponseFormat::Xml) => "Syntax error, malformed XML",
            (DecodeErrorKind::Syntax, _) => "Syntax error, malformed JSON",
            (DecodeErrorKind::MalformedEncoding, _) => {
                "Malformed UTF-8 characters, possibly incorrectly encoded"
            }
            (DecodeErrorKind::Unknown, ResponseFormat::Xml) => "Unknown error on XML file",
            (DecodeErrorKind::Unknown, _) => "Unknown error on JSON file",
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "error": self.message() })
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.detail)
    }
}

/// Result of normalizing a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// Pass-through body for format `None`.
    Raw(String),
    /// Decoded JSON, or XML converted to the same shape.
    Data(Value),
    Error(DecodeError),
}

impl ParsedBody {
    pub fn is_error(&self) -> bool {
        matches!(self, ParsedBody::Error(_))
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ParsedBody::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ParsedBody::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// Collapse into a generic value: raw bodies become strings and errors
    /// become `{"error": <message>}`.
    pub fn into_value(self) -> Value {
        match self {
            ParsedBody::Raw(body) => Value::String(body),
            ParsedBody::Data(value) => value,
            ParsedBody::Error(err) => err.to_value(),
        }
    }
}

/// Normalize `raw` according to `format`.
///
/// `Auto` has no headers to look at here and passes the body through; use
/// `parse_response` to let it inspect `Content-Type`.
pub fn parse(raw: &str, format: ResponseFormat) -> ParsedBody {
    let decoded = match format {
        ResponseFormat::None | ResponseFormat::Auto => return ParsedBody::Raw(raw.to_string()),
        ResponseFormat::Json => decode_json(raw),
        ResponseFormat::Xml => xml_to_value(raw),
    };

    match decoded {
        Ok(value) => ParsedBody::Data(value),
        Err((kind, detail)) => {
            let err = DecodeError { kind, format, detail };
            debug!(kind = kind.as_str(), detail = %err.detail, "response body failed to decode");
            ParsedBody::Error(err)
        }
    }
}

/// Normalize a body received as bytes.
///
/// Pass-through formats decode lossily. `Json` and `Xml` report a body that
/// is not valid UTF-8 as `MalformedEncoding`.
pub fn parse_bytes(raw: &[u8], format: ResponseFormat) -> ParsedBody {
    match (format, std::str::from_utf8(raw)) {
        (_, Ok(text)) => parse(text, format),
        (ResponseFormat::None | ResponseFormat::Auto, Err(_)) => {
            ParsedBody::Raw(String::from_utf8_lossy(raw).into_owned())
        }
        (_, Err(err)) => {
            let err = DecodeError {
                kind: DecodeErrorKind::MalformedEncoding,
                format,
                detail: err.to_string(),
            };
            debug!(kind = err.kind.as_str(), detail = %err.detail, "response body is not UTF-8");
            ParsedBody::Error(err)
        }
    }
}

/// Normalize a full response, resolving `Auto` from its `Content-Type`.
pub fn parse_response(response: &HttpResponse, format: ResponseFormat) -> ParsedBody {
    let format = format.resolve(response.header("content-type"));
    parse_bytes(&response.body, format)
}

fn decode_json(raw: &str) -> Result<Value, (DecodeErrorKind, String)> {
    serde_json::from_str(raw).map_err(|err| (classify_json_error(raw, &err), err.to_string()))
}

fn classify_json_error(raw: &str, err: &serde_json::Error) -> DecodeErrorKind {
    use serde_json::error::Category;

    let message = err.to_string();
    if message.starts_with("recursion limit exceeded") {
        DecodeErrorKind::DepthExceeded
    } else if message.starts_with("control character") {
        DecodeErrorKind::ControlCharacter
    } else if message.contains("surrogate")
        || message.contains("hex escape")
        || message.starts_with("invalid unicode code point")
    {
        DecodeErrorKind::MalformedEncoding
    } else if message.starts_with("expected `,` or") && closes_wrong_container(raw, err) {
        DecodeErrorKind::StateMismatch
    } else {
        match err.classify() {
            Category::Syntax | Category::Eof => DecodeErrorKind::Syntax,
            Category::Io | Category::Data => DecodeErrorKind::Unknown,
        }
    }
}

/// True when the byte at the error position closes a container other than
/// the one open, as in `[1}`.
fn closes_wrong_container(raw: &str, err: &serde_json::Error) -> bool {
    let Some(line) = err.line().checked_sub(1).and_then(|n| raw.split('\n').nth(n)) else {
        return false;
    };
    let Some(index) = err.column().checked_sub(1) else {
        return false;
    };
    matches!(line.as_bytes().get(index), Some(b'}' | b']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_kind(raw: &str, format: ResponseFormat) -> DecodeErrorKind {
        match parse(raw, format) {
            ParsedBody::Error(err) => err.kind,
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn none_passes_body_through() {
        assert_eq!(parse("42", ResponseFormat::None), ParsedBody::Raw("42".to_string()));
        assert_eq!(parse("<x/>", ResponseFormat::None).as_raw(), Some("<x/>"));
    }

    #[test]
    fn unknown_format_tokens_pass_through() {
        let format = ResponseFormat::from("yaml");
        assert_eq!(format, ResponseFormat::None);
        assert!(!ResponseFormat::is_known_token("yaml"));
        assert_eq!(parse("{", format), ParsedBody::Raw("{".to_string()));
    }

    #[test]
    fn json_decodes_to_value() {
        let parsed = parse(r#"{"echo": "q=London", "n": [1, 2]}"#, ResponseFormat::Json);
        assert_eq!(parsed.as_data().unwrap()["echo"], "q=London");
        assert_eq!(parsed.as_data().unwrap()["n"][1], 2);
    }

    #[test]
    fn scalar_json_is_data() {
        assert_eq!(parse("42", ResponseFormat::Json), ParsedBody::Data(json!(42)));
    }

    #[test]
    fn malformed_json_is_a_syntax_error() {
        let parsed = parse("{not valid json", ResponseFormat::Json);
        let ParsedBody::Error(err) = &parsed else {
            panic!("expected error, got {parsed:?}");
        };
        assert_eq!(err.kind, DecodeErrorKind::Syntax);
        assert_eq!(err.kind.as_str(), "syntax-error");
        assert_eq!(
            parsed.into_value(),
            json!({"error": "Syntax error, malformed JSON"})
        );
    }

    #[test]
    fn empty_and_truncated_json_are_syntax_errors() {
        assert_eq!(error_kind("", ResponseFormat::Json), DecodeErrorKind::Syntax);
        assert_eq!(error_kind(r#"{"a": "#, ResponseFormat::Json), DecodeErrorKind::Syntax);
    }

    #[test]
    fn mismatched_closer_is_a_state_mismatch() {
        assert_eq!(error_kind("[1}", ResponseFormat::Json), DecodeErrorKind::StateMismatch);
        assert_eq!(
            error_kind("{\"j\": 1 ]}", ResponseFormat::Json),
            DecodeErrorKind::StateMismatch
        );
    }

    #[test]
    fn raw_control_character_in_string() {
        assert_eq!(
            error_kind("{\"a\": \"x\u{0001}y\"}", ResponseFormat::Json),
            DecodeErrorKind::ControlCharacter
        );
    }

    #[test]
    fn lone_surrogate_is_bad_encoding() {
        let err = match parse(r#"["\uD800"]"#, ResponseFormat::Json) {
            ParsedBody::Error(err) => err,
            other => panic!("expected error, got {other:?}"),
        };
        assert_eq!(err.kind, DecodeErrorKind::MalformedEncoding);
        assert_eq!(
            err.message(),
            "Malformed UTF-8 characters, possibly incorrectly encoded"
        );
    }

    #[test]
    fn latin1_body_is_bad_encoding_for_decoders() {
        let body = b"{\"city\": \"S\xe3o Paulo\"}";
        for format in [ResponseFormat::Json, ResponseFormat::Xml] {
            let ParsedBody::Error(err) = parse_bytes(body, format) else {
                panic!("expected decode error for {format:?}");
            };
            assert_eq!(err.kind, DecodeErrorKind::MalformedEncoding);
            assert_eq!(err.kind.as_str(), "bad-encoding");
        }
    }

    #[test]
    fn latin1_body_passes_through_lossily() {
        let parsed = parse_bytes(b"S\xe3o Paulo", ResponseFormat::None);
        assert_eq!(parsed.as_raw(), Some("S\u{fffd}o Paulo"));
    }

    #[test]
    fn utf8_bytes_decode_as_text() {
        let parsed = parse_bytes("{\"city\": \"São Paulo\"}".as_bytes(), ResponseFormat::Json);
        assert_eq!(parsed, ParsedBody::Data(json!({"city": "São Paulo"})));
    }

    #[test]
    fn deep_json_exceeds_depth() {
        let depth = MAX_DEPTH + 10;
        let raw = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert_eq!(error_kind(&raw, ResponseFormat::Json), DecodeErrorKind::DepthExceeded);
    }

    #[test]
    fn xml_decodes_through_the_same_channel() {
        let parsed = parse("<r><city>Lisbon</city></r>", ResponseFormat::Xml);
        assert_eq!(parsed, ParsedBody::Data(json!({"city": "Lisbon"})));

        let parsed = parse("<r><city>Lisbon</r>", ResponseFormat::Xml);
        assert_eq!(
            parsed.into_value(),
            json!({"error": "Syntax error, malformed XML"})
        );
    }

    #[test]
    fn auto_follows_response_content_type() {
        let response = HttpResponse {
            status: 200,
            headers: vec![(
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )],
            body: br#"{"ok": true}"#.to_vec(),
        };
        assert_eq!(
            parse_response(&response, ResponseFormat::Auto),
            ParsedBody::Data(json!({"ok": true}))
        );

        let xml = HttpResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: b"<r><ok>1</ok></r>".to_vec(),
        };
        assert_eq!(
            parse_response(&xml, ResponseFormat::Auto),
            ParsedBody::Data(json!({"ok": "1"}))
        );

        let plain = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: b"hello".to_vec(),
        };
        assert_eq!(
            parse_response(&plain, ResponseFormat::Auto),
            ParsedBody::Raw("hello".to_string())
        );
    }

    #[test]
    fn explicit_format_ignores_content_type() {
        let response = HttpResponse {
            status: 500,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: br#"{"error": "boom"}"#.to_vec(),
        };
        assert_eq!(
            parse_response(&response, ResponseFormat::Json),
            ParsedBody::Data(json!({"error": "boom"}))
        );
    }
}
