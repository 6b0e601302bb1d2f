use axum::{
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

/// What the server saw of an incoming request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: String,
    pub content_type: Option<String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo_json))
        .route("/echo.xml", any(echo_xml))
        .route("/weather", get(weather))
        .route("/status/{code}", any(status))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn capture(method: Method, query: Option<String>, headers: &HeaderMap, body: String) -> Echo {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let echo = Echo {
        method: method.to_string(),
        query: query.unwrap_or_default(),
        content_type,
        body,
    };
    debug!(method = %echo.method, query = %echo.query, "echo");
    echo
}

async fn echo_json(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    Json(capture(method, query, &headers, body))
}

async fn echo_xml(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let echo = capture(method, query, &headers, body);
    let xml = format!(
        "<echo><method>{}</method><query>{}</query><body>{}</body></echo>",
        escape(&echo.method),
        escape(&echo.query),
        escape(&echo.body),
    );
    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

/// Answers `{"echo": "<raw query string>"}`.
async fn weather(RawQuery(query): RawQuery) -> Json<Value> {
    Json(json!({ "echo": query.unwrap_or_default() }))
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "status": status.as_u16() })))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
