use crate::core::error::AccessError;
use axum::{
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};

pub async fn fallback_handler(uri: Uri, headers: HeaderMap) -> Response {
    let accepts_html = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));

    if accepts_html {
        return (StatusCode::NOT_FOUND, Html("<h1>Page not found</h1>")).into_response();
    }

    AccessError::NotFound(format!("no route for {}", uri.path())).into_response()
}
