//! `x-request-id` correlation.
//!
//! A caller's id is kept when it is short printable ASCII and replaced with a
//! fresh UUID otherwise. Handlers run inside an `http` span carrying the id,
//! and the response echoes it back.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

const HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_LEN: usize = 128;

fn caller_id(value: &HeaderValue) -> Option<String> {
    let id = value.to_str().ok()?.trim();
    let usable = !id.is_empty() && id.len() <= MAX_LEN && id.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| id.to_string())
}

pub async fn tag_request(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&HEADER)
        .and_then(caller_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let header = HeaderValue::from_str(&id).ok();

    if let Some(value) = header.clone() {
        request.headers_mut().insert(HEADER, value);
    }
    let span = tracing::info_span!(
        "http",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = header {
        response.headers_mut().insert(HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(tag_request))
    }

    async fn echoed(header: Option<&'static str>) -> String {
        let mut request = Request::builder().uri("/");
        if let Some(value) = header {
            request = request.header("x-request-id", value);
        }
        let res = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        res.headers()["x-request-id"].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn caller_id_is_echoed() {
        assert_eq!(echoed(Some(" op-42 ")).await, "op-42");
    }

    #[tokio::test]
    async fn missing_or_unusable_ids_are_replaced() {
        for header in [None, Some("two words"), Some("   ")] {
            let id = echoed(header).await;
            assert!(Uuid::parse_str(&id).is_ok(), "kept {id:?}");
        }
    }

    #[test]
    fn long_ids_are_rejected() {
        let long = "a".repeat(MAX_LEN + 1);
        assert!(caller_id(&HeaderValue::from_str(&long).unwrap()).is_none());
        let fits = "a".repeat(MAX_LEN);
        assert_eq!(caller_id(&HeaderValue::from_str(&fits).unwrap()), Some(fits));
    }
}
