use crate::cookie::CookieResponder;
use crate::list::list_cookies;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode, Uri},
    routing::get,
    Router,
};
use fixture_runtime::{CorsConfig, FixtureConfig, Headers, Request, ResponseControl};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    responder: Arc<CookieResponder>,
    cors: Arc<CorsConfig>,
}

/// Mounts `cookie.py` and `list.py` under the configured prefix and serves
/// everything else from the document root.
pub fn router(config: &FixtureConfig) -> Router {
    let state = AppState {
        responder: Arc::new(CookieResponder::new(config.cors.clone())),
        cors: Arc::new(config.cors.clone()),
    };
    let mount = config.server.mount.trim_end_matches('/');

    Router::new()
        .route(&format!("{}/cookie.py", mount), get(cookie_handler))
        .route(&format!("{}/list.py", mount), get(list_handler))
        .fallback_service(ServeDir::new(&config.server.docroot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: FixtureConfig, addr: SocketAddr) -> Result<(), ServerError> {
    let app = router(&config);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        %addr,
        docroot = %config.server.docroot.display(),
        mount = %config.server.mount,
        "cookie fixture server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "unable to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn cookie_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body> {
    let req = to_request(&method, &uri, &headers);
    build_response(state.responder.respond(&req))
}

async fn list_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body> {
    let req = to_request(&method, &uri, &headers);
    build_response(list_cookies(&req, &state.cors))
}

fn to_request(method: &Method, uri: &Uri, headers: &HeaderMap) -> Request {
    let headers = Headers::from_pairs(headers.iter().map(|(name, value)| {
        (
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
    }));
    Request::new(
        method.as_str(),
        uri.path(),
        uri.query().unwrap_or(""),
        headers,
    )
}

/// Converts a finished `ResponseControl` into an HTTP response, appending
/// headers in order so repeated `Set-Cookie` lines are all sent.
pub fn build_response(res: ResponseControl) -> Response<Body> {
    let status = StatusCode::from_u16(res.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = Response::new(Body::from(res.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in res.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(&value),
        ) {
            (Ok(header_name), Ok(header_value)) => {
                headers.append(header_name, header_value);
            }
            _ => warn!(header = %name, "dropping header that is not valid HTTP"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Request as HttpRequest};
    use tower::ServiceExt;

    async fn fetch(app: Router, uri: &str, origin: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        let res = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();

        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<&str> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_set_and_drop_over_http() {
        let app = router(&FixtureConfig::default());
        let (status, headers, body) = fetch(
            app,
            "/cookies/resources/cookie.py?drop=%22old%3D1%22&set=%5B%22a%3D1%22%2C%22b%3D2%3B%20Path%3D%2F%22%5D",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"success": true}"#);
        assert_eq!(
            set_cookies(&headers),
            vec!["old=1; max-age=0", "a=1", "b=2; Path=/"]
        );
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_redirect_over_http() {
        let app = router(&FixtureConfig::default());
        let (status, headers, body) =
            fetch(app, "/cookies/resources/cookie.py?location=%2Ftarget", None).await;

        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(headers[header::LOCATION], "/target");
        assert_eq!(body, r#"{"redirect": true}"#);
    }

    #[tokio::test]
    async fn test_malformed_json_over_http() {
        let app = router(&FixtureConfig::default());
        let (status, headers, body) =
            fetch(app, "/cookies/resources/cookie.py?set=%22a%3D1", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_list_echoes_origin() {
        let app = router(&FixtureConfig::default());
        let req = HttpRequest::builder()
            .uri("/cookies/resources/list.py")
            .header(header::ORIGIN, "https://www1.web-platform.test")
            .header(header::COOKIE, "a=1; b=2")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://www1.web-platform.test"
        );
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"a":"1","b":"2"}"#);
    }

    async fn list_with_cookies(cookies: Vec<HeaderValue>) -> String {
        let mut builder = HttpRequest::builder().uri("/cookies/resources/list.py");
        for cookie in cookies {
            builder = builder.header(header::COOKIE, cookie);
        }
        let res = router(&FixtureConfig::default())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_list_keeps_non_ascii_cookie_header() {
        let cookie = HeaderValue::from_bytes("a=1; b=\u{e9}".as_bytes()).unwrap();
        let body = list_with_cookies(vec![cookie]).await;
        assert_eq!(body, "{\"a\":\"1\",\"b\":\"\u{e9}\"}");
    }

    #[tokio::test]
    async fn test_list_joins_cookie_crumbs() {
        let body = list_with_cookies(vec![
            HeaderValue::from_static("z=1"),
            HeaderValue::from_static("a=2"),
        ])
        .await;
        assert_eq!(body, r#"{"z":"1","a":"2"}"#);
    }

    #[tokio::test]
    async fn test_custom_mount() {
        let mut config = FixtureConfig::default();
        config.server.mount = "/fixtures/".to_string();
        let (status, headers, _) = fetch(
            router(&config),
            "/fixtures/cookie.py?set=%22a%3D1%22",
            Some("https://example.test"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(set_cookies(&headers), vec!["a=1"]);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://example.test");
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<p>cookies</p>").unwrap();
        let mut config = FixtureConfig::default();
        config.server.docroot = dir.path().to_path_buf();

        let (status, _, body) = fetch(router(&config), "/page.html", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>cookies</p>");

        let (status, _, _) = fetch(router(&config), "/missing.html", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_build_response_skips_invalid_headers() {
        let mut res = ResponseControl::new();
        res.status_code = 302;
        res.add_header("Set-Cookie", "a=1");
        res.add_header("bad name", "x");
        res.add_header("Set-Cookie", "b=2");

        let response = build_response(res);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(set_cookies(response.headers()), vec!["a=1", "b=2"]);
        assert_eq!(response.headers().len(), 2);
    }
}
