//! Tests for HTTP request/response types and the reqwest transport.

use super::{Body, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestClient};

mod http_request {
    use super::*;

    #[test]
    fn new_creates_request_with_method_and_url() {
        let url = url::Url::parse("https://example.com/api").unwrap();
        let req = HttpRequest::new(http::Method::PUT, url.clone());

        assert_eq!(req.method, http::Method::PUT);
        assert_eq!(req.url, Some(url));
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
        assert!(req.cancellation.is_none());
    }

    #[test]
    fn default_request_has_no_url() {
        let req = HttpRequest::default();

        assert_eq!(req.method, http::Method::GET);
        assert!(req.url.is_none());
        assert_eq!(req.url_str(), "<no url>");
    }

    #[test]
    fn with_header_appends_multiple_values_for_same_name() {
        let url = url::Url::parse("https://example.com/").unwrap();
        let req = HttpRequest::get(url)
            .with_header(
                http::header::ACCEPT,
                http::HeaderValue::from_static("text/html"),
            )
            .with_header(
                http::header::ACCEPT,
                http::HeaderValue::from_static("application/json"),
            );

        assert_eq!(req.headers.get_all(http::header::ACCEPT).iter().count(), 2);
    }

    #[test]
    fn clone_shares_cancellation() {
        let url = url::Url::parse("https://example.com/").unwrap();
        let token = tokio_util::sync::CancellationToken::new();
        let req1 = HttpRequest::post(url)
            .with_body(b"original".to_vec())
            .with_cancellation(token.clone());
        let req2 = req1.clone();

        token.cancel();

        assert_eq!(req1.body, req2.body);
        assert!(req2.cancellation.unwrap().is_cancelled());
    }
}

mod http_response {
    use super::*;

    #[test]
    fn is_success_returns_true_only_for_2xx() {
        for status in [http::StatusCode::OK, http::StatusCode::ACCEPTED] {
            assert!(HttpResponse::with_content(status, "").is_success());
        }
        for status in [http::StatusCode::NOT_FOUND, http::StatusCode::BAD_GATEWAY] {
            assert!(!HttpResponse::with_content(status, "").is_success());
        }
    }

    #[test]
    fn status_text_includes_reason() {
        let resp = HttpResponse::with_content(http::StatusCode::ACCEPTED, "");
        assert_eq!(resp.status_text(), "202 Accepted");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-ms-request-id", http::HeaderValue::from_static("abc"));
        let resp = HttpResponse::new(http::StatusCode::OK, headers, None);

        assert_eq!(resp.header("X-MS-Request-Id"), Some("abc"));
        assert_eq!(resp.header("missing"), None);
    }

    #[test]
    fn buffer_body_keeps_content_readable() {
        let mut resp = HttpResponse::with_content(http::StatusCode::OK, "payload");

        assert_eq!(resp.buffer_body().unwrap(), b"payload");
        resp.close_body();

        let body = resp.body.as_mut().unwrap().read_to_string().unwrap();
        assert_eq!(body, "payload");
    }

    #[test]
    fn buffer_body_without_body_is_empty() {
        let mut resp = HttpResponse::new(http::StatusCode::NO_CONTENT, http::HeaderMap::new(), None);
        assert!(resp.buffer_body().unwrap().is_empty());
        assert!(!resp.body_is_open());
    }

    #[test]
    fn closed_body_rejects_reads() {
        let mut resp = HttpResponse::new(
            http::StatusCode::OK,
            http::HeaderMap::new(),
            Some(Body::from_bytes("gone")),
        );

        resp.close_body();

        assert!(!resp.body_is_open());
        assert!(resp.body.as_mut().unwrap().read_to_end().is_err());
    }

    #[test]
    fn debug_format_is_readable() {
        let resp = HttpResponse::with_content(http::StatusCode::OK, "");
        let debug = format!("{resp:?}");

        assert!(debug.contains("HttpResponse"));
        assert!(debug.contains("200"));
    }
}

mod http_error {
    use super::*;
    use std::error::Error;

    #[test]
    fn connection_error_preserves_source() {
        let source = std::io::Error::other("network unavailable");
        let error = HttpError::Connection(Box::new(source));

        assert!(error.to_string().contains("Connection error"));
        assert!(
            error
                .source()
                .unwrap()
                .to_string()
                .contains("network unavailable")
        );
    }

    #[test]
    fn timeout_displays_message() {
        let error = HttpError::Timeout;
        assert_eq!(error.to_string(), "Request timed out");
        assert!(error.source().is_none());
    }

    #[test]
    fn invalid_url_displays_message() {
        let error = HttpError::InvalidUrl("missing scheme".to_string());

        assert!(error.to_string().contains("Invalid URL"));
        assert!(error.to_string().contains("missing scheme"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpError>();
    }
}

mod reqwest_client {
    use super::*;

    #[tokio::test]
    async fn request_without_url_is_rejected_before_sending() {
        let client = ReqwestClient::new();

        let result = client.request(HttpRequest::default()).await;

        assert!(matches!(result, Err(HttpError::InvalidUrl(msg)) if msg.contains("no URL")));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connection_error() {
        let client = ReqwestClient::default();
        // Port 9 on localhost is the discard service and normally closed
        let url = url::Url::parse("http://127.0.0.1:9/").unwrap();

        let result = client.request(HttpRequest::get(url)).await;

        assert!(matches!(
            result,
            Err(HttpError::Connection(_) | HttpError::Timeout)
        ));
    }

    #[test]
    fn clients_are_send_sync() {
        fn assert_client<T: HttpClient + Clone>() {}
        assert_client::<ReqwestClient>();
    }
}
