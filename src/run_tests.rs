//! Tests for the run module.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use restwire::config::Cli;
use restwire::pipeline::{Body, HttpError, HttpResponse};
use tempfile::tempdir;

use super::*;

/// One scripted reply.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

fn reply(code: u16, body: &str) -> Reply {
    Reply {
        status: StatusCode::from_u16(code).unwrap(),
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}

impl Reply {
    fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }
}

/// Transport double that plays scripted replies and then times out.
#[derive(Clone, Default)]
struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedClient {
    fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for ScriptedClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(req);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(HttpError::Timeout)?;
        Ok(HttpResponse::new(
            reply.status,
            reply.headers,
            Some(Body::from_bytes(reply.body)),
        ))
    }
}

fn config(args: &[&str]) -> ValidatedConfig {
    let mut full_args = vec!["restwire", "https://example.com/jobs"];
    full_args.extend(args);
    ValidatedConfig::from_raw(&Cli::parse_from_iter(full_args), None).unwrap()
}

async fn run(args: &[&str], client: &ScriptedClient) -> Result<String, RunError> {
    perform(&config(args), client.clone(), CancellationToken::new()).await
}

const SERVICE_ERROR: &str =
    r#"{"error": {"code": "ResourceNotFound", "message": "The job does not exist."}}"#;

mod request_building {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn success_returns_body() {
        let client = ScriptedClient::new([reply(200, r#"{"id": 1}"#)]);

        let body = run(&[], &client).await.unwrap();

        assert_eq!(body, r#"{"id": 1}"#);
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].url_str(), "https://example.com/jobs");
        assert!(requests[0].headers.contains_key(http::header::USER_AGENT));
        assert!(!requests[0].headers.contains_key(http::header::AUTHORIZATION));
    }

    #[tokio::test(start_paused = true)]
    async fn method_headers_and_body_are_sent() {
        let client = ScriptedClient::new([reply(201, "created")]);

        run(
            &["-X", "PUT", "-H", "X-Test=1", "-d", "payload", "--bearer", "tok"],
            &client,
        )
        .await
        .unwrap();

        let request = &client.requests()[0];
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.body.as_deref(), Some(b"payload".as_slice()));
        assert_eq!(request.headers["x-test"], "1");
        assert_eq!(request.headers["authorization"], "Bearer tok");
    }

    #[tokio::test(start_paused = true)]
    async fn client_request_id_is_sent() {
        let client = ScriptedClient::new([reply(200, "")]);

        run(&["--client-request-id", "abc-123"], &client)
            .await
            .unwrap();

        let request = &client.requests()[0];
        assert_eq!(request.headers["x-ms-client-request-id"], "abc-123");
        assert_eq!(request.headers["x-ms-return-client-request-id"], "true");
    }

    #[tokio::test(start_paused = true)]
    async fn token_file_authorizes_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token": "file-token", "expires_on": "4102444800"}"#,
        )
        .unwrap();
        let client = ScriptedClient::new([reply(200, "")]);

        run(&["--token-file", path.to_str().unwrap()], &client)
            .await
            .unwrap();

        assert_eq!(
            client.requests()[0].headers["authorization"],
            "Bearer file-token"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_token_file_fails_before_sending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let client = ScriptedClient::new([reply(200, "")]);

        let result = run(&["--token-file", path.to_str().unwrap()], &client).await;

        assert!(matches!(result, Err(RunError::Token(_))));
        assert!(client.requests().is_empty());
    }
}

mod retrying {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn transient_status_is_retried() {
        let client = ScriptedClient::new([reply(503, "busy"), reply(200, "ok")]);

        let body = run(&["--retry-delay", "1"], &client).await.unwrap();

        assert_eq!(body, "ok");
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_is_not_retried() {
        let client = ScriptedClient::new([reply(404, "not here"), reply(200, "ok")]);

        let result = run(&[], &client).await;

        assert!(matches!(
            result,
            Err(RunError::UnexpectedStatus { status, ref body })
                if status == StatusCode::NOT_FOUND && body == "not here"
        ));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_decode_service_error() {
        let client = ScriptedClient::new([
            reply(500, SERVICE_ERROR).header("x-ms-request-id", "req-1"),
            reply(500, SERVICE_ERROR).header("x-ms-request-id", "req-2"),
        ]);

        let result = run(&["--retry-max", "2", "--retry-delay", "1"], &client).await;

        let Err(RunError::Respond(error)) = result else {
            panic!("expected a service error");
        };
        let service_error = error.service_error().unwrap();
        assert_eq!(service_error.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(service_error.request_id(), Some("req-2"));
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_exhaust_retries() {
        let client = ScriptedClient::new([]);

        let result = run(&["--retry-max", "2", "--retry-delay", "1"], &client).await;

        assert!(matches!(
            result,
            Err(RunError::Send(SendError::Transport(HttpError::Timeout)))
        ));
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_retry_backoff() {
        let client = ScriptedClient::new([reply(503, "busy"), reply(200, "ok")]);
        let token = CancellationToken::new();
        token.cancel();

        let result = perform(&config(&[]), client.clone(), token).await;

        assert!(matches!(result, Err(RunError::Send(SendError::Cancelled))));
        assert_eq!(client.requests().len(), 1);
    }
}

mod service_errors {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn structured_error_becomes_respond_error() {
        let client = ScriptedClient::new([reply(404, SERVICE_ERROR)]);

        let result = run(&[], &client).await;

        let Err(RunError::Respond(error)) = result else {
            panic!("expected a service error");
        };
        assert!(error.to_string().contains("ResourceNotFound"));
    }

    #[tokio::test(start_paused = true)]
    async fn expected_codes_narrow_success() {
        let client = ScriptedClient::new([reply(204, "")]);

        let result = run(&["--expect", "200"], &client).await;

        assert!(matches!(
            result,
            Err(RunError::UnexpectedStatus { status, .. }) if status == StatusCode::NO_CONTENT
        ));
    }
}

mod polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn accepted_operation_is_polled_to_completion() {
        let client = ScriptedClient::new([
            reply(202, "").header("location", "https://example.com/operations/1"),
            reply(202, "").header("location", "https://example.com/operations/1"),
            reply(200, "done"),
        ]);

        let body = run(&["-X", "POST", "--poll", "--polling-delay", "1"], &client)
            .await
            .unwrap();

        assert_eq!(body, "done");
        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[2].method, Method::GET);
        assert_eq!(requests[2].url_str(), "https://example.com/operations/1");
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_operation_without_polling_returns_body() {
        let client = ScriptedClient::new([
            reply(202, "accepted").header("location", "https://example.com/operations/1"),
        ]);

        let body = run(&[], &client).await.unwrap();

        assert_eq!(body, "accepted");
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_operation_without_location_fails() {
        let client = ScriptedClient::new([reply(202, "")]);

        let result = run(&["--poll"], &client).await;

        assert!(matches!(
            result,
            Err(RunError::Send(SendError::MissingPollingLocation { .. }))
        ));
    }
}

mod run_error {
    use super::*;

    #[test]
    fn unexpected_status_displays_body() {
        let error = RunError::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            body: "not here".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unexpected response status 404 Not Found: not here"
        );
    }

    #[test]
    fn send_error_displays_source() {
        let error = RunError::from(SendError::Cancelled);
        assert_eq!(error.to_string(), "Request failed: Request cancelled");
    }
}
