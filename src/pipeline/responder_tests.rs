//! Tests for the respond stage.

use std::sync::{Arc, Mutex};

use http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::responder::*;
use super::{HttpResponse, RespondError};
use crate::test_fixtures::tracked_response;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Job {
    name: String,
    done: bool,
}

fn job_response(status: StatusCode) -> (HttpResponse, Arc<crate::test_fixtures::BodyTracker>) {
    tracked_response(status, HeaderMap::new(), r#"{"name":"build","done":true}"#)
}

mod composition {
    use super::*;

    fn recording<'a>(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> RespondDecorator<'a> {
        let log = Arc::clone(log);
        RespondDecorator::new(move |next| {
            responder(move |response| {
                log.lock().unwrap().push(format!("{name}:before"));
                let result = next.respond(response);
                log.lock().unwrap().push(format!("{name}:after"));
                result
            })
        })
    }

    #[test]
    fn empty_chain_succeeds() {
        let (mut response, tracker) = job_response(StatusCode::OK);
        respond(&mut response, Vec::<RespondDecorator<'_>>::new()).unwrap();
        assert_eq!(tracker.closes(), 0);
    }

    #[test]
    fn first_decorator_is_outermost() {
        let (mut response, _) = job_response(StatusCode::OK);
        let log = Arc::new(Mutex::new(Vec::new()));

        respond(&mut response, [recording("a", &log), recording("b", &log)]).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:before", "b:before", "b:after", "a:after"]
        );
    }

    #[test]
    fn by_ignoring_delegates() {
        let (mut response, tracker) = job_response(StatusCode::OK);
        respond(&mut response, [by_ignoring()]).unwrap();
        assert!(response.body_is_open());
        assert_eq!(tracker.closes(), 0);
    }
}

mod closing {
    use super::*;

    #[test]
    fn by_closing_closes_after_decoding() {
        let (mut response, tracker) = job_response(StatusCode::OK);
        let mut job = Job::default();

        respond(
            &mut response,
            [by_closing(), by_unmarshalling_json(&mut job)],
        )
        .unwrap();

        assert_eq!(
            job,
            Job {
                name: "build".to_string(),
                done: true
            }
        );
        assert_eq!(tracker.closes(), 1);
        assert!(!response.body_is_open());
    }

    #[test]
    fn by_closing_keeps_inner_error() {
        let (mut response, tracker) =
            tracked_response(StatusCode::OK, HeaderMap::new(), "not json");
        let mut job = Job::default();

        let result = respond(
            &mut response,
            [by_closing(), by_unmarshalling_json(&mut job)],
        );

        assert!(matches!(result, Err(RespondError::Decode(_))));
        assert_eq!(tracker.closes(), 1);
    }

    #[test]
    fn closing_twice_closes_once() {
        let (mut response, tracker) = job_response(StatusCode::OK);

        respond(&mut response, [by_closing(), by_closing()]).unwrap();
        drop(response);

        assert_eq!(tracker.closes(), 1);
    }

    #[test]
    fn decoding_step_runs_before_inner_close() {
        let (mut response, _) = job_response(StatusCode::OK);
        let mut job = Job::default();

        let result = respond(
            &mut response,
            [by_unmarshalling_json(&mut job), by_closing()],
        );

        // Steps act on the way in, so decoding sees the body before the close
        assert!(result.is_ok());
        assert!(job.done);
    }

    #[test]
    fn missing_body_is_fine() {
        let mut response = HttpResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), None);
        respond(&mut response, [by_closing()]).unwrap();
    }
}

mod status_checks {
    use super::*;

    #[test]
    fn accepted_status_delegates() {
        let (mut response, _) = job_response(StatusCode::CREATED);
        let mut job = Job::default();

        respond(
            &mut response,
            [
                with_status_code_check([StatusCode::OK, StatusCode::CREATED]),
                by_unmarshalling_json(&mut job),
            ],
        )
        .unwrap();

        assert_eq!(job.name, "build");
    }

    #[test]
    fn unexpected_status_stops_the_chain() {
        let (mut response, tracker) = job_response(StatusCode::CONFLICT);
        let mut job = Job::default();

        let result = respond(
            &mut response,
            [
                by_closing(),
                with_status_code_check([StatusCode::OK]),
                by_unmarshalling_json(&mut job),
            ],
        );

        assert!(matches!(
            result,
            Err(RespondError::UnexpectedStatus(status)) if status == StatusCode::CONFLICT
        ));
        assert_eq!(job, Job::default());
        assert_eq!(tracker.closes(), 1);
    }
}
