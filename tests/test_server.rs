//! `POST /solve` behaviour through the warp filter stack


use quizchain::chain::Verdict;
use quizchain::config::AppConfig;
use quizchain::server::{routes, QuizService};
use quizchain::testing::{MockPageFetcher, MockSubmissionClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use test_helpers::{fixed_registry, numbered_pages, page_url, runner};

fn service(fetcher: &MockPageFetcher, submitter: &MockSubmissionClient) -> Arc<QuizService> {
    let env: HashMap<&str, &str> = [
        ("STUDENT_EMAIL", "student@example.com"),
        ("STUDENT_SECRET", "s3cret"),
    ]
    .into_iter()
    .collect();
    let secrets = AppConfig::default()
        .resolve_secrets_with(|name| env.get(name).map(|value| value.to_string()))
        .unwrap();

    let runner = runner(fetcher, submitter, fixed_registry("42"));
    Arc::new(QuizService::new(Arc::new(runner), &secrets))
}

fn solve_body(email: &str, secret: &str, url: &str) -> Value {
    json!({"email": email, "secret": secret, "url": url})
}

#[tokio::test]
async fn test_full_chain_through_entry_point() {
    let fetcher = numbered_pages(3);
    let submitter = MockSubmissionClient::with_verdicts(vec![
        Verdict::correct().with_next_url(page_url(2)),
        Verdict::correct().with_next_url(page_url(3)),
        Verdict::correct(),
    ]);
    let filter = routes(service(&fetcher, &submitter));

    let response = warp::test::request()
        .method("POST")
        .path("/solve")
        .json(&solve_body("student@example.com", "s3cret", &page_url(1)))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body, json!({"status": "success"}));
    assert_eq!(submitter.answers().len(), 3);
}

#[tokio::test]
async fn test_chain_error_is_still_a_200_response() {
    let fetcher = MockPageFetcher::new().with_failure(page_url(1), "net::ERR_NAME_NOT_RESOLVED");
    let submitter = MockSubmissionClient::new();
    let filter = routes(service(&fetcher, &submitter));

    let response = warp::test::request()
        .method("POST")
        .path("/solve")
        .json(&solve_body("student@example.com", "s3cret", &page_url(1)))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Failed to fetch page"));
}

#[tokio::test]
async fn test_wrong_email_is_rejected_before_chain() {
    let fetcher = numbered_pages(1);
    let submitter = MockSubmissionClient::always(Verdict::correct());
    let filter = routes(service(&fetcher, &submitter));

    let response = warp::test::request()
        .method("POST")
        .path("/solve")
        .json(&solve_body("intruder@example.com", "s3cret", &page_url(1)))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 403);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body, json!({"detail": "Invalid email"}));
    assert_eq!(fetcher.fetch_count(), 0);
    assert!(submitter.submissions().is_empty());
}

#[tokio::test]
async fn test_wrong_secret_is_rejected_before_chain() {
    let fetcher = numbered_pages(1);
    let submitter = MockSubmissionClient::always(Verdict::correct());
    let filter = routes(service(&fetcher, &submitter));

    let response = warp::test::request()
        .method("POST")
        .path("/solve")
        .json(&solve_body("student@example.com", "guess", &page_url(1)))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 403);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["detail"], "Invalid secret");
    assert_eq!(fetcher.fetch_count(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let filter = routes(service(&MockPageFetcher::new(), &MockSubmissionClient::new()));
    let padding = "x".repeat(70 * 1024);

    let response = warp::test::request()
        .method("POST")
        .path("/solve")
        .header("content-type", "application/json")
        .body(solve_body("student@example.com", "s3cret", &padding).to_string())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 413);
}

#[tokio::test]
async fn test_get_on_solve_is_not_allowed() {
    let filter = routes(service(&MockPageFetcher::new(), &MockSubmissionClient::new()));

    let response = warp::test::request()
        .method("GET")
        .path("/solve")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_metrics_count_access_denials() {
    let filter = routes(service(&MockPageFetcher::new(), &MockSubmissionClient::new()));

    let before = warp::test::request().path("/metrics").reply(&filter).await;
    let before: Value = serde_json::from_slice(before.body()).unwrap();
    let denials_before = before["chains"]["access_denials"].as_u64().unwrap();

    warp::test::request()
        .method("POST")
        .path("/solve")
        .json(&solve_body("nobody@example.com", "x", &page_url(1)))
        .reply(&filter)
        .await;

    let after = warp::test::request().path("/metrics").reply(&filter).await;
    let after: Value = serde_json::from_slice(after.body()).unwrap();
    assert!(after["chains"]["access_denials"].as_u64().unwrap() > denials_before);
}
