use std::sync::Arc;
use std::time::Duration;

use cardex_fetch::{HttpClient, RateLimiter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
    HttpClient::new(limiter, 3, Duration::from_millis(1))
}

#[tokio::test]
async fn get_retries_a_429_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client().get(&format!("{}/flaky", server.uri())).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn get_exhausts_retries_at_exactly_max_retries_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/always-down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client()
        .get(&format!("{}/always-down", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, cardex_fetch::FetchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn get_does_not_retry_a_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client().get(&format!("{}/missing", server.uri())).await.unwrap_err();
    assert!(matches!(err, cardex_fetch::FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn post_form_submits_fields_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>page 1</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client()
        .post_form(&format!("{}/search", server.uri()), &[("keyword", "pikachu"), ("cardType", "all")])
        .await
        .unwrap();
    assert_eq!(body, "<html>page 1</html>");
}

#[tokio::test]
async fn get_with_final_url_reports_the_redirected_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/detail/404/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/list/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>list</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (final_url, body) = client().get_with_final_url(&format!("{}/detail/404/", server.uri())).await.unwrap();
    assert!(final_url.ends_with("/list/"));
    assert_eq!(body, "<html>list</html>");
}

#[tokio::test]
async fn get_with_final_url_retries_transient_statuses_before_succeeding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/detail/77/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/detail/77/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>card 77</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (final_url, body) = client()
        .get_with_final_url(&format!("{}/detail/77/", server.uri()))
        .await
        .unwrap();
    assert!(final_url.ends_with("/detail/77/"));
    assert_eq!(body, "<html>card 77</html>");
}
