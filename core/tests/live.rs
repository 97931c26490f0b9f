//! End-to-end tests against the mock server over real HTTP.
//!
//! # Design
//! Each test starts its own server on a random port in a background thread
//! with a dedicated tokio runtime, then drives the blocking client from the
//! test thread. Fault scenarios use the raw-TCP peers in `mock_server::faults`.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mock_server::Echo;
use pooled_get::{Client, ClientConfig, ClientError, HeaderEntry};

/// Bind a random port and run `serve` on it in the background.
fn spawn<F, Fut>(serve: F) -> SocketAddr
where
    F: FnOnce(tokio::net::TcpListener) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), std::io::Error>>,
{
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            serve(listener).await
        })
        .unwrap();
    });

    addr
}

fn spawn_app() -> String {
    let addr = spawn(mock_server::run);
    format!("http://{addr}")
}

fn echo(response: &pooled_get::Response) -> Echo {
    serde_json::from_slice(&response.body).unwrap()
}

/// Decode a `Basic` authorization value back to `(username, password)`.
fn decode_basic(value: &str) -> (String, String) {
    let encoded = value.strip_prefix("Basic ").expect("basic scheme");
    let raw = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
    let (user, pass) = raw.split_once(':').unwrap();
    (user.to_string(), pass.to_string())
}

#[test]
fn plain_get_returns_exact_body_and_status() {
    let base = spawn_app();
    let client = Client::new(false);

    let response = client.get(&format!("{base}/bytes/4096")).unwrap();
    assert_eq!(response.status_code, 200);
    assert!(response.status.contains("200"));
    assert_eq!(response.body, mock_server::pattern(4096));
}

#[test]
fn error_statuses_are_returned_as_data() {
    let base = spawn_app();
    let client = Client::new(false);

    let response = client.get(&format!("{base}/status/404")).unwrap();
    assert_eq!(response.status_code, 404);
    assert_eq!(response.status, "404 Not Found");
    assert_eq!(response.text(), "status 404");

    let response = client.get(&format!("{base}/status/503")).unwrap();
    assert_eq!(response.status_code, 503);
    assert!(!response.is_success());
}

#[test]
fn credentials_decode_back_for_every_auth_variant() {
    let base = spawn_app();
    let client = Client::new(false);
    let url = format!("{base}/echo");
    let (user, pass) = ("svc-account", "p@ss:word");

    let responses = [
        client.get_with_credentials(&url, user, pass).unwrap(),
        client.get_with_payload_and_auth(&url, user, pass, b"body").unwrap(),
        client
            .get_with_payload_auth_and_headers(&url, user, pass, b"body", &[HeaderEntry::new("X-A", "1")])
            .unwrap(),
    ];

    for response in &responses {
        let seen = echo(response);
        assert_eq!(seen.header("authorization").len(), 1);
        let (got_user, got_pass) = decode_basic(&seen.header("authorization")[0]);
        assert_eq!(got_user, user);
        assert_eq!(got_pass, pass);
    }
}

#[test]
fn variants_without_credentials_send_no_authorization() {
    let base = spawn_app();
    let client = Client::new(false);
    let url = format!("{base}/echo");

    let plain = echo(&client.get(&url).unwrap());
    assert!(plain.header("authorization").is_empty());

    let with_headers = echo(
        &client
            .get_with_payload_and_headers(&url, b"x", &[HeaderEntry::new("X-A", "1")])
            .unwrap(),
    );
    assert!(with_headers.header("authorization").is_empty());
}

#[test]
fn body_is_sent_with_get_method() {
    let base = spawn_app();
    let client = Client::new(false);

    let response = client
        .get_with_payload_and_headers(&format!("{base}/echo"), b"{\"q\":1}", &[])
        .unwrap();
    let seen = echo(&response);
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.body, "{\"q\":1}");
    assert_eq!(seen.header("content-length"), ["7".to_string()]);
}

#[test]
fn headers_are_applied_last_write_wins() {
    let base = spawn_app();
    let client = Client::new(false);

    let headers = [
        HeaderEntry::new("X-Request-Id", "abc-123"),
        HeaderEntry::new("X-Dup", "first"),
        HeaderEntry::from(("x-dup", "second")),
    ];
    let response = client
        .get_with_payload_auth_and_headers(&format!("{base}/echo"), "u", "p", b"", &headers)
        .unwrap();
    let seen = echo(&response);
    assert_eq!(seen.header("x-request-id"), ["abc-123".to_string()]);
    assert_eq!(seen.header("x-dup"), ["second".to_string()]);
}

#[test]
fn malformed_url_is_a_build_error() {
    let client = Client::new(false);
    let err = client.get("http//missing-colon").unwrap_err();
    assert!(matches!(err, ClientError::RequestBuildError { .. }), "{err:?}");
}

#[test]
fn connection_refused_is_an_execution_error() {
    // Bind then drop to get a port nobody is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = Client::new(false);
    let err = client.get(&format!("http://{addr}/")).unwrap_err();
    assert!(matches!(err, ClientError::RequestExecutionError { .. }), "{err:?}");
}

#[test]
fn silent_server_times_out_as_execution_error() {
    let addr = spawn(|listener| mock_server::faults::run_silent(listener, Duration::from_secs(10)));
    let client = Client::with_config(ClientConfig::default().timeout(Duration::from_millis(300)));

    let err = client.get(&format!("http://{addr}/")).unwrap_err();
    assert!(matches!(err, ClientError::RequestExecutionError { .. }), "{err:?}");
}

#[test]
fn truncated_body_is_a_read_error() {
    let addr = spawn(|listener| mock_server::faults::run_truncated(listener, 100, b"short"));
    let client = Client::new(false);

    let err = client.get(&format!("http://{addr}/")).unwrap_err();
    assert!(matches!(err, ClientError::BodyReadError { .. }), "{err:?}");
}

#[test]
fn sequential_calls_reuse_the_pool() {
    let base = spawn_app();
    let client = Client::with_config(ClientConfig::default().pool_limit(4));
    let url = format!("{base}/bytes/64");

    for _ in 0..200 {
        let response = client.get(&url).unwrap();
        assert_eq!(response.body.len(), 64);
    }
}

#[test]
fn concurrent_callers_get_their_own_bodies() {
    let base = spawn_app();
    let client = Client::new(false);

    std::thread::scope(|scope| {
        for t in 0..16 {
            let client = &client;
            let base = &base;
            scope.spawn(move || {
                for i in 0..25 {
                    let payload = format!("thread-{t}-request-{i}");
                    let response = client
                        .get_with_payload_and_headers(
                            &format!("{base}/echo"),
                            payload.as_bytes(),
                            &[HeaderEntry::new("X-Caller", t.to_string())],
                        )
                        .unwrap();
                    let seen = echo(&response);
                    assert_eq!(seen.body, payload);
                    assert_eq!(seen.header("x-caller"), [t.to_string()]);

                    let len = 1000 + t * 37 + i;
                    let response = client.get(&format!("{base}/bytes/{len}")).unwrap();
                    assert_eq!(response.body, mock_server::pattern(len));
                }
            });
        }
    });
}

/// Run `callers` concurrent GETs of `url` and return the wall time.
fn timed_concurrent_gets(client: &Client, url: &str, callers: usize) -> Duration {
    let started = std::time::Instant::now();
    std::thread::scope(|scope| {
        for _ in 0..callers {
            scope.spawn(|| {
                let response = client.get(url).unwrap();
                assert_eq!(response.text(), "slow");
            });
        }
    });
    started.elapsed()
}

#[test]
fn per_host_cap_queues_requests() {
    let base = spawn_app();
    let url = format!("{base}/slow/300");

    let capped = Client::with_config(ClientConfig::default().pool_limit(1));
    let elapsed = timed_concurrent_gets(&capped, &url, 4);
    assert!(elapsed >= Duration::from_millis(1200), "capped run took {elapsed:?}");

    let wide = Client::with_config(ClientConfig::default().pool_limit(4));
    let elapsed = timed_concurrent_gets(&wide, &url, 4);
    assert!(elapsed < Duration::from_millis(1100), "uncapped run took {elapsed:?}");
}

#[test]
fn self_signed_certificate_requires_skip_flag() {
    let addr = spawn(mock_server::tls::run_self_signed);
    let url = format!("https://127.0.0.1:{}/", addr.port());

    let err = Client::new(false).get(&url).unwrap_err();
    assert!(matches!(err, ClientError::RequestExecutionError { .. }), "{err:?}");

    let response = Client::new(true).get(&url).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, mock_server::tls::SECURE_BODY);
}

#[test]
fn status_uses_canonical_reason_phrase() {
    let addr = spawn(|listener| mock_server::faults::run_reason_phrase(listener, "Everything Fine"));
    let client = Client::new(false);

    let response = client.get(&format!("http://{addr}/")).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.status, "200 OK");
    assert_eq!(response.body, b"ok");
}
