//! End-to-end relay tests against local upstreams.

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::Request, http::StatusCode, response::IntoResponse, Router};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use path_proxy::ProxyConfig;
use tokio::sync::{mpsc, oneshot, Mutex};

mod common;

#[tokio::test]
async fn test_collapsed_scheme_and_query_reach_upstream() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!("http:/{}/foo?x=1", upstream)))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-method"], "GET");
    assert_eq!(res.headers()["x-echo-uri"], "/foo?x=1");
    assert_eq!(
        res.headers()["x-echo-host"].to_str().unwrap(),
        upstream.to_string(),
        "Host must be recomputed for the upstream authority"
    );
}

#[tokio::test]
async fn test_full_scheme_separator_also_accepted() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!("http://{}/bar", upstream)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-uri"], "/bar");
}

#[tokio::test]
async fn test_method_override_forwards_body_unchanged() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .post(proxy.url(&format!("http:/{}/bar", upstream)))
        .header("X-METHOD", "DELETE")
        .body("payload bytes")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-method"], "DELETE");
    assert!(!res.headers().contains_key("x-method"));
    assert_eq!(res.text().await.unwrap(), "payload bytes");
}

#[tokio::test]
async fn test_method_template_in_path() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!("http:/{}/api/%7Bmethod%7D/%7BMETHOD%7D", upstream)))
        .header("X-METHOD", "patch")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-echo-method"], "PATCH");
    assert_eq!(res.headers()["x-echo-uri"], "/api/patch/PATCH");
}

#[tokio::test]
async fn test_percent_encoded_query_is_decoded() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!(
            "http:/{}/search?next=https%3A%2F%2Fother.test%2Fx&q=a%20b",
            upstream
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(
        res.headers()["x-echo-uri"],
        "/search?next=https://other.test/x&q=a%20b"
    );
}

#[tokio::test]
async fn test_cookie_and_directives_are_not_forwarded() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!("http:/{}/headers", upstream)))
        .header("Cookie", "session=secret")
        .header("X-METHOD", "GET")
        .header("X-CONNECT-TIMEOUT-MILLIS", "2000")
        .header("X-READ-TIMEOUT-MILLIS", "2000")
        .header("X-Custom", "one")
        .header("X-Custom", "two")
        .header("Accept", "application/json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert!(!headers.contains_key("cookie"));
    assert!(!headers.contains_key("x-method"));
    assert!(!headers.contains_key("x-connect-timeout-millis"));
    assert!(!headers.contains_key("x-read-timeout-millis"));

    let custom: Vec<_> = headers.get_all("x-custom").iter().collect();
    assert_eq!(custom, ["one", "two"]);
    assert_eq!(headers["accept"], "application/json");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_status_and_repeated_headers_relayed_verbatim() {
    let upstream = common::start_upstream(Router::new().fallback(|| async {
        (
            StatusCode::IM_A_TEAPOT,
            [("set-cookie", "a=1"), ("set-cookie", "b=2"), ("x-upstream", "yes")],
            "short and stout",
        )
    }))
    .await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let res = common::client()
        .get(proxy.url(&format!("http:/{}/", upstream)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    let cookies: Vec<_> = res.headers().get_all("set-cookie").iter().collect();
    assert_eq!(cookies, ["a=1", "b=2"]);
    assert_eq!(res.headers()["x-upstream"], "yes");
    assert_eq!(res.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn test_redirects_are_relayed_not_followed() {
    let upstream = common::start_upstream(Router::new().fallback(|| async {
        (StatusCode::FOUND, [("location", "/elsewhere")]).into_response()
    }))
    .await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let client = reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let res = client
        .get(proxy.url(&format!("http:/{}/old", upstream)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "/elsewhere");
}

#[tokio::test]
async fn test_large_body_round_trip() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let payload: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let res = common::client()
        .post(proxy.url(&format!("http:/{}/upload", upstream)))
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echoed = res.bytes().await.unwrap();
    assert_eq!(echoed.len(), payload.len());
    assert!(echoed[..] == payload[..], "Relayed bytes differ from payload");
}

#[tokio::test]
async fn test_response_chunks_arrive_before_upstream_finishes() {
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(4);
    let rx = Arc::new(Mutex::new(Some(rx)));

    let upstream = common::start_upstream(Router::new().fallback(move || {
        let rx = rx.clone();
        async move {
            let rx = rx.lock().await.take().expect("single request");
            let chunks = stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            });
            Body::from_stream(chunks)
        }
    }))
    .await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let mut res = common::client()
        .get(proxy.url(&format!("http:/{}/live", upstream)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tx.send(Ok(Bytes::from_static(b"first"))).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("First chunk should be relayed while upstream is still open")
        .unwrap()
        .unwrap();
    assert_eq!(first, "first");

    tx.send(Ok(Bytes::from_static(b"second"))).await.unwrap();
    drop(tx);

    let mut rest = Vec::new();
    while let Some(chunk) = res.chunk().await.unwrap() {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"second");
}

#[tokio::test]
async fn test_catch_all_mount() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let mut config = ProxyConfig::default();
    config.proxy.mount_path = "/".into();
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/http:/{}/root/path", proxy.addr, upstream))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-uri"], "/root/path");
}

#[tokio::test]
async fn test_upload_reaches_upstream_before_client_finishes() {
    let (seen_tx, mut seen_rx) = mpsc::channel::<usize>(1);

    let upstream = common::start_upstream(Router::new().fallback(move |request: Request| {
        let seen_tx = seen_tx.clone();
        async move {
            let mut body = request.into_body().into_data_stream();
            let mut total = 0;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.unwrap();
                if total == 0 {
                    let _ = seen_tx.send(chunk.len()).await;
                }
                total += chunk.len();
            }
            total.to_string()
        }
    }))
    .await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let (upload_tx, upload_rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(4);
    let upload = stream::unfold(upload_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    let request = common::client()
        .post(proxy.url(&format!("http:/{}/ingest", upstream)))
        .body(reqwest::Body::wrap_stream(upload))
        .send();
    let pending = tokio::spawn(request);

    upload_tx.send(Ok(Bytes::from_static(b"hello"))).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
        .await
        .expect("Upstream should see the first chunk while the upload is still open")
        .unwrap();
    assert!((1..=5).contains(&first), "{first}");

    upload_tx.send(Ok(Bytes::from_static(b" world"))).await.unwrap();
    drop(upload_tx);

    let res = pending.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "11");
}

/// Fires when the upstream body stream is dropped.
struct DropSignal(Option<oneshot::Sender<()>>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn test_client_disconnect_drops_upstream_stream() {
    let (dropped_tx, dropped_rx) = oneshot::channel();
    let signal = Arc::new(Mutex::new(Some(DropSignal(Some(dropped_tx)))));

    let upstream = common::start_upstream(Router::new().fallback(move || {
        let signal = signal.clone();
        async move {
            let signal = signal.lock().await.take().expect("single request");
            let ticks = stream::unfold(signal, |signal| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Some((Ok::<_, std::io::Error>(Bytes::from_static(b"tick\n")), signal))
            });
            Body::from_stream(ticks)
        }
    }))
    .await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let mut res = common::client()
        .get(proxy.url(&format!("http:/{}/ticks", upstream)))
        .send()
        .await
        .unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("Endless stream should start relaying")
        .unwrap()
        .unwrap();
    assert!(first.starts_with(b"tick"));

    drop(res);

    tokio::time::timeout(Duration::from_secs(5), dropped_rx)
        .await
        .expect("Upstream stream should be dropped after the caller goes away")
        .unwrap();
}
