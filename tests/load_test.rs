//! Load testing for the streaming proxy.

use std::time::{Duration, Instant};

use path_proxy::ProxyConfig;

mod common;

#[tokio::test]
async fn test_load_performance() {
    let upstream = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let url = proxy.url(&format!("http:/{}/load", upstream));
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..requests_per_task {
                let body = format!("task {task} request {i}");
                let req_start = Instant::now();
                if let Ok(res) = client.post(&url).body(body.clone()).send().await {
                    if res.status().is_success() && res.text().await.ok() == Some(body) {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }
    let duration = start.elapsed();

    all_latencies.sort();
    let succeeded = all_latencies.len();
    println!("Requests: {succeeded}/{total_requests} in {duration:?}");
    if let Some(p99) = all_latencies.get(succeeded.saturating_sub(1) * 99 / 100) {
        println!("p99 latency: {p99:?}");
    }

    assert_eq!(succeeded, total_requests, "Every relayed request should succeed");
}

#[tokio::test]
async fn test_slow_upstream_does_not_block_others() {
    let slow =
        common::start_upstream(common::stalling_router(Duration::from_secs(2), "slow")).await;
    let fast = common::start_upstream(common::echo_router()).await;
    let proxy = common::start_proxy(ProxyConfig::default()).await;

    let client = common::client();
    let slow_url = proxy.url(&format!("http:/{}/wait", slow));
    let slow_client = client.clone();
    let slow_request = tokio::spawn(async move { slow_client.get(slow_url).send().await });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    for _ in 0..10 {
        let res = client
            .get(proxy.url(&format!("http:/{}/quick", fast)))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
    }
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "Fast requests waited on the slow one: {:?}",
        start.elapsed()
    );

    let res = slow_request.await.unwrap().unwrap();
    assert_eq!(res.text().await.unwrap(), "slow");
}
