use std::time::Duration;

use reqwest::Client;
use url::Url;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webhooks::relay::ServerState;
use webhooks::{EventCatalog, EventSelection, ForwardingRule, RelayConfig, RelayServer, RuleMatcher};

fn rule(url: String, events: &[&str]) -> ForwardingRule {
    ForwardingRule::new(
        Url::parse(&url).unwrap(),
        EventSelection::only(events.iter().copied()).unwrap(),
    )
}

async fn start(rules: Vec<ForwardingRule>) -> RelayServer {
    let config = RelayConfig {
        rules: RuleMatcher::new(rules, EventCatalog::new()),
        forward_timeout: Duration::from_secs(5),
        ..RelayConfig::default()
    };
    RelayServer::start(config, Client::new()).await.unwrap()
}

#[tokio::test]
async fn test_relay_forwards_raw_body_end_to_end() {
    let target = MockServer::start().await;
    // Odd spacing must survive untouched.
    let raw = r#"{ "type" : "deployment.created", "payload": {"id":"dpl_1"} }"#;

    Mock::given(method("POST"))
        .and(path("/api/webhook"))
        .and(header("x-vercel-signature", "sig123"))
        .and(header("content-type", "application/json"))
        .and(body_bytes(raw.as_bytes().to_vec()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target)
        .await;
    Mock::given(method("POST"))
        .and(path("/other"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&target)
        .await;

    let mut server = start(vec![
        rule(
            format!("{}/api/webhook", target.uri()),
            &["deployment.created", "domain.created"],
        ),
        rule(format!("{}/other", target.uri()), &["project.removed"]),
    ])
    .await;
    assert_eq!(server.state(), ServerState::Listening);

    let response = Client::new()
        .post(format!("http://{}/some/path", server.local_addr()))
        .header("x-vercel-signature", "sig123")
        .header("content-type", "application/json")
        .body(raw)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.bytes().await.unwrap().is_empty());

    server.stop().await.unwrap();
    assert_eq!(server.state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_relay_keeps_serving_after_bad_request() {
    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target)
        .await;

    let mut server = start(vec![ForwardingRule::all(Url::parse(&target.uri()).unwrap())]).await;
    let url = format!("http://{}/", server.local_addr());
    let client = Client::new();

    let bad = client.post(&url).body("not json").send().await.unwrap();
    assert_eq!(bad.status(), 500);
    assert!(bad.bytes().await.unwrap().is_empty());

    let good = client
        .post(&url)
        .body(r#"{"type":"project.created"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(good.status(), 200);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_relay_answers_after_slowest_target() {
    let target = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&target)
        .await;
    Mock::given(method("POST"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&target)
        .await;

    let mut server = start(vec![
        ForwardingRule::all(Url::parse(&format!("{}/slow", target.uri())).unwrap()),
        ForwardingRule::all(Url::parse(&format!("{}/fast", target.uri())).unwrap()),
    ])
    .await;

    let started = std::time::Instant::now();
    let response = Client::new()
        .post(format!("http://{}/", server.local_addr()))
        .body(r#"{"type":"domain.created"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(started.elapsed() >= Duration::from_millis(300));

    server.stop().await.unwrap();
}
