use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

use realip_axum::RealIpLayer;
use realip_common::builder::Builder;
use realip_common::resolver::Resolver;
use realip_common::settings::Settings;

const UNSET: &str = "(unset)";

/// Echoes whatever ended up in the destination header.
async fn echo_real_ip(headers: HeaderMap) -> String {
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .unwrap_or(UNSET)
        .to_string()
}

fn app(resolver: Resolver) -> Router {
    Router::new()
        .route("/", get(echo_real_ip))
        .layer(RealIpLayer::new(resolver))
}

async fn send(app: Router, peer: Option<&str>, headers: &[(&str, &str)]) -> String {
    let mut builder = Request::builder().uri("/");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    if let Some(peer) = peer {
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
    }

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn trust_all_honors_source_header() {
    let resolver = Builder::new().build().unwrap();
    let body = send(
        app(resolver),
        Some("127.0.0.1:51423"),
        &[("x-real-ip", "1.1.1.1")],
    )
    .await;
    assert_eq!(body, "1.1.1.1");
}

#[tokio::test]
async fn untrusted_peer_gets_peer_address() {
    let resolver = Builder::new()
        .trusted_range("192.168.0.0/16")
        .build()
        .unwrap();
    let body = send(
        app(resolver),
        Some("127.0.0.1:51423"),
        &[("x-real-ip", "1.1.1.1")],
    )
    .await;
    assert_eq!(body, "127.0.0.1");
}

#[tokio::test]
async fn non_recursive_chain_writes_last_entry() {
    let resolver = Builder::new()
        .source_header("x-forwarded-for")
        .build()
        .unwrap();
    let body = send(
        app(resolver),
        Some("127.0.0.1:51423"),
        &[("x-forwarded-for", "1.2.3.4, 1.1.1.1, 192.168.0.1")],
    )
    .await;
    assert_eq!(body, "192.168.0.1");
}

#[tokio::test]
async fn recursive_chain_writes_first_untrusted_hop() {
    let resolver = Builder::new()
        .source_header("x-forwarded-for")
        .trusted_range("127.0.0.1/32")
        .trusted_range("192.168.0.0/16")
        .recursive(true)
        .build()
        .unwrap();
    let body = send(
        app(resolver),
        Some("127.0.0.1:51423"),
        &[("x-forwarded-for", "1.2.3.4, 1.1.1.1, 192.168.0.1")],
    )
    .await;
    assert_eq!(body, "1.1.1.1");
}

#[tokio::test]
async fn recursive_chain_all_trusted_writes_first_entry() {
    let resolver = Builder::new()
        .source_header("x-forwarded-for")
        .trusted_range("127.0.0.1/32")
        .trusted_range("192.168.0.0/16")
        .recursive(true)
        .build()
        .unwrap();
    let body = send(
        app(resolver),
        Some("127.0.0.1:51423"),
        &[("x-forwarded-for", "192.168.0.2, 192.168.0.1")],
    )
    .await;
    assert_eq!(body, "192.168.0.2");
}

#[tokio::test]
async fn missing_header_falls_back_to_peer() {
    let resolver = Builder::new().build().unwrap();
    let body = send(app(resolver), Some("10.1.2.3:4000"), &[]).await;
    assert_eq!(body, "10.1.2.3");
}

#[tokio::test]
async fn no_peer_and_no_header_leaves_header_unset() {
    let resolver = Builder::new().build().unwrap();
    let body = send(app(resolver), None, &[]).await;
    assert_eq!(body, UNSET);
}

#[tokio::test]
async fn client_header_passes_through_when_nothing_resolves() {
    // No peer address and an empty source header value: nothing to write,
    // and the incoming value is deliberately not removed.
    let resolver = Builder::new()
        .source_header("x-forwarded-for")
        .build()
        .unwrap();
    let body = send(app(resolver), None, &[("x-real-ip", "203.0.113.7")]).await;
    assert_eq!(body, "203.0.113.7");
}

#[tokio::test]
async fn destination_header_can_differ_from_source() {
    let resolver = Builder::new()
        .source_header("x-forwarded-for")
        .destination_header("x-client-ip")
        .build()
        .unwrap();

    async fn echo_client_ip(headers: HeaderMap) -> String {
        headers
            .get("x-client-ip")
            .and_then(|value| value.to_str().ok())
            .unwrap_or(UNSET)
            .to_string()
    }

    let app = Router::new()
        .route("/", get(echo_client_ip))
        .layer(RealIpLayer::new(resolver));
    let body = send(app, Some("127.0.0.1:51423"), &[("x-forwarded-for", "9.9.9.9")]).await;
    assert_eq!(body, "9.9.9.9");
}

#[tokio::test]
async fn layer_builds_from_settings() {
    let toml_str = r#"
        [resolver]
        source_header = "x-forwarded-for"
        destination_header = "x-real-ip"
        trusted_ranges = ["127.0.0.1/32", "192.168.0.0/16"]
        recursive = true
        "#;
    let settings = Settings::from_toml(toml_str).unwrap();
    let layer = RealIpLayer::from_settings(&settings).unwrap();

    let app = Router::new().route("/", get(echo_real_ip)).layer(layer);
    let body = send(
        app,
        Some("127.0.0.1:51423"),
        &[("x-forwarded-for", "1.2.3.4, 1.1.1.1, 192.168.0.1")],
    )
    .await;
    assert_eq!(body, "1.1.1.1");
}

#[tokio::test]
async fn from_settings_rejects_forwarded_source() {
    let toml_str = r#"
        [resolver]
        source_header = "x-real-ip"
        "#;
    let mut settings = Settings::from_toml(toml_str).unwrap();
    settings.resolver.source_header = "forwarded".to_string();
    assert!(RealIpLayer::from_settings(&settings).is_err());
}
