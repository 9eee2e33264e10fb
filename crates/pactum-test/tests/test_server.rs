//! Exercises `TestServer` with a plain HTTP client.

use pactum_core::{Contract, HandlerError};
use pactum_server::Router;
use pactum_test::TestServer;
use serde_json::{json, Value};

fn router() -> Router {
    let ping = Contract::new()
        .name("ping")
        .route("get", "/ping")
        .unwrap()
        .handler(|_input, _ctx| async { Ok::<_, HandlerError>(json!({"pong": true})) });
    Router::new().with(ping).unwrap()
}

#[tokio::test]
async fn test_serves_on_loopback() {
    let server = TestServer::spawn(router()).await.unwrap();
    assert!(server.addr().ip().is_loopback());

    let body: Value = reqwest::get(server.url("/ping"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"pong": true}));

    server.shutdown().await;
}

#[tokio::test]
async fn test_stops_accepting_after_shutdown() {
    let server = TestServer::spawn(router()).await.unwrap();
    let url = server.url("ping");
    server.shutdown().await;

    assert!(reqwest::get(url).await.is_err());
}
