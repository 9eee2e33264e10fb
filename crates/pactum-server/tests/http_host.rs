//! End-to-end tests of the HTTP host over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use pactum_core::{Contract, HandlerError, InputSchemas, Method, Schema};
use pactum_server::{Router, Server, ShutdownSignal, REQUEST_ID_HEADER};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn(router: Router) -> (SocketAddr, ShutdownSignal) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();

    let server = Server::builder()
        .router(router)
        .shutdown_timeout(Duration::from_millis(200))
        .build();
    tokio::spawn(server.serve_listener(listener, shutdown.clone()));

    (addr, shutdown)
}

fn users() -> Router {
    let get_user = Contract::new()
        .name("getUser")
        .route(Method::Get, "/users/:id")
        .unwrap()
        .input(InputSchemas::new().params(Schema::object([("id", Schema::integer())])))
        .unwrap()
        .output(Schema::object([
            ("id", Schema::integer()),
            ("name", Schema::string()),
        ]))
        .handler(|input, _ctx| async move {
            match input["id"].as_i64() {
                Some(404) => Err(HandlerError::NotFound),
                _ => Ok(json!({"id": input["id"], "name": "Bob"})),
            }
        });

    let create_user = Contract::new()
        .name("createUser")
        .route(Method::Post, "/users")
        .unwrap()
        .input(InputSchemas::new().body(Schema::object([("name", Schema::string().min_length(1))])))
        .unwrap()
        .handler(|input, ctx| async move {
            let caller = ctx.header("x-caller").unwrap_or("anonymous").to_string();
            Ok::<_, HandlerError>(json!({"name": input["name"], "caller": caller}))
        });

    Router::new().with(get_user).unwrap().with(create_user).unwrap()
}

#[tokio::test]
async fn test_round_trip_over_tcp() {
    let (addr, shutdown) = spawn(users()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/users/123"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"id": 123, "name": "Bob"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_failures_over_tcp() {
    let (addr, shutdown) = spawn(users()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/users/404"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"code": "NOT_FOUND", "message": "Resource not found"}));

    let response = client
        .post(format!("http://{addr}/users"))
        .json(&json!({"name": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["body"]["name"].is_array());

    let response = client
        .put(format!("http://{addr}/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_handler_sees_headers() {
    let (addr, shutdown) = spawn(users()).await;

    let body: Value = reqwest::Client::new()
        .post(format!("http://{addr}/users"))
        .header("x-caller", "billing")
        .json(&json!({"name": "Ada"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({"name": "Ada", "caller": "billing"}));

    shutdown.trigger();
}
