//! One registry shared by both ends of an exchange.

use pactum::client::ClientBuilder;
use pactum::prelude::*;
use pactum_test::TestServer;
use serde_json::{json, Map, Value};

fn registry() -> ContractRegistry {
    let get_user = Contract::new()
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
                Some(id) if id > 1000 => Err(HandlerError::NotFound),
                _ => Ok(json!({"id": input["id"], "name": "Bob"})),
            }
        });

    let search = Contract::new()
        .route(Method::Post, "/users/search")
        .unwrap()
        .input(
            InputSchemas::new()
                .query(Schema::object([("page", Schema::integer().default(1))]))
                .body(Schema::object([("name", Schema::string().min_length(1))])),
        )
        .unwrap()
        .handler(|input, ctx| async move {
            let tenant = ctx.header("x-tenant").unwrap_or("none").to_string();
            Ok::<_, HandlerError>(json!({"input": input, "tenant": tenant}))
        });

    ContractRegistry::new()
        .with("getUser", get_user)
        .unwrap()
        .with("searchUsers", search)
        .unwrap()
}

fn params(id: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("id".to_string(), id);
    map
}

#[tokio::test]
async fn test_shared_registry_round_trip() {
    let server = TestServer::spawn(Router::from_registry(&registry()).unwrap())
        .await
        .unwrap();

    let toml = format!(
        r#"
        [client]
        base_url = "{}/"
        timeout_ms = 5000

        [client.headers]
        x-tenant = "acme"
        "#,
        server.base_url()
    );
    let config = ConfigLoader::new()
        .with_defaults()
        .with_string(&toml, "toml")
        .unwrap()
        .load()
        .unwrap();

    let client = ClientBuilder::from_settings(&config.client)
        .registry(registry())
        .build()
        .unwrap();

    let user = client
        .call_named("getUser", RawInput::new().with_params(params(json!("42"))))
        .await
        .unwrap();
    assert_eq!(user, json!({"id": 42, "name": "Bob"}));

    let found = client
        .call_named("searchUsers", RawInput::new().with_body(json!({"name": "Bo"})))
        .await
        .unwrap();
    assert_eq!(found["input"], json!({"page": 1, "name": "Bo"}));
    assert_eq!(found["tenant"], "acme");

    let err = client
        .call_named("getUser", RawInput::new().with_params(params(json!(2000))))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    server.shutdown().await;
}
