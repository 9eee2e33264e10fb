//! In-memory test client.

use http::Method;
use pactum_server::{Router, Server};

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Sends requests straight into a [`Server`] without opening a socket.
///
/// Requests take the same path as over the network: routing, body
/// limits, JSON parsing, dispatch, and timeouts.
///
/// ```ignore
/// use pactum_test::TestClient;
///
/// let client = TestClient::new(router);
/// client.get("/users/123").send().await.assert_status(200);
/// ```
#[must_use]
pub struct TestClient {
    server: Server,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client serving `router` with default server settings.
    pub fn new(router: Router) -> Self {
        Self::from_server(Server::builder().router(router).build())
    }

    /// Creates a client for a configured server.
    pub fn from_server(server: Server) -> Self {
        Self {
            server,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the server requests are sent to.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built.
    pub async fn send(self) -> TestResponse {
        self.try_send().await.expect("test request should be valid")
    }

    /// Sends the request, reporting build failures.
    ///
    /// # Errors
    ///
    /// Returns the builder's error or a body read failure.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?.into_http_request();
        let response = self.client.server.handle(request).await;
        TestResponse::from_http(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{Contract, ErrorCode, HandlerError, InputSchemas, Schema};
    use serde_json::json;

    fn router() -> Router {
        let whoami = Contract::new()
            .name("whoami")
            .route("get", "/whoami")
            .unwrap()
            .handler(|_input, ctx| async move {
                let auth = ctx.header("authorization").unwrap_or("none").to_string();
                Ok::<_, HandlerError>(json!({"auth": auth}))
            });

        let search = Contract::new()
            .name("search")
            .route("get", "/search")
            .unwrap()
            .input(InputSchemas::new().query(Schema::object([
                ("q", Schema::string().min_length(1)),
                ("limit", Schema::integer().default(10)),
            ])))
            .unwrap()
            .handler(|input, _ctx| async move { Ok::<_, HandlerError>(input) });

        Router::new().with(whoami).unwrap().with(search).unwrap()
    }

    #[tokio::test]
    async fn test_query_is_validated_and_coerced() {
        let client = TestClient::new(router());

        client
            .get("/search")
            .query("q", "rust")
            .query("limit", 3)
            .send()
            .await
            .assert_status(200)
            .assert_json_eq(&json!({"q": "rust", "limit": 3}));

        client
            .get("/search")
            .send()
            .await
            .assert_error_code(ErrorCode::ValidationError)
            .assert_field_error("query.q");
    }

    #[tokio::test]
    async fn test_default_headers_reach_handler() {
        let client = TestClient::new(router()).with_default_header("authorization", "Bearer t");

        client
            .get("/whoami")
            .send()
            .await
            .assert_json_field("auth", &json!("Bearer t"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let client = TestClient::new(router());

        let response = client.delete("/whoami").send().await;
        response.assert_error_code(ErrorCode::NotFound);
        assert_eq!(response.error_body().unwrap().message, "Route not found");
    }

    #[tokio::test]
    async fn test_invalid_header_is_reported() {
        let client = TestClient::new(router());

        let result = client.get("/whoami").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}
