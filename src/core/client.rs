use std::sync::Arc;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use crate::core::error::{ApiError, ConfigError, Error, ErrorBody};
use crate::token::store::TokenStore;
use crate::types::response::ApiErrorBody;

/// What goes in the request body. Everything except a multipart form is sent
/// as JSON.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Form),
}

impl Body {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, Error> {
        Ok(Body::Json(serde_json::to_value(body)?))
    }

    fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart(_))
    }
}

/// HTTP client for the storefront backend. Attaches the stored bearer token
/// to every call and turns non-2xx answers into [`ApiError`]s.
pub struct ApiClient<S> {
    client: reqwest::Client,
    base_url: String,
    store: Arc<S>,
}

impl<S> Clone for ApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> std::fmt::Debug for ApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<S: TokenStore> ApiClient<S> {
    pub fn new(base_url: &str, user_agent: &str, store: Arc<S>) -> Result<Self, ConfigError> {
        let client = reqwest::ClientBuilder::new().user_agent(user_agent).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Sends one request and decodes the success body as `T`.
    ///
    /// No retries: a network failure comes back as [`Error::HTTPClient`]
    /// without a status, a non-2xx answer as [`Error::Api`].
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<T, Error> {
        let token = match self.store.get().await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("Could not read stored token: {}", e);
                None
            }
        };

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);

        if !body.is_multipart() {
            request = request.header(CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.body(serde_json::to_vec(&value)?),
            Body::Multipart(form) => request.multipart(form),
        };

        tracing::debug!("API request: {} {}", method, url);

        let response = request.send().await.inspect_err(|e| {
            tracing::error!("API error ({} {}): {}", method, path, e);
        })?;

        let status = response.status();
        tracing::debug!("API response status: {}", status.as_u16());

        let body = parse_body(&response.text().await?);

        if !status.is_success() {
            let error = ApiError::new(status.as_u16(), error_body(body));
            tracing::error!(
                status = error.status,
                body = ?error.body,
                "API error ({} {}): {}",
                method,
                path,
                error.message
            );
            return Err(error.into());
        }

        Ok(serde_json::from_value(body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, Body::Empty).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(Method::POST, path, Body::json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(Method::PUT, path, Body::json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::DELETE, path, Body::Empty).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, Error> {
        self.request(Method::POST, path, Body::Multipart(form)).await
    }
}

/// JSON if it parses, the raw text otherwise. An empty body is `null`.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

fn error_body(body: Value) -> Option<ErrorBody> {
    match body {
        Value::String(text) => Some(ErrorBody::Text(text)),
        Value::Object(map) => {
            let message = map.get("message").and_then(Value::as_str).map(str::to_owned);

            let structured = serde_json::from_value::<ApiErrorBody>(Value::Object(map))
                .unwrap_or_else(|_| ApiErrorBody {
                    message,
                    ..Default::default()
                });

            Some(ErrorBody::Structured(structured))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::store::MemoryTokenStore;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, store: MemoryTokenStore) -> ApiClient<MemoryTokenStore> {
        ApiClient::new(&server.uri(), "storefront-test", Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_structured_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/99"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({
                    "status": 404,
                    "message": "not found"
                })),
            )
            .mount(&server)
            .await;

        let err = client(&server, MemoryTokenStore::new())
            .get::<Value>("/product/99")
            .await
            .unwrap_err();

        let Error::Api(api) = err else {
            panic!("expected an API error");
        };
        assert_eq!(api.status, 404);
        assert_eq!(api.message, "not found");
        assert!(matches!(api.body, Some(ErrorBody::Structured(_))));
    }

    #[tokio::test]
    async fn test_text_and_empty_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/text"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
            .mount(&server)
            .await;
        Mock::given(path("/empty"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server, MemoryTokenStore::new());

        let err = client.get::<Value>("/text").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "database down");

        let err = client.get::<Value>("/empty").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "Error 503");
    }

    #[tokio::test]
    async fn test_validation_errors_are_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/product"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": 400,
                "message": "Validation failed",
                "errors": { "price": "must be greater than or equal to 0" }
            })))
            .mount(&server)
            .await;

        let err = client(&server, MemoryTokenStore::new())
            .post::<Value, _>("/product", &json!({ "price": -1 }))
            .await
            .unwrap_err();

        let Error::Api(api) = err else {
            panic!("expected an API error");
        };
        assert_eq!(
            api.validation_summary().as_deref(),
            Some("price: must be greater than or equal to 0")
        );
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/1"))
            .and(header("Authorization", "Bearer abc.def.ghi"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = client(&server, MemoryTokenStore::with_token("abc.def.ghi"))
            .get("/product/1")
            .await
            .unwrap();

        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_no_authorization_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let _: Value = client(&server, MemoryTokenStore::new())
            .get("/product")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_multipart_skips_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(200).set_body_string("abc-123-uuid"))
            .mount(&server)
            .await;

        let form = Form::new().text("file", "data");
        let uuid: String = client(&server, MemoryTokenStore::new())
            .post_multipart("/image", form)
            .await
            .unwrap();
        assert_eq!(uuid, "abc-123-uuid");

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        client(&server, MemoryTokenStore::new())
            .delete::<()>("/product/3")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_success_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })))
            .mount(&server)
            .await;

        let err = client(&server, MemoryTokenStore::new())
            .get::<Vec<u32>>("/product")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[tokio::test]
    async fn test_network_failure_has_no_status() {
        let client = ApiClient::new(
            "http://127.0.0.1:1",
            "storefront-test",
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap();

        let err = client.get::<Value>("/product").await.unwrap_err();
        assert!(matches!(err, Error::HTTPClient(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("{\"a\":1}"), json!({ "a": 1 }));
        assert_eq!(parse_body("plain"), json!("plain"));
    }
}
