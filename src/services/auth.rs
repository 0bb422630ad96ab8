use serde_json::Value;
use tracing::instrument;

use crate::core::client::ApiClient;
use crate::core::error::Error;
use crate::token::store::TokenStore;
use crate::types::request::Credentials;
use crate::types::response::TokenResponse;

#[derive(Clone, Debug)]
pub struct AuthService<S> {
    client: ApiClient<S>,
}

impl<S: TokenStore> AuthService<S> {
    pub fn new(client: ApiClient<S>) -> Self {
        Self { client }
    }

    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, Error> {
        self.authenticate("/auth/login", &Credentials { username, password })
            .await
    }

    #[instrument(skip_all)]
    pub async fn register(&self, username: &str, password: &str) -> Result<TokenResponse, Error> {
        self.authenticate("/auth/register", &Credentials { username, password })
            .await
    }

    /// A 2xx answer without a usable token is not an error here; it comes
    /// back as a `TokenResponse` with no token.
    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials<'_>,
    ) -> Result<TokenResponse, Error> {
        let body: Value = self.client.post(path, credentials).await?;

        Ok(TokenResponse::from(body))
    }
}
