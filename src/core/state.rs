use std::sync::Arc;

use crate::core::client::ApiClient;
use crate::core::error::ConfigError;
use crate::core::session::Session;
use crate::services::auth::AuthService;
use crate::services::image::ImageService;
use crate::services::product::ProductService;
use crate::token::store::TokenStore;

/// Root of the client: one session and the services that share its token
/// slot.
#[derive(Debug)]
pub struct AppState<S> {
    pub session: Session<S>,
    pub products: ProductService<S>,
    pub images: ImageService<S>,
}

impl<S: TokenStore> AppState<S> {
    /// Wires everything to `store` and restores the session from it.
    pub async fn new(base_url: &str, user_agent: &str, store: S) -> Result<Self, ConfigError> {
        let store = Arc::new(store);
        let client = ApiClient::new(base_url, user_agent, Arc::clone(&store))?;

        let session = Session::restored(AuthService::new(client.clone()), store).await;

        Ok(Self {
            session,
            products: ProductService::new(client.clone()),
            images: ImageService::new(client),
        })
    }
}
