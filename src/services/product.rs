use serde::de::IgnoredAny;
use tracing::instrument;

use crate::core::client::ApiClient;
use crate::core::error::Error;
use crate::token::store::TokenStore;
use crate::types::request::{CreateProductRequest, PageQuery};
use crate::types::response::{Page, Product};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug)]
pub struct ProductService<S> {
    client: ApiClient<S>,
}

impl<S: TokenStore> ProductService<S> {
    pub fn new(client: ApiClient<S>) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn get_products(&self, page: u32, size: u32) -> Result<Page<Product>, Error> {
        let query = serde_urlencoded::to_string(PageQuery { page, size })?;

        self.client.get(&format!("/product?{query}")).await
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: i64) -> Result<Product, Error> {
        self.client.get(&format!("/product/{id}")).await
    }

    #[instrument(skip_all)]
    pub async fn create_product(&self, product: &CreateProductRequest) -> Result<Product, Error> {
        self.client.post("/product", product).await
    }

    #[instrument(skip_all, fields(id = product.id))]
    pub async fn update_product(&self, product: &Product) -> Result<Product, Error> {
        self.client.put("/product", product).await
    }

    /// Whatever the backend sends back on delete is discarded.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> Result<(), Error> {
        let _: IgnoredAny = self.client.delete(&format!("/product/{id}")).await?;

        Ok(())
    }
}
