use serde::Serialize;

use crate::core::error::Error;
use crate::types::response::Product;

/// Body of both `/auth/login` and `/auth/register`.
#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PageQuery {
    pub(crate) page: u32,
    pub(crate) size: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_ids: Vec<String>,
}

/// Product form values as typed in the editor, before they are checked.
#[derive(Clone, Debug, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_ids: Vec<String>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<CreateProductRequest, Error> {
        let name = self.name.trim();
        let description = self.description.trim();
        let price = self.price.trim();

        if name.is_empty() || description.is_empty() || price.is_empty() {
            return Err(Error::InvalidProduct(
                "name, description and price are required".to_owned(),
            ));
        }

        let price: f64 = price
            .parse()
            .ok()
            .filter(|p: &f64| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| Error::InvalidProduct("price must be a valid number".to_owned()))?;

        if self.image_ids.is_empty() {
            return Err(Error::InvalidProduct(
                "product must have at least one image".to_owned(),
            ));
        }

        Ok(CreateProductRequest {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            image_ids: self.image_ids.clone(),
        })
    }

    /// Builds the full record sent on update. The author is assigned by the
    /// backend, so it goes out as 0.
    pub fn validate_for_update(&self, id: i64) -> Result<Product, Error> {
        let request = self.validate()?;

        Ok(Product {
            id,
            name: request.name,
            description: request.description,
            author_id: 0,
            image_ids: request.image_ids,
            price: request.price,
            created_at: None,
        })
    }
}
