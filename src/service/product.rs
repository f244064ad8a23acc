use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{NewProduct, Product};
use crate::repository::ProductRepo;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepo>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepo>) -> Self { Self { repo } }

    #[tracing::instrument(skip_all)]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let product = self.repo.insert(Product::create(input)?).await?;
        tracing::info!(product = %product.id, "product created");
        Ok(product)
    }

    pub async fn get_product_by_id(&self, id: Uuid) -> Result<Product> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("Product not found."))
    }
}
