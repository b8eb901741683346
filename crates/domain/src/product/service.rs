use common::{Page, PageRequest, Product, ProductId};
use store::{Store, UnitOfWork};

use crate::error::DomainError;

use super::{NewProduct, ProductError};

/// Service for maintaining the products orders draw from.
pub struct ProductCatalog<S: Store> {
    store: S,
}

impl<S: Store> ProductCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product under a fresh ID.
    #[tracing::instrument(skip(self), fields(name = %fields.name))]
    pub async fn create(&self, fields: NewProduct) -> Result<Product, DomainError> {
        let mut uow = self.store.begin().await?;
        if uow.find_product_by_name(&fields.name).await?.is_some() {
            return Err(ProductError::NameTaken(fields.name).into());
        }

        let product = uow.save_product(apply(ProductId::new(), fields)).await?;
        uow.commit().await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: ProductId) -> Result<Product, DomainError> {
        let mut uow = self.store.begin().await?;
        let product = uow.find_product(product_id).await?;
        uow.rollback().await?;
        product.ok_or_else(|| ProductError::NotFound(product_id).into())
    }

    /// Lists products by name.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, request: PageRequest) -> Result<Page<Product>, DomainError> {
        let mut uow = self.store.begin().await?;
        let page = uow.list_products(request).await?;
        uow.rollback().await?;
        Ok(page)
    }

    /// Replaces every field of an existing product.
    #[tracing::instrument(skip(self, fields))]
    pub async fn update(
        &self,
        product_id: ProductId,
        fields: NewProduct,
    ) -> Result<Product, DomainError> {
        let mut uow = self.store.begin().await?;
        if uow.find_product(product_id).await?.is_none() {
            return Err(ProductError::NotFound(product_id).into());
        }
        if let Some(existing) = uow.find_product_by_name(&fields.name).await?
            && existing.id != product_id
        {
            return Err(ProductError::NameTaken(fields.name).into());
        }

        let product = uow.save_product(apply(product_id, fields)).await?;
        uow.commit().await?;

        tracing::info!(%product_id, "product updated");
        Ok(product)
    }

    /// Removes a product. Orders keep their own copy of its name and price.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, product_id: ProductId) -> Result<(), DomainError> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_product(product_id).await? {
            return Err(ProductError::NotFound(product_id).into());
        }
        uow.commit().await?;

        tracing::info!(%product_id, "product deleted");
        Ok(())
    }
}

fn apply(id: ProductId, fields: NewProduct) -> Product {
    Product {
        id,
        name: fields.name,
        description: fields.description,
        price: fields.price,
        stock_quantity: fields.stock_quantity,
    }
}
