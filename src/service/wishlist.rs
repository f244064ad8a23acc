//! Wishlist operations.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{ProductSetOp, Wishlist, WishlistUpdate, WishlistView};
use crate::repository::{ProductRepo, WishlistRepo};
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

#[derive(Clone)]
pub struct WishlistService {
    wishlists: Arc<dyn WishlistRepo>,
    products: Arc<dyn ProductRepo>,
}

fn missing() -> StorefrontError {
    StorefrontError::not_found("Wishlist not found.")
}

impl WishlistService {
    pub fn new(wishlists: Arc<dyn WishlistRepo>, products: Arc<dyn ProductRepo>) -> Self {
        Self { wishlists, products }
    }

    #[tracing::instrument(skip(self, note))]
    pub async fn create_wishlist(&self, user_id: Uuid, name: Option<String>, note: Option<String>) -> Result<Wishlist> {
        let wishlist = self.wishlists.insert(Wishlist::create(user_id, name, note)?).await?;
        tracing::info!(wishlist = %wishlist.id, "wishlist created");
        Ok(wishlist)
    }

    pub(crate) async fn create_default_wishlist(&self, user_id: Uuid) -> Result<Wishlist> {
        self.wishlists.insert(Wishlist::default_for(user_id)).await
    }

    pub async fn update_wishlist(&self, wishlist_id: Uuid, update: WishlistUpdate) -> Result<Wishlist> {
        let update = update.normalized()?;
        self.wishlists.update_details(wishlist_id, &update).await?.ok_or_else(missing)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_wishlist(&self, wishlist_id: Uuid) -> Result<Wishlist> {
        let removed = self.wishlists.delete(wishlist_id).await?.ok_or_else(missing)?;
        tracing::info!("wishlist deleted");
        Ok(removed)
    }

    pub async fn get_wishlist_by_id(&self, wishlist_id: Uuid) -> Result<WishlistView> {
        let wishlist = self.wishlists.find_by_id(wishlist_id).await?.ok_or_else(missing)?;
        let mut views = self.populate(vec![wishlist]).await?;
        views.pop().ok_or_else(missing)
    }

    /// Owner-unchecked lookup without product population.
    pub async fn find_wishlist(&self, wishlist_id: Uuid) -> Result<Wishlist> {
        self.wishlists.find_by_id(wishlist_id).await?.ok_or_else(missing)
    }

    pub async fn get_all_wishlists_by_user_id(&self, user_id: Uuid) -> Result<Vec<WishlistView>> {
        let wishlists = self.wishlists.find_by_user(user_id).await?;
        self.populate(wishlists).await
    }

    /// Set-add; adding a present product changes nothing.
    pub async fn add_to_wishlist(&self, wishlist_id: Uuid, product_id: Uuid) -> Result<Wishlist> {
        self.apply(wishlist_id, ProductSetOp::Add(product_id)).await
    }

    /// Set-remove; removing an absent product changes nothing.
    pub async fn remove_from_wishlist(&self, wishlist_id: Uuid, product_id: Uuid) -> Result<Wishlist> {
        self.apply(wishlist_id, ProductSetOp::Remove(product_id)).await
    }

    pub async fn clear_wishlist(&self, wishlist_id: Uuid) -> Result<Wishlist> {
        self.apply(wishlist_id, ProductSetOp::Clear).await
    }

    pub async fn is_in_wishlist(&self, wishlist_id: Uuid, product_id: Uuid) -> Result<bool> {
        Ok(self.find_wishlist(wishlist_id).await?.contains(product_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_all_wishlists_by_user_id(&self, user_id: Uuid) -> Result<DeleteSummary> {
        let deleted_count = self.wishlists.delete_by_user(user_id).await?;
        if deleted_count == 0 {
            return Err(StorefrontError::not_found("No wishlists found for this user."));
        }
        tracing::info!(deleted_count, "wishlists deleted");
        Ok(DeleteSummary { deleted_count })
    }

    async fn apply(&self, wishlist_id: Uuid, op: ProductSetOp) -> Result<Wishlist> {
        let wishlist = self.wishlists.update_products(wishlist_id, op).await?.ok_or_else(missing)?;
        tracing::debug!(wishlist = %wishlist_id, ?op, size = wishlist.products.len(), "wishlist products changed");
        Ok(wishlist)
    }

    async fn populate(&self, wishlists: Vec<Wishlist>) -> Result<Vec<WishlistView>> {
        let mut ids: Vec<Uuid> = wishlists.iter().flat_map(|w| w.products.iter().copied()).collect();
        ids.sort_unstable();
        ids.dedup();
        let products: HashMap<_, _> = self
            .products
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(wishlists.into_iter().map(|w| w.populate(&products)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, Product};
    use crate::repository::{InMemoryProductRepo, InMemoryWishlistRepo};
    use rust_decimal::Decimal;

    fn service() -> (WishlistService, Arc<InMemoryProductRepo>) {
        let products = Arc::new(InMemoryProductRepo::default());
        let svc = WishlistService::new(Arc::new(InMemoryWishlistRepo::default()), products.clone());
        (svc, products)
    }

    async fn product(repo: &InMemoryProductRepo, name: &str) -> Product {
        let p = Product::create(NewProduct {
            name: Some(name.into()),
            price: Some(Decimal::new(5, 0)),
            image: Some(format!("{name}.png")),
            ..Default::default()
        })
        .unwrap();
        repo.insert(p).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (svc, _) = service();
        let w = svc.create_wishlist(Uuid::now_v7(), Some("Gifts".into()), None).await.unwrap();
        let p = Uuid::now_v7();
        svc.add_to_wishlist(w.id, p).await.unwrap();
        let w = svc.add_to_wishlist(w.id, p).await.unwrap();
        assert_eq!(w.products, vec![p]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (svc, _) = service();
        let w = svc.create_wishlist(Uuid::now_v7(), Some("Gifts".into()), None).await.unwrap();
        let p = Uuid::now_v7();
        svc.add_to_wishlist(w.id, p).await.unwrap();
        let w = svc.remove_from_wishlist(w.id, Uuid::now_v7()).await.unwrap();
        assert_eq!(w.products, vec![p]);
    }

    #[tokio::test]
    async fn test_membership_tracks_mutations() {
        let (svc, _) = service();
        let w = svc.create_wishlist(Uuid::now_v7(), Some("Gifts".into()), None).await.unwrap();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        svc.add_to_wishlist(w.id, a).await.unwrap();
        svc.add_to_wishlist(w.id, b).await.unwrap();
        svc.remove_from_wishlist(w.id, a).await.unwrap();
        assert!(!svc.is_in_wishlist(w.id, a).await.unwrap());
        assert!(svc.is_in_wishlist(w.id, b).await.unwrap());
        svc.clear_wishlist(w.id).await.unwrap();
        assert!(!svc.is_in_wishlist(w.id, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_wishlist() {
        let (svc, _) = service();
        let id = Uuid::now_v7();
        assert_eq!(svc.add_to_wishlist(id, Uuid::now_v7()).await.unwrap_err().to_string(), "Wishlist not found.");
        assert!(matches!(svc.is_in_wishlist(id, Uuid::now_v7()).await, Err(StorefrontError::NotFound(_))));
        assert!(matches!(svc.get_wishlist_by_id(id).await, Err(StorefrontError::NotFound(_))));
        assert!(matches!(svc.delete_wishlist(id).await, Err(StorefrontError::NotFound(_))));
        assert!(matches!(svc.update_wishlist(id, WishlistUpdate::default()).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_partial() {
        let (svc, _) = service();
        let w = svc.create_wishlist(Uuid::now_v7(), Some("Gifts".into()), Some("xmas".into())).await.unwrap();
        let w = svc.update_wishlist(w.id, WishlistUpdate { name: Some("Presents".into()), note: None }).await.unwrap();
        assert_eq!(w.name, "Presents");
        assert_eq!(w.note.as_deref(), Some("xmas"));
    }

    #[tokio::test]
    async fn test_views_populate_existing_products() {
        let (svc, products) = service();
        let user = Uuid::now_v7();
        let lamp = product(&products, "lamp").await;
        let w = svc.create_wishlist(user, Some("Home".into()), None).await.unwrap();
        svc.add_to_wishlist(w.id, lamp.id).await.unwrap();
        svc.add_to_wishlist(w.id, Uuid::now_v7()).await.unwrap();
        svc.create_wishlist(user, Some("Empty".into()), None).await.unwrap();

        let view = svc.get_wishlist_by_id(w.id).await.unwrap();
        assert_eq!(view.products.len(), 1);
        assert_eq!(view.products[0].name, "lamp");

        let all = svc.get_all_wishlists_by_user_id(user).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(svc.get_all_wishlists_by_user_id(Uuid::now_v7()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_by_user() {
        let (svc, _) = service();
        let user = Uuid::now_v7();
        svc.create_default_wishlist(user).await.unwrap();
        svc.create_wishlist(user, Some("Second".into()), None).await.unwrap();
        let summary = svc.delete_all_wishlists_by_user_id(user).await.unwrap();
        assert_eq!(summary.deleted_count, 2);
        let err = svc.delete_all_wishlists_by_user_id(user).await.unwrap_err();
        assert_eq!(err.to_string(), "No wishlists found for this user.");
    }
}
