//! Cart operations: one cart per user, merged lines, decrement-to-removal.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItemInput, CartView};
use crate::domain::value_objects::parse_id;
use crate::repository::{CartRepo, ProductRepo};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepo>,
    products: Arc<dyn ProductRepo>,
    save_retries: u32,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepo>, products: Arc<dyn ProductRepo>, save_retries: u32) -> Self {
        Self { carts, products, save_retries: save_retries.max(1) }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self, user_id: Uuid) -> Result<Cart> {
        let cart = self.carts.insert(Cart::for_user(user_id)).await?;
        tracing::info!(cart = %cart.id(), "cart created");
        Ok(cart)
    }

    pub async fn get_cart_by_user_id(&self, user_id: Uuid) -> Result<Option<CartView>> {
        match self.carts.find_by_user(user_id).await? {
            Some(cart) => Ok(Some(self.populate(cart).await?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn add_item_to_cart(&self, user_id: Uuid, input: CartItemInput) -> Result<CartView> {
        let item = input.into_item()?;
        let cart = self
            .mutate(user_id, |cart| cart.add_item(item.clone()))
            .await?;
        tracing::debug!(product = %item.product_id, qty = item.quantity.value(), "item added");
        self.populate(cart).await
    }

    /// Takes one unit of `product_id` off the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item_from_cart(&self, user_id: Uuid, product_id: &str) -> Result<CartView> {
        let product_id = parse_id(product_id, "productId")?;
        let cart = self.mutate(user_id, |cart| cart.decrement_item(product_id)).await?;
        self.populate(cart).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<CartView> {
        let cart = self
            .mutate(user_id, |cart| {
                cart.clear();
                Ok(())
            })
            .await?;
        self.populate(cart).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, user_id: Uuid) -> Result<()> {
        if !self.carts.delete_by_user(user_id).await? {
            return Err(StorefrontError::not_found("Cart not found"));
        }
        tracing::info!("cart deleted");
        Ok(())
    }

    // read, apply, save on matching version; a concurrent writer forces a re-read
    async fn mutate<F>(&self, user_id: Uuid, mut apply: F) -> Result<Cart>
    where
        F: FnMut(&mut Cart) -> Result<()> + Send,
    {
        for attempt in 1..=self.save_retries {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or_else(|| StorefrontError::not_found("Cart not found"))?;
            apply(&mut cart)?;
            if let Some(saved) = self.carts.save_if_current(cart).await? {
                return Ok(saved);
            }
            tracing::debug!(%user_id, attempt, "cart changed underneath, retrying");
        }
        tracing::warn!(%user_id, retries = self.save_retries, "cart update kept conflicting");
        Err(StorefrontError::Conflict(format!("cart of user {user_id} is being modified concurrently")))
    }

    async fn populate(&self, cart: Cart) -> Result<CartView> {
        let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        let products: HashMap<_, _> = self
            .products
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(cart.populate(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, Product};
    use crate::repository::{InMemoryCartRepo, InMemoryProductRepo};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service() -> (CartService, Arc<InMemoryProductRepo>) {
        let products = Arc::new(InMemoryProductRepo::default());
        let svc = CartService::new(Arc::new(InMemoryCartRepo::default()), products.clone(), 5);
        (svc, products)
    }

    fn line(product_id: Uuid, quantity: i64, price: i64) -> CartItemInput {
        CartItemInput {
            product_id: Some(product_id.to_string()),
            quantity: Some(quantity),
            price_at_addition: Some(Decimal::new(price, 0)),
        }
    }

    #[tokio::test]
    async fn test_create_twice_is_duplicate() {
        let (svc, _) = service();
        let user = Uuid::now_v7();
        svc.create_cart(user).await.unwrap();
        assert!(matches!(svc.create_cart(user).await, Err(StorefrontError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_add_merges_and_keeps_price() {
        let (svc, _) = service();
        let (user, x) = (Uuid::now_v7(), Uuid::now_v7());
        svc.create_cart(user).await.unwrap();
        svc.add_item_to_cart(user, line(x, 2, 10)).await.unwrap();
        let cart = svc.add_item_to_cart(user, line(x, 3, 99)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity.value(), 5);
        assert_eq!(cart.items[0].price_at_addition, Decimal::new(10, 0));
        assert_eq!(cart.total_price, Decimal::new(50, 0));
    }

    #[tokio::test]
    async fn test_add_without_cart() {
        let (svc, _) = service();
        let err = svc.add_item_to_cart(Uuid::now_v7(), line(Uuid::now_v7(), 1, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Cart not found");
    }

    #[tokio::test]
    async fn test_validation_precedes_lookup() {
        let (svc, _) = service();
        let bad = CartItemInput { quantity: Some(-1), ..line(Uuid::now_v7(), 1, 1) };
        let err = svc.add_item_to_cart(Uuid::now_v7(), bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Quantity must be greater than zero");
    }

    #[tokio::test]
    async fn test_remove_decrements_then_drops() {
        let (svc, _) = service();
        let (user, x, y) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        svc.create_cart(user).await.unwrap();
        svc.add_item_to_cart(user, line(x, 3, 5)).await.unwrap();
        svc.add_item_to_cart(user, line(y, 1, 7)).await.unwrap();

        let cart = svc.remove_item_from_cart(user, &x.to_string()).await.unwrap();
        let x_line = cart.items.iter().find(|l| l.product_id == x).unwrap();
        assert_eq!(x_line.quantity.value(), 2);

        let cart = svc.remove_item_from_cart(user, &y.to_string()).await.unwrap();
        assert!(cart.items.iter().all(|l| l.product_id != y));
        assert_eq!(cart.total_price, Decimal::new(10, 0));

        let err = svc.remove_item_from_cart(user, &y.to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "Item not found in cart");
        let err = svc.remove_item_from_cart(user, "42").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid productId format");
    }

    #[tokio::test]
    async fn test_clear_and_delete() {
        let (svc, _) = service();
        let user = Uuid::now_v7();
        svc.create_cart(user).await.unwrap();
        svc.add_item_to_cart(user, line(Uuid::now_v7(), 2, 30)).await.unwrap();
        let cart = svc.clear_cart(user).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_price, Decimal::ZERO);

        svc.delete_cart(user).await.unwrap();
        assert!(svc.get_cart_by_user_id(user).await.unwrap().is_none());
        assert!(matches!(svc.delete_cart(user).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_populates_products() {
        let (svc, products) = service();
        let user = Uuid::now_v7();
        let p = Product::create(NewProduct {
            name: Some("Lamp".into()),
            price: Some(Decimal::new(25, 0)),
            image: Some("lamp.png".into()),
            ..Default::default()
        })
        .unwrap();
        products.insert(p.clone()).await.unwrap();
        svc.create_cart(user).await.unwrap();
        svc.add_item_to_cart(user, line(p.id, 1, 25)).await.unwrap();
        svc.add_item_to_cart(user, line(Uuid::now_v7(), 1, 3)).await.unwrap();

        let cart = svc.get_cart_by_user_id(user).await.unwrap().unwrap();
        assert_eq!(cart.items[0].product.as_ref().map(|p| p.name.as_str()), Some("Lamp"));
        assert!(cart.items[1].product.is_none());
    }

    /// Loses the first `fail_first` saves, as if another writer got there first.
    struct RacingCartRepo {
        inner: InMemoryCartRepo,
        fail_first: u32,
        saves: AtomicU32,
    }

    #[async_trait]
    impl CartRepo for RacingCartRepo {
        async fn insert(&self, cart: Cart) -> Result<Cart> { self.inner.insert(cart).await }
        async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> { self.inner.find_by_user(user_id).await }
        async fn save_if_current(&self, cart: Cart) -> Result<Option<Cart>> {
            if self.saves.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Ok(None);
            }
            self.inner.save_if_current(cart).await
        }
        async fn delete_by_user(&self, user_id: Uuid) -> Result<bool> { self.inner.delete_by_user(user_id).await }
    }

    fn racing(fail_first: u32, retries: u32) -> CartService {
        let repo = RacingCartRepo { inner: InMemoryCartRepo::default(), fail_first, saves: AtomicU32::new(0) };
        CartService::new(Arc::new(repo), Arc::new(InMemoryProductRepo::default()), retries)
    }

    #[tokio::test]
    async fn test_retries_on_version_conflict() {
        let svc = racing(2, 3);
        let user = Uuid::now_v7();
        svc.create_cart(user).await.unwrap();
        let cart = svc.add_item_to_cart(user, line(Uuid::now_v7(), 1, 4)).await.unwrap();
        assert_eq!(cart.total_price, Decimal::new(4, 0));
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let svc = racing(10, 3);
        let user = Uuid::now_v7();
        svc.create_cart(user).await.unwrap();
        let err = svc.add_item_to_cart(user, line(Uuid::now_v7(), 1, 4)).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let (svc, _) = service();
        let (user, x) = (Uuid::now_v7(), Uuid::now_v7());
        svc.create_cart(user).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move { svc.add_item_to_cart(user, line(x, 1, 2)).await }));
        }
        let mut succeeded = 0u32;
        for h in handles {
            // conflicts beyond the retry budget are allowed, silent loss is not
            if h.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        let cart = svc.get_cart_by_user_id(user).await.unwrap().unwrap();
        let qty = cart.items[0].quantity.value();
        assert_eq!(qty, succeeded);
        assert_eq!(cart.total_price, Decimal::from(qty * 2));
    }
}
