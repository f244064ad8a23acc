//! In-memory backend, used when no database is configured and by tests.
//!
//! Each mutation runs under a single write guard, which makes it atomic with
//! respect to every other call on the same repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartRepo, CategoryRepo, ProductRepo, UserRepo, WishlistRepo};
use crate::domain::aggregates::{
    Cart, Category, CategoryPatch, ParentLinks, Product, ProductSetOp, User, Wishlist, WishlistUpdate,
};
use crate::{Result, StorefrontError};

fn links(rows: &[Category]) -> ParentLinks {
    rows.iter().map(|c| (c.id, c.parent_category)).collect()
}

#[derive(Default)]
pub struct InMemoryCategoryRepo {
    // insertion order doubles as listing order
    rows: RwLock<Vec<Category>>,
}

impl InMemoryCategoryRepo {
    /// Writes a row verbatim, bypassing hierarchy checks.
    pub async fn put_raw(&self, category: Category) {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|c| c.id == category.id) {
            Some(existing) => *existing = category,
            None => rows.push(category),
        }
    }
}

#[async_trait]
impl CategoryRepo for InMemoryCategoryRepo {
    async fn insert(&self, category: Category, max_depth: usize) -> Result<Category> {
        let mut rows = self.rows.write().await;
        links(&rows).check_placement(category.id, category.parent_category, max_depth)?;
        rows.push(category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.rows.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Category>> {
        Ok(self.rows.read().await.clone())
    }

    async fn find_roots(&self) -> Result<Vec<Category>> {
        Ok(self.rows.read().await.iter().filter(|c| c.is_root()).cloned().collect())
    }

    async fn find_by_parent(&self, parent_id: Uuid) -> Result<Vec<Category>> {
        self.find_by_parents(&[parent_id]).await
    }

    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<Category>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|c| c.parent_category.is_some_and(|p| parent_ids.contains(&p)))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, patch: &CategoryPatch, max_depth: usize) -> Result<Option<Category>> {
        let mut rows = self.rows.write().await;
        let Some(pos) = rows.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(parent) = patch.parent_category {
            links(&rows).check_placement(id, parent, max_depth)?;
        }
        patch.apply_to(&mut rows[pos]);
        Ok(Some(rows[pos].clone()))
    }

    async fn delete_and_reparent(&self, id: Uuid) -> Result<Option<Category>> {
        let mut rows = self.rows.write().await;
        let Some(pos) = rows.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let removed = rows.remove(pos);
        for c in rows.iter_mut() {
            c.splice_out(&removed);
        }
        Ok(Some(removed))
    }
}

#[derive(Default)]
pub struct InMemoryCartRepo {
    by_user: RwLock<HashMap<Uuid, Cart>>,
}

#[async_trait]
impl CartRepo for InMemoryCartRepo {
    async fn insert(&self, cart: Cart) -> Result<Cart> {
        let mut carts = self.by_user.write().await;
        if carts.contains_key(&cart.user_id()) {
            return Err(StorefrontError::Duplicate("Cart already exists for this user".into()));
        }
        carts.insert(cart.user_id(), cart.clone());
        Ok(cart)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.by_user.read().await.get(&user_id).cloned())
    }

    async fn save_if_current(&self, mut cart: Cart) -> Result<Option<Cart>> {
        let mut carts = self.by_user.write().await;
        match carts.get_mut(&cart.user_id()) {
            Some(stored) if stored.id() == cart.id() && stored.version() == cart.version() => {
                cart.advance_version();
                *stored = cart.clone();
                Ok(Some(cart))
            }
            _ => Ok(None),
        }
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.by_user.write().await.remove(&user_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryWishlistRepo {
    rows: RwLock<Vec<Wishlist>>,
}

impl InMemoryWishlistRepo {
    async fn modify<F>(&self, id: Uuid, f: F) -> Option<Wishlist>
    where
        F: FnOnce(&mut Wishlist) + Send,
    {
        let mut rows = self.rows.write().await;
        rows.iter_mut().find(|w| w.id == id).map(|w| {
            f(w);
            w.clone()
        })
    }
}

#[async_trait]
impl WishlistRepo for InMemoryWishlistRepo {
    async fn insert(&self, wishlist: Wishlist) -> Result<Wishlist> {
        self.rows.write().await.push(wishlist.clone());
        Ok(wishlist)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wishlist>> {
        Ok(self.rows.read().await.iter().find(|w| w.id == id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Wishlist>> {
        Ok(self.rows.read().await.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }

    async fn update_details(&self, id: Uuid, update: &WishlistUpdate) -> Result<Option<Wishlist>> {
        Ok(self.modify(id, |w| w.apply_update(update)).await)
    }

    async fn update_products(&self, id: Uuid, op: ProductSetOp) -> Result<Option<Wishlist>> {
        Ok(self.modify(id, |w| w.apply(op)).await)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Wishlist>> {
        let mut rows = self.rows.write().await;
        Ok(rows.iter().position(|w| w.id == id).map(|pos| rows.remove(pos)))
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|w| w.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryProductRepo {
    rows: RwLock<HashMap<Uuid, Product>>,
}

#[async_trait]
impl ProductRepo for InMemoryProductRepo {
    async fn insert(&self, product: Product) -> Result<Product> {
        self.rows.write().await.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepo {
    rows: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn insert(&self, user: User) -> Result<User> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|u| u.email == user.email) {
            return Err(StorefrontError::Duplicate("Email already registered".into()));
        }
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.rows.write().await.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::aggregates::{CartItem, NewCategory};
    use crate::domain::value_objects::Quantity;
    use rust_decimal::Decimal;

    fn category(name: &str, parent: Option<Uuid>) -> Category {
        Category::create(NewCategory {
            name: Some(name.into()),
            description: Some("d".into()),
            parent_category: parent,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_delete_reparents_children() {
        let repo = InMemoryCategoryRepo::default();
        let root = repo.insert(category("Electronics", None), 16).await.unwrap();
        let mid = repo.insert(category("Phones", Some(root.id)), 16).await.unwrap();
        let leaf = repo.insert(category("Smartphones", Some(mid.id)), 16).await.unwrap();

        let removed = repo.delete_and_reparent(mid.id).await.unwrap().unwrap();
        assert_eq!(removed.id, mid.id);
        let leaf = repo.find_by_id(leaf.id).await.unwrap().unwrap();
        assert_eq!(leaf.parent_category, Some(root.id));
        assert!(repo.delete_and_reparent(mid.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_crossed_moves_cannot_both_land() {
        let repo = Arc::new(InMemoryCategoryRepo::default());
        let a = repo.insert(category("A", None), 16).await.unwrap();
        let b = repo.insert(category("B", None), 16).await.unwrap();

        let move_under = |child: Uuid, parent: Uuid| {
            let repo = repo.clone();
            tokio::spawn(async move {
                let patch = CategoryPatch { parent_category: Some(Some(parent)), ..Default::default() };
                repo.update(child, &patch, 16).await
            })
        };
        let (first, second) = tokio::join!(move_under(a.id, b.id), move_under(b.id, a.id));
        let outcomes = [first.unwrap(), second.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(r, Err(StorefrontError::Validation(_)))));

        let roots = repo.find_roots().await.unwrap();
        assert_eq!(roots.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_checks_depth_under_lock() {
        let repo = InMemoryCategoryRepo::default();
        let root = repo.insert(category("Root", None), 1).await.unwrap();
        let child = repo.insert(category("Child", Some(root.id)), 1).await.unwrap();
        let err = repo.insert(category("Grandchild", Some(child.id)), 1).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cart_version_guard() {
        let repo = InMemoryCartRepo::default();
        let user = Uuid::now_v7();
        let cart = repo.insert(Cart::for_user(user)).await.unwrap();
        assert!(matches!(repo.insert(Cart::for_user(user)).await, Err(StorefrontError::Duplicate(_))));

        let mut first = cart.clone();
        first.add_item(CartItem { product_id: Uuid::now_v7(), quantity: Quantity::one(), price_at_addition: Decimal::TEN }).unwrap();
        let saved = repo.save_if_current(first).await.unwrap().unwrap();
        assert_eq!(saved.version(), 1);

        // `cart` still carries version 0
        let mut stale = cart;
        stale.clear();
        assert!(repo.save_if_current(stale).await.unwrap().is_none());
        assert_eq!(repo.find_by_user(user).await.unwrap().unwrap().items().len(), 1);
    }

    #[tokio::test]
    async fn test_wishlist_delete_by_user_counts() {
        let repo = InMemoryWishlistRepo::default();
        let user = Uuid::now_v7();
        repo.insert(Wishlist::default_for(user)).await.unwrap();
        repo.insert(Wishlist::default_for(Uuid::now_v7())).await.unwrap();
        assert_eq!(repo.delete_by_user(user).await.unwrap(), 1);
        assert_eq!(repo.delete_by_user(user).await.unwrap(), 0);
    }
}
