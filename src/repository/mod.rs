//! Persistence seams.
//!
//! Every repository is an object-safe async trait so services can hold
//! `Arc<dyn ...>` and switch between the PostgreSQL and in-memory backends.
//! Reference population is not done here; repositories return plain records.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, Category, CategoryPatch, Product, ProductSetOp, User, Wishlist, WishlistUpdate,
};
use crate::Result;

mod memory;
mod postgres;

pub use memory::{
    InMemoryCartRepo, InMemoryCategoryRepo, InMemoryProductRepo, InMemoryUserRepo,
    InMemoryWishlistRepo,
};
pub use postgres::{PgCartRepo, PgCategoryRepo, PgProductRepo, PgUserRepo, PgWishlistRepo};

// the repositories are shared by concurrent request tasks, futures holding
// them must be `Send`
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Fails with `Validation` when the parent chain would be deeper than
    /// `max_depth`. The check and the write see the same hierarchy.
    async fn insert(&self, category: Category, max_depth: usize) -> Result<Category>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>>;
    async fn find_all(&self) -> Result<Vec<Category>>;
    async fn find_roots(&self) -> Result<Vec<Category>>;
    async fn find_by_parent(&self, parent_id: Uuid) -> Result<Vec<Category>>;
    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<Category>>;
    /// A new parent is checked with [`ParentLinks::check_placement`] while
    /// other hierarchy writers are held off, so concurrent moves cannot close
    /// a cycle between them.
    ///
    /// [`ParentLinks::check_placement`]: crate::domain::aggregates::ParentLinks::check_placement
    async fn update(&self, id: Uuid, patch: &CategoryPatch, max_depth: usize) -> Result<Option<Category>>;
    /// Points the children of `id` at its parent, then removes `id`, as one unit.
    async fn delete_and_reparent(&self, id: Uuid) -> Result<Option<Category>>;
}

#[async_trait]
pub trait CartRepo: Send + Sync {
    /// Fails with `Duplicate` when the user already owns a cart.
    async fn insert(&self, cart: Cart) -> Result<Cart>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>>;
    /// Saves only if the stored version still equals `cart.version()`.
    /// `None` means the cart changed (or vanished) since it was read.
    async fn save_if_current(&self, cart: Cart) -> Result<Option<Cart>>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait WishlistRepo: Send + Sync {
    async fn insert(&self, wishlist: Wishlist) -> Result<Wishlist>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wishlist>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Wishlist>>;
    async fn update_details(&self, id: Uuid, update: &WishlistUpdate) -> Result<Option<Wishlist>>;
    async fn update_products(&self, id: Uuid, op: ProductSetOp) -> Result<Option<Wishlist>>;
    async fn delete(&self, id: Uuid) -> Result<Option<Wishlist>>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn insert(&self, product: Product) -> Result<Product>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `Duplicate` when the email is taken.
    async fn insert(&self, user: User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn delete(&self, id: Uuid) -> Result<Option<User>>;
}

#[derive(Clone)]
enum Backend {
    Memory,
    Postgres(PgPool),
}

/// One handle per backend, built once at startup.
#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepo>,
    pub carts: Arc<dyn CartRepo>,
    pub wishlists: Arc<dyn WishlistRepo>,
    pub products: Arc<dyn ProductRepo>,
    pub users: Arc<dyn UserRepo>,
    backend: Backend,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            categories: Arc::new(InMemoryCategoryRepo::default()),
            carts: Arc::new(InMemoryCartRepo::default()),
            wishlists: Arc::new(InMemoryWishlistRepo::default()),
            products: Arc::new(InMemoryProductRepo::default()),
            users: Arc::new(InMemoryUserRepo::default()),
            backend: Backend::Memory,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            categories: Arc::new(PgCategoryRepo::new(pool.clone())),
            carts: Arc::new(PgCartRepo::new(pool.clone())),
            wishlists: Arc::new(PgWishlistRepo::new(pool.clone())),
            products: Arc::new(PgProductRepo::new(pool.clone())),
            users: Arc::new(PgUserRepo::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory => "memory",
            Backend::Postgres(_) => "postgres",
        }
    }

    pub async fn ping(&self) -> Result<()> {
        if let Backend::Postgres(pool) = &self.backend {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
