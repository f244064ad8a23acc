//! PostgreSQL backend.
//!
//! Aggregate mutations map onto single statements or one transaction.
//! Category writes that touch the hierarchy lock the table and check the
//! placement before writing; category delete re-parents and removes in one
//! transaction. Wishlist membership uses array operators and carts are saved
//! conditionally on their `version` column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CartRepo, CategoryRepo, ProductRepo, UserRepo, WishlistRepo};
use crate::domain::aggregates::{
    Cart, CartItem, Category, CategoryPatch, ParentLinks, Product, ProductSetOp, User, Wishlist, WishlistUpdate,
};
use crate::{Result, StorefrontError};

fn on_duplicate(msg: &'static str) -> impl FnOnce(sqlx::Error) -> StorefrontError {
    move |e| match StorefrontError::from(e) {
        StorefrontError::Duplicate(_) => StorefrontError::Duplicate(msg.to_string()),
        other => other,
    }
}

// Holds off every other category writer until the transaction ends (the
// mode conflicts with itself and with plain INSERT/UPDATE/DELETE), then reads
// the parent links the placement check runs against. Readers are not blocked.
async fn hierarchy_snapshot(tx: &mut Transaction<'_, Postgres>) -> Result<ParentLinks> {
    sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE").execute(&mut **tx).await?;
    let rows = sqlx::query_as::<_, (Uuid, Option<Uuid>)>("SELECT id, parent_category FROM categories")
        .fetch_all(&mut **tx).await?;
    Ok(rows.into_iter().collect())
}

pub struct PgCategoryRepo {
    pool: PgPool,
}

impl PgCategoryRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn insert(&self, c: Category, max_depth: usize) -> Result<Category> {
        let mut tx = self.pool.begin().await?;
        if c.parent_category.is_some() {
            hierarchy_snapshot(&mut tx).await?.check_placement(c.id, c.parent_category, max_depth)?;
        }
        let row = sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, description, parent_category, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *")
            .bind(c.id).bind(&c.name).bind(&c.description).bind(c.parent_category).bind(c.created_at).bind(c.updated_at)
            .fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_all(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY created_at").fetch_all(&self.pool).await?)
    }

    async fn find_roots(&self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE parent_category IS NULL ORDER BY created_at").fetch_all(&self.pool).await?)
    }

    async fn find_by_parent(&self, parent_id: Uuid) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE parent_category = $1 ORDER BY created_at").bind(parent_id).fetch_all(&self.pool).await?)
    }

    async fn find_by_parents(&self, parent_ids: &[Uuid]) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE parent_category = ANY($1) ORDER BY created_at").bind(parent_ids).fetch_all(&self.pool).await?)
    }

    async fn update(&self, id: Uuid, patch: &CategoryPatch, max_depth: usize) -> Result<Option<Category>> {
        let mut tx = self.pool.begin().await?;
        if let Some(Some(parent)) = patch.parent_category {
            let links = hierarchy_snapshot(&mut tx).await?;
            if links.contains(id) {
                links.check_placement(id, Some(parent), max_depth)?;
            }
        }
        let row = sqlx::query_as::<_, Category>("UPDATE categories SET name = COALESCE($2, name), description = COALESCE($3, description), parent_category = CASE WHEN $4 THEN $5 ELSE parent_category END, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(&patch.name).bind(&patch.description)
            .bind(patch.parent_category.is_some()).bind(patch.parent_category.flatten())
            .fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn delete_and_reparent(&self, id: Uuid) -> Result<Option<Category>> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *tx).await?;
        let Some(removed) = removed else {
            return Ok(None);
        };
        let moved = sqlx::query("UPDATE categories SET parent_category = $2, updated_at = NOW() WHERE parent_category = $1")
            .bind(id).bind(removed.parent_category).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::debug!(category = %id, children = moved.rows_affected(), "category spliced out");
        Ok(Some(removed))
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<CartItem>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StorefrontError;
    fn try_from(r: CartRow) -> Result<Self> {
        Cart::restore(r.id, r.user_id, r.items.0, r.version, r.created_at, r.updated_at)
    }
}

pub struct PgCartRepo {
    pool: PgPool,
}

impl PgCartRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CartRepo for PgCartRepo {
    async fn insert(&self, cart: Cart) -> Result<Cart> {
        let row = sqlx::query_as::<_, CartRow>("INSERT INTO carts (id, user_id, items, total_price, version, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *")
            .bind(cart.id()).bind(cart.user_id()).bind(Json(cart.items())).bind(cart.total_price())
            .bind(cart.version()).bind(cart.created_at()).bind(cart.updated_at())
            .fetch_one(&self.pool).await.map_err(on_duplicate("Cart already exists for this user"))?;
        row.try_into()
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE user_id = $1").bind(user_id).fetch_optional(&self.pool).await?;
        row.map(Cart::try_from).transpose()
    }

    async fn save_if_current(&self, cart: Cart) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>("UPDATE carts SET items = $3, total_price = $4, version = version + 1, updated_at = $5 WHERE id = $1 AND version = $2 RETURNING *")
            .bind(cart.id()).bind(cart.version()).bind(Json(cart.items())).bind(cart.total_price()).bind(cart.updated_at())
            .fetch_optional(&self.pool).await?;
        row.map(Cart::try_from).transpose()
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}

pub struct PgWishlistRepo {
    pool: PgPool,
}

impl PgWishlistRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl WishlistRepo for PgWishlistRepo {
    async fn insert(&self, w: Wishlist) -> Result<Wishlist> {
        let row = sqlx::query_as::<_, Wishlist>("INSERT INTO wishlists (id, name, user_id, note, products, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *")
            .bind(w.id).bind(&w.name).bind(w.user_id).bind(&w.note).bind(&w.products).bind(w.created_at).bind(w.updated_at)
            .fetch_one(&self.pool).await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wishlist>> {
        Ok(sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Wishlist>> {
        Ok(sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE user_id = $1 ORDER BY created_at").bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn update_details(&self, id: Uuid, update: &WishlistUpdate) -> Result<Option<Wishlist>> {
        let row = sqlx::query_as::<_, Wishlist>("UPDATE wishlists SET name = COALESCE($2, name), note = COALESCE($3, note), updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(&update.name).bind(&update.note)
            .fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn update_products(&self, id: Uuid, op: ProductSetOp) -> Result<Option<Wishlist>> {
        let (sql, product) = match op {
            ProductSetOp::Add(pid) => ("UPDATE wishlists SET products = CASE WHEN $2 = ANY(products) THEN products ELSE array_append(products, $2) END, updated_at = NOW() WHERE id = $1 RETURNING *", Some(pid)),
            ProductSetOp::Remove(pid) => ("UPDATE wishlists SET products = array_remove(products, $2), updated_at = NOW() WHERE id = $1 RETURNING *", Some(pid)),
            ProductSetOp::Clear => ("UPDATE wishlists SET products = '{}', updated_at = NOW() WHERE id = $1 RETURNING *", None),
        };
        let mut query = sqlx::query_as::<_, Wishlist>(sql).bind(id);
        if let Some(pid) = product {
            query = query.bind(pid);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Wishlist>> {
        Ok(sqlx::query_as::<_, Wishlist>("DELETE FROM wishlists WHERE id = $1 RETURNING *").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64> {
        let done = sqlx::query("DELETE FROM wishlists WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

pub struct PgProductRepo {
    pool: PgPool,
}

impl PgProductRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductRepo for PgProductRepo {
    async fn insert(&self, p: Product) -> Result<Product> {
        let row = sqlx::query_as::<_, Product>("INSERT INTO products (id, name, description, price, category_id, stock, image, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.category_id).bind(p.stock).bind(&p.image).bind(p.created_at).bind(p.updated_at)
            .fetch_one(&self.pool).await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)").bind(ids).fetch_all(&self.pool).await?)
    }
}

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, u: User) -> Result<User> {
        let row = sqlx::query_as::<_, User>("INSERT INTO users (id, name, email, role, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING *")
            .bind(u.id).bind(&u.name).bind(&u.email).bind(u.role).bind(u.created_at)
            .fetch_one(&self.pool).await.map_err(on_duplicate("Email already registered"))?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *").bind(id).fetch_optional(&self.pool).await?)
    }
}
