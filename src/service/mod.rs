//! Stateless services, built once at startup and cloned into request handlers.

mod account;
mod cart;
mod category;
mod product;
mod wishlist;

pub use account::AccountService;
pub use cart::CartService;
pub use category::CategoryService;
pub use product::ProductService;
pub use wishlist::{DeleteSummary, WishlistService};

use crate::repository::Repositories;
use crate::AppConfig;

#[derive(Clone)]
pub struct Services {
    pub categories: CategoryService,
    pub carts: CartService,
    pub wishlists: WishlistService,
    pub products: ProductService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(repos: &Repositories, config: &AppConfig) -> Self {
        let carts = CartService::new(repos.carts.clone(), repos.products.clone(), config.cart_save_retries);
        let wishlists = WishlistService::new(repos.wishlists.clone(), repos.products.clone());
        Self {
            categories: CategoryService::new(repos.categories.clone(), config.max_category_depth),
            accounts: AccountService::new(repos.users.clone(), carts.clone(), wishlists.clone()),
            products: ProductService::new(repos.products.clone()),
            carts,
            wishlists,
        }
    }
}
