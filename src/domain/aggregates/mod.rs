//! Aggregates module
pub mod category;
pub mod cart;
pub mod wishlist;
pub mod product;
pub mod user;

pub use category::{AncestorWalk, Category, CategoryAncestry, CategoryDetail, CategoryIndex, CategoryNode, CategoryPatch, CategoryRef, NewCategory, ParentLinks};
pub use cart::{Cart, CartItem, CartItemInput, CartLineView, CartView};
pub use wishlist::{ProductSetOp, Wishlist, WishlistUpdate, WishlistView, DEFAULT_WISHLIST_NAME};
pub use product::{NewProduct, Product};
pub use user::{NewUser, Role, User};
