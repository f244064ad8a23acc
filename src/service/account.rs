//! User lifecycle: provisioning and teardown of a user's cart and wishlists.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{NewUser, User};
use crate::repository::UserRepo;
use crate::service::{CartService, WishlistService};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    carts: CartService,
    wishlists: WishlistService,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepo>, carts: CartService, wishlists: WishlistService) -> Self {
        Self { users, carts, wishlists }
    }

    /// Stores the user, then gives them an empty cart and the default wishlist.
    /// When provisioning fails the user and anything already provisioned are
    /// removed again, so the email stays free for a retry.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, input: NewUser) -> Result<User> {
        let user = self.users.insert(User::create(input)?).await?;
        if let Err(e) = self.provision(user.id).await {
            tracing::error!(user = %user.id, error = %e, "provisioning failed, rolling back registration");
            self.discard(user.id).await;
            return Err(e);
        }
        tracing::info!(user = %user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("User not found"))
    }

    /// Deletes the user together with their cart and wishlists. Missing
    /// carts or wishlists do not block the deletion.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<User> {
        self.get_user(id).await?;
        match self.carts.delete_cart(id).await {
            Ok(()) | Err(StorefrontError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        match self.wishlists.delete_all_wishlists_by_user_id(id).await {
            Ok(_) | Err(StorefrontError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let user = self
            .users
            .delete(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("User not found"))?;
        tracing::info!("user deleted");
        Ok(user)
    }

    async fn provision(&self, user_id: Uuid) -> Result<()> {
        self.carts.create_cart(user_id).await?;
        self.wishlists.create_default_wishlist(user_id).await?;
        Ok(())
    }

    // best effort; a failure here leaves the row for `delete_user` to clean up
    async fn discard(&self, user_id: Uuid) {
        if let Err(e) = self.carts.delete_cart(user_id).await {
            if !matches!(e, StorefrontError::NotFound(_)) {
                tracing::warn!(user = %user_id, error = %e, "could not remove cart of failed registration");
            }
        }
        if let Err(e) = self.wishlists.delete_all_wishlists_by_user_id(user_id).await {
            if !matches!(e, StorefrontError::NotFound(_)) {
                tracing::warn!(user = %user_id, error = %e, "could not remove wishlists of failed registration");
            }
        }
        if let Err(e) = self.users.delete(user_id).await {
            tracing::error!(user = %user_id, error = %e, "could not remove user of failed registration");
        }
    }
}
