//! Category hierarchy engine.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{
    AncestorWalk, Category, CategoryAncestry, CategoryDetail, CategoryIndex, CategoryNode,
    CategoryPatch, NewCategory,
};
use crate::repository::CategoryRepo;
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoryRepo>,
    max_depth: usize,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepo>, max_depth: usize) -> Self {
        Self { repo, max_depth }
    }

    #[tracing::instrument(skip_all)]
    pub async fn add_category(&self, input: NewCategory) -> Result<Category> {
        let category = Category::create(input)?;
        let saved = self.repo.insert(category, self.max_depth).await?;
        tracing::info!(category = %saved.id, parent = ?saved.parent_category, "category added");
        Ok(saved)
    }

    pub async fn get_all_categories(&self, include_children: bool) -> Result<Vec<CategoryNode>> {
        let all = self.repo.find_all().await?;
        let index = CategoryIndex::new(&all);
        Ok(all.iter().map(|c| index.node(c.clone(), include_children)).collect())
    }

    pub async fn get_root_categories(&self, include_children: bool) -> Result<Vec<CategoryNode>> {
        let roots = self.repo.find_roots().await?;
        self.with_children(roots, include_children).await
    }

    pub async fn get_category_by_id(&self, id: Uuid, include_children: bool) -> Result<CategoryDetail> {
        let category = self.require(id).await?;
        let parent = match category.parent_category {
            Some(parent_id) => self.repo.find_by_id(parent_id).await?,
            None => None,
        };
        let children = match include_children {
            true => Some(self.repo.find_by_parent(id).await?),
            false => None,
        };
        Ok(CategoryDetail::new(category, parent.as_ref(), children))
    }

    /// Ancestors come back root first. A parent id that no longer resolves
    /// ends the chain.
    #[tracing::instrument(skip(self))]
    pub async fn get_category_with_ancestors(&self, id: Uuid) -> Result<CategoryAncestry> {
        let category = self.require(id).await?;
        let mut walk = AncestorWalk::new(id, self.max_depth);
        let mut ancestors = Vec::new();
        let mut next = category.parent_category;
        while let Some(parent_id) = next {
            if let Err(e) = walk.visit(parent_id) {
                tracing::error!(category = %id, at = %parent_id, error = %e, "parent chain walk aborted");
                return Err(e);
            }
            let Some(parent) = self.repo.find_by_id(parent_id).await? else {
                tracing::warn!(category = %id, missing = %parent_id, "dangling parent reference");
                break;
            };
            next = parent.parent_category;
            ancestors.push(parent);
        }
        ancestors.reverse();
        Ok(CategoryAncestry { category, ancestors })
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Category> {
        let patch = patch.normalized()?;
        let updated = self
            .repo
            .update(id, &patch, self.max_depth)
            .await?
            .ok_or_else(|| StorefrontError::not_found("Category not found"))?;
        tracing::info!(category = %id, "category updated");
        Ok(updated)
    }

    /// Removes a category; its children move up to its own parent.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<Category> {
        let removed = self
            .repo
            .delete_and_reparent(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("Category not found"))?;
        tracing::info!(category = %id, new_parent = ?removed.parent_category, "category deleted");
        Ok(removed)
    }

    pub async fn get_categories_by_parent(&self, parent_id: Uuid) -> Result<Vec<CategoryNode>> {
        let children = self.repo.find_by_parent(parent_id).await?;
        self.with_children(children, true).await
    }

    async fn require(&self, id: Uuid) -> Result<Category> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("Category not found"))
    }

    async fn with_children(&self, parents: Vec<Category>, include_children: bool) -> Result<Vec<CategoryNode>> {
        if !include_children {
            return Ok(parents.into_iter().map(|category| CategoryNode { category, children: None }).collect());
        }
        let ids: Vec<Uuid> = parents.iter().map(|c| c.id).collect();
        let children = self.repo.find_by_parents(&ids).await?;
        let index = CategoryIndex::new(&children);
        Ok(parents.into_iter().map(|c| index.node(c, true)).collect())
    }
}
