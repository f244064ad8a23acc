//! Category Aggregate
//!
//! Categories form a forest through `parent_category`. Children are never
//! stored; they are derived by looking for categories that point at a parent.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::non_blank;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parent_category: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(input: NewCategory) -> Result<Self> {
        let name = non_blank(input.name);
        let description = non_blank(input.description);
        let (Some(name), Some(description)) = (name, description) else {
            return Err(StorefrontError::validation("Name and description are required"));
        };
        let draft = NewCategory {
            name: Some(name),
            description: Some(description),
            parent_category: input.parent_category,
        };
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            name: draft.name.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            parent_category: draft.parent_category,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_root(&self) -> bool { self.parent_category.is_none() }

    /// Re-points this category past `removed` when it is a direct child of it.
    pub fn splice_out(&mut self, removed: &Category) -> bool {
        if self.parent_category != Some(removed.id) {
            return false;
        }
        self.parent_category = removed.parent_category;
        self.updated_at = Utc::now();
        true
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub parent_category: Option<Uuid>,
}

/// Field patch. `parent_category: Some(None)` promotes the category to a root.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub parent_category: Option<Option<Uuid>>,
}

fn explicit_null<'de, D>(de: D) -> std::result::Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(de).map(Some)
}

impl CategoryPatch {
    /// Trims text fields and checks their bounds.
    pub fn normalized(self) -> Result<Self> {
        let patch = Self {
            name: self.name.map(|n| n.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            parent_category: self.parent_category,
        };
        patch.validate()?;
        Ok(patch)
    }

    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name { category.name = name.clone(); }
        if let Some(description) = &self.description { category.description = description.clone(); }
        if let Some(parent) = self.parent_category { category.parent_category = parent; }
        category.updated_at = Utc::now();
    }
}

/// Parent summary embedded in a category detail.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<&Category> for CategoryRef {
    fn from(c: &Category) -> Self {
        Self { id: c.id, name: c.name.clone(), description: c.description.clone() }
    }
}

/// A category optionally augmented with one level of children.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Category>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parent_category: Option<CategoryRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Category>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryDetail {
    pub fn new(category: Category, parent: Option<&Category>, children: Option<Vec<Category>>) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            parent_category: parent.map(CategoryRef::from),
            children,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryAncestry {
    pub category: Category,
    /// Root first, ending at the immediate parent.
    pub ancestors: Vec<Category>,
}

/// Guards an upward walk of the parent chain.
#[derive(Debug)]
pub struct AncestorWalk {
    visited: HashSet<Uuid>,
    max_depth: usize,
}

impl AncestorWalk {
    pub fn new(start: Uuid, max_depth: usize) -> Self {
        Self { visited: HashSet::from([start]), max_depth }
    }

    /// Records the next hop. A revisit is a cycle; a chain that is merely
    /// longer than `max_depth` is reported as such.
    pub fn visit(&mut self, id: Uuid) -> Result<()> {
        if !self.visited.insert(id) {
            return Err(StorefrontError::CycleDetected(id));
        }
        if self.visited.len() > self.max_depth + 1 {
            return Err(StorefrontError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }
}

/// Parent pointers of every stored category, taken while writers are held off.
#[derive(Debug, Default)]
pub struct ParentLinks {
    parents: HashMap<Uuid, Option<Uuid>>,
}

impl FromIterator<(Uuid, Option<Uuid>)> for ParentLinks {
    fn from_iter<I: IntoIterator<Item = (Uuid, Option<Uuid>)>>(iter: I) -> Self {
        Self { parents: iter.into_iter().collect() }
    }
}

impl ParentLinks {
    pub fn contains(&self, id: Uuid) -> bool { self.parents.contains_key(&id) }

    /// Checks that `id` may sit below `parent`: `id` must not be among the
    /// parent's ancestors, and neither `id` nor anything below it may end up
    /// with more than `max_depth` ancestors. Unknown parents count as roots.
    pub fn check_placement(&self, id: Uuid, parent: Option<Uuid>, max_depth: usize) -> Result<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        let mut depth = 0;
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(StorefrontError::validation("Category parent would create a cycle"));
            }
            let Some(next) = self.parents.get(&current) else {
                break;
            };
            if !seen.insert(current) {
                return Err(StorefrontError::CycleDetected(current));
            }
            depth += 1;
            cursor = *next;
        }
        if depth + self.subtree_height(id) > max_depth {
            return Err(StorefrontError::validation(format!(
                "Category nesting cannot exceed {max_depth} levels"
            )));
        }
        Ok(())
    }

    // levels below `id`; 0 for a leaf
    fn subtree_height(&self, id: Uuid) -> usize {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (child, parent) in &self.parents {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(*child);
            }
        }
        let mut seen = HashSet::from([id]);
        let mut frontier = vec![id];
        let mut height = 0;
        loop {
            let next: Vec<Uuid> = frontier
                .iter()
                .flat_map(|p| children.get(p).into_iter().flatten())
                .copied()
                .filter(|c| seen.insert(*c))
                .collect();
            if next.is_empty() {
                return height;
            }
            height += 1;
            frontier = next;
        }
    }
}

/// Child lookup over a fetched set of categories.
pub struct CategoryIndex<'a> {
    children: HashMap<Uuid, Vec<&'a Category>>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(all: &'a [Category]) -> Self {
        let mut children: HashMap<Uuid, Vec<&Category>> = HashMap::new();
        for c in all {
            if let Some(parent) = c.parent_category {
                children.entry(parent).or_default().push(c);
            }
        }
        Self { children }
    }

    pub fn children_of(&self, id: Uuid) -> Vec<Category> {
        self.children
            .get(&id)
            .map(|cs| cs.iter().map(|c| (*c).clone()).collect())
            .unwrap_or_default()
    }

    pub fn node(&self, category: Category, include_children: bool) -> CategoryNode {
        let children = include_children.then(|| self.children_of(category.id));
        CategoryNode { category, children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_category(name: &str, parent: Option<Uuid>) -> Category {
        Category::create(NewCategory {
            name: Some(name.into()),
            description: Some(format!("{name} things")),
            parent_category: parent,
        })
        .unwrap()
    }

    #[test]
    fn test_create_requires_name_and_description() {
        let err = Category::create(NewCategory { name: Some("Phones".into()), ..Default::default() }).unwrap_err();
        assert_eq!(err.to_string(), "Name and description are required");
        let err = Category::create(NewCategory {
            name: Some("  ".into()),
            description: Some("d".into()),
            parent_category: None,
        })
        .unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
    }

    #[test]
    fn test_create_trims_and_bounds() {
        let c = new_category("  Phones  ", None);
        assert_eq!(c.name, "Phones");
        assert!(c.is_root());
        let err = Category::create(NewCategory {
            name: Some("x".repeat(101)),
            description: Some("d".into()),
            parent_category: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Name must be between 1 and 100 characters");
        let err = Category::create(NewCategory {
            name: Some("ok".into()),
            description: Some("d".repeat(501)),
            parent_category: None,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Description must be at most 500 characters");
    }

    #[test]
    fn test_splice_out() {
        let grand = new_category("Electronics", None);
        let parent = new_category("Phones", Some(grand.id));
        let mut child = new_category("Smartphones", Some(parent.id));
        let mut other = new_category("Laptops", Some(grand.id));
        assert!(child.splice_out(&parent));
        assert_eq!(child.parent_category, Some(grand.id));
        assert!(!other.splice_out(&parent));
        assert_eq!(other.parent_category, Some(grand.id));

        let mut orphan_candidate = new_category("Cases", Some(grand.id));
        assert!(orphan_candidate.splice_out(&grand));
        assert!(orphan_candidate.is_root());
    }

    #[test]
    fn test_patch_parent_semantics() {
        let patch: CategoryPatch = serde_json::from_str(r#"{"name":"New"}"#).unwrap();
        assert_eq!(patch.parent_category, None);
        let patch: CategoryPatch = serde_json::from_str(r#"{"parentCategory":null}"#).unwrap();
        assert_eq!(patch.parent_category, Some(None));

        let mut c = new_category("Phones", Some(Uuid::now_v7()));
        patch.apply_to(&mut c);
        assert!(c.is_root());
        assert_eq!(c.name, "Phones");
    }

    #[test]
    fn test_ancestor_walk_detects_revisit() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let mut walk = AncestorWalk::new(a, 8);
        walk.visit(b).unwrap();
        assert!(matches!(walk.visit(a), Err(StorefrontError::CycleDetected(id)) if id == a));
    }

    #[test]
    fn test_ancestor_walk_depth_limit() {
        let mut walk = AncestorWalk::new(Uuid::now_v7(), 2);
        walk.visit(Uuid::now_v7()).unwrap();
        walk.visit(Uuid::now_v7()).unwrap();
        assert!(matches!(walk.visit(Uuid::now_v7()), Err(StorefrontError::DepthExceeded(2))));
    }

    // ids[0] is the root, each next id hangs below the previous one
    fn chain(len: usize) -> (Vec<Uuid>, ParentLinks) {
        let ids: Vec<Uuid> = (0..len).map(|_| Uuid::now_v7()).collect();
        let links = ids.iter().enumerate().map(|(i, id)| (*id, i.checked_sub(1).map(|p| ids[p]))).collect();
        (ids, links)
    }

    #[test]
    fn test_placement_rejects_cycles() {
        let (ids, links) = chain(3);
        let err = links.check_placement(ids[0], Some(ids[2]), 16).unwrap_err();
        assert_eq!(err.to_string(), "Category parent would create a cycle");
        assert!(links.check_placement(ids[1], Some(ids[1]), 16).is_err());
        links.check_placement(ids[2], Some(ids[0]), 16).unwrap();
        links.check_placement(ids[1], None, 16).unwrap();
        links.check_placement(Uuid::now_v7(), Some(Uuid::now_v7()), 0).unwrap();
    }

    #[test]
    fn test_placement_depth_counts_the_moved_subtree() {
        // 0 <- 1 <- 2 <- 3, plus a separate root 4
        let (ids, mut links) = chain(4);
        let other = Uuid::now_v7();
        links.parents.insert(other, None);

        // a new leaf below ids[3] would have 4 ancestors
        links.check_placement(Uuid::now_v7(), Some(ids[3]), 4).unwrap();
        let err = links.check_placement(Uuid::now_v7(), Some(ids[3]), 3).unwrap_err();
        assert_eq!(err.to_string(), "Category nesting cannot exceed 3 levels");

        // moving ids[1] below `other` leaves ids[3] with 3 ancestors
        links.check_placement(ids[1], Some(other), 3).unwrap();
        assert!(links.check_placement(ids[1], Some(other), 2).is_err());
    }

    #[test]
    fn test_placement_reports_stored_cycle() {
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let links: ParentLinks = [(a, Some(b)), (b, Some(a))].into_iter().collect();
        assert!(matches!(links.check_placement(c, Some(a), 16), Err(StorefrontError::CycleDetected(_))));
    }

    #[test]
    fn test_index_one_level_only() {
        let root = new_category("Electronics", None);
        let phones = new_category("Phones", Some(root.id));
        let smart = new_category("Smartphones", Some(phones.id));
        let all = vec![root.clone(), phones.clone(), smart];
        let index = CategoryIndex::new(&all);
        let node = index.node(root.clone(), true);
        let children = node.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, phones.id);
        assert!(index.node(root, false).children.is_none());
    }
}
