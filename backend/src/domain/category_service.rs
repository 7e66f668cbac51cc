//! Category resolution, rendering and administration.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use super::category::{
    validate_category_name, Category, CategoryStatus, CategoryTree, ChainWalk, WalkStep,
};
use super::ports::{
    CategoryCommand, CategoryQuery, CategoryRepository, CategoryRepositoryError,
    CreateCategoryRequest, UpdateCategoryRequest,
};
use super::{CategoryId, Error, RequestContext, Role};

fn map_repository_error(error: CategoryRepositoryError) -> Error {
    error.into_domain()
}

fn category_not_found(id: impl std::fmt::Display) -> Error {
    Error::not_found(format!("Category with id {id} not found"))
}

/// Category service backed by a [`CategoryRepository`].
#[derive(Clone)]
pub struct CategoryService {
    repository: Arc<dyn CategoryRepository>,
    clock: Arc<dyn Clock>,
}

impl CategoryService {
    /// Build the service.
    pub fn new(repository: Arc<dyn CategoryRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Per-request lookup cache over this service's repository.
    #[must_use]
    pub fn cache(&self) -> CategoryCache<'_> {
        CategoryCache {
            service: self,
            loaded: HashMap::new(),
        }
    }

    /// Resolve a raw id to an ACTIVE category; anything else is `NotFound`.
    pub async fn resolve_active(&self, raw_id: &str) -> Result<Category, Error> {
        let id = CategoryId::parse_existing(raw_id)?;
        self.find_in_status(&id, CategoryStatus::Active).await
    }

    /// Leaf-to-root parent chain of `category`.
    pub async fn flatten_parent_chain(&self, category: Category) -> Result<Vec<Category>, Error> {
        self.cache().flatten_parent_chain(category).await
    }

    async fn find_in_status(
        &self,
        id: &CategoryId,
        status: CategoryStatus,
    ) -> Result<Category, Error> {
        self.repository
            .find(id)
            .await
            .map_err(map_repository_error)?
            .filter(|category| category.status == status)
            .ok_or_else(|| category_not_found(id))
    }

    async fn find_any(&self, raw_id: &str) -> Result<Category, Error> {
        let id = CategoryId::parse_existing(raw_id)?;
        self.repository
            .find(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| category_not_found(id))
    }

    async fn render(&self, category: Category) -> Result<CategoryTree, Error> {
        let chain = self.flatten_parent_chain(category).await?;
        CategoryTree::from_chain(&chain).ok_or_else(|| Error::internal("empty category chain"))
    }

    /// Refuse a parent whose own ancestry already contains `child`.
    async fn ensure_acyclic(&self, child: &CategoryId, parent: Category) -> Result<(), Error> {
        if &parent.id == child {
            return Err(Error::invalid_request("a category cannot be its own parent"));
        }
        let chain = self.flatten_parent_chain(parent).await?;
        if chain.iter().any(|ancestor| &ancestor.id == child) {
            return Err(Error::invalid_request(
                "the requested parent would create a category cycle",
            ));
        }
        Ok(())
    }

    async fn change_status(
        &self,
        ctx: &RequestContext,
        raw_id: &str,
        target: CategoryStatus,
    ) -> Result<(), Error> {
        ctx.require_role(&[Role::Admin])?;
        let mut category = self.find_any(raw_id).await?;
        if category.change_status(target, self.clock.utc())? {
            self.repository
                .update(&category)
                .await
                .map_err(map_repository_error)?;
            info!(category_id = %category.id, status = %target, "category status changed");
        } else {
            info!(category_id = %category.id, status = %target, "category already in requested status");
        }
        Ok(())
    }
}

/// Request-scoped category cache.
///
/// Rendering a page of courses touches the same ancestors repeatedly; the
/// cache loads each category at most once per request.
pub struct CategoryCache<'a> {
    service: &'a CategoryService,
    loaded: HashMap<CategoryId, Option<Category>>,
}

impl CategoryCache<'_> {
    async fn load(&mut self, id: CategoryId) -> Result<Option<Category>, Error> {
        if let Some(hit) = self.loaded.get(&id) {
            return Ok(hit.clone());
        }
        let fetched = self
            .service
            .repository
            .find(&id)
            .await
            .map_err(map_repository_error)?;
        self.loaded.insert(id, fetched.clone());
        Ok(fetched)
    }

    /// Walk parents iteratively to the root, truncating on cycles and missing
    /// parents.
    pub async fn flatten_parent_chain(&mut self, category: Category) -> Result<Vec<Category>, Error> {
        let leaf = category.id;
        let mut walk = ChainWalk::start(category);
        while let WalkStep::Load(parent) = walk.next_step() {
            let loaded = self.load(parent).await?;
            walk.push(parent, loaded);
        }
        if let Some(reason) = walk.truncation() {
            warn!(category_id = %leaf, ?reason, "category parent chain truncated");
        }
        Ok(walk.into_chain())
    }

    /// Nested tree for `id`, or `None` when the category no longer exists.
    pub async fn tree(&mut self, id: CategoryId) -> Result<Option<CategoryTree>, Error> {
        let Some(category) = self.load(id).await? else {
            warn!(category_id = %id, "course references a missing category");
            return Ok(None);
        };
        let chain = self.flatten_parent_chain(category).await?;
        Ok(CategoryTree::from_chain(&chain))
    }

    /// Nested trees for every id that still exists, in input order.
    pub async fn trees(&mut self, ids: &[CategoryId]) -> Result<Vec<CategoryTree>, Error> {
        let mut trees = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tree) = self.tree(*id).await? {
                trees.push(tree);
            }
        }
        Ok(trees)
    }
}

#[async_trait]
impl CategoryQuery for CategoryService {
    async fn list_active(&self) -> Result<Vec<CategoryTree>, Error> {
        let categories = self
            .repository
            .list_by_status(CategoryStatus::Active)
            .await
            .map_err(map_repository_error)?;
        let mut cache = self.cache();
        let mut trees = Vec::with_capacity(categories.len());
        for category in categories {
            let chain = cache.flatten_parent_chain(category).await?;
            trees.extend(CategoryTree::from_chain(&chain));
        }
        Ok(trees)
    }

    async fn get_active(&self, id: &str) -> Result<CategoryTree, Error> {
        let category = self.resolve_active(id).await?;
        self.render(category).await
    }
}

#[async_trait]
impl CategoryCommand for CategoryService {
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateCategoryRequest,
    ) -> Result<CategoryTree, Error> {
        ctx.require_role(&[Role::Admin])?;
        let name = validate_category_name(&request.name)?;
        let parent = match request.parent_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(raw) => Some(self.resolve_active(raw).await?),
            None => None,
        };
        let category = Category::new_inactive(name, parent.map(|p| p.id), self.clock.utc());
        self.repository
            .insert(&category)
            .await
            .map_err(map_repository_error)?;
        info!(category_id = %category.id, "category created");
        self.render(category).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateCategoryRequest,
    ) -> Result<CategoryTree, Error> {
        ctx.require_role(&[Role::Admin])?;
        let mut category = self.resolve_active(id).await?;
        if let Some(name) = request.name.as_deref().filter(|n| !n.trim().is_empty()) {
            category.name = validate_category_name(name)?;
        }
        if let Some(raw_parent) = request.parent_id.as_deref().filter(|p| !p.trim().is_empty()) {
            let parent = self.resolve_active(raw_parent).await?;
            let parent_id = parent.id;
            self.ensure_acyclic(&category.id, parent).await?;
            category.parent_id = Some(parent_id);
        }
        category.updated_at = self.clock.utc();
        self.repository
            .update(&category)
            .await
            .map_err(map_repository_error)?;
        info!(category_id = %category.id, "category updated");
        self.render(category).await
    }

    async fn activate(&self, ctx: &RequestContext, id: &str) -> Result<(), Error> {
        self.change_status(ctx, id, CategoryStatus::Active).await
    }

    async fn deactivate(&self, ctx: &RequestContext, id: &str) -> Result<(), Error> {
        self.change_status(ctx, id, CategoryStatus::Inactive).await
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), Error> {
        self.change_status(ctx, id, CategoryStatus::Deleted).await
    }
}

#[cfg(test)]
#[path = "category_service_tests.rs"]
mod tests;
