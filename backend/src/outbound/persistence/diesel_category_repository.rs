//! PostgreSQL-backed `CategoryRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CategoryRepository, CategoryRepositoryError};
use crate::domain::{Category, CategoryId, CategoryStatus};

use super::diesel_helpers::{classify_diesel_error, collect_rows, map_pool_error_message};
use super::models::{CategoryRow, CategoryUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::categories;

/// Diesel-backed implementation of the `CategoryRepository` port.
#[derive(Clone)]
pub struct DieselCategoryRepository {
    pool: DbPool,
}

impl DieselCategoryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CategoryRepositoryError {
    CategoryRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CategoryRepositoryError {
    match classify_diesel_error(error, "category") {
        Ok(message) => CategoryRepositoryError::query(message),
        Err(message) => CategoryRepositoryError::connection(message),
    }
}

fn row_to_category(row: CategoryRow) -> Result<Category, String> {
    Ok(Category {
        id: CategoryId::from_uuid(row.id),
        name: row.name,
        status: row
            .status
            .parse::<CategoryStatus>()
            .map_err(|err| err.to_string())?,
        parent_id: row.parent_id.map(CategoryId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn category_to_row(category: &Category) -> CategoryRow {
    CategoryRow {
        id: *category.id.as_uuid(),
        name: category.name.clone(),
        status: category.status.as_str().to_owned(),
        parent_id: category.parent_id.map(|parent| *parent.as_uuid()),
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}

#[async_trait]
impl CategoryRepository for DieselCategoryRepository {
    async fn find(&self, id: &CategoryId) -> Result<Option<Category>, CategoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CategoryRow> = categories::table
            .filter(categories::id.eq(id.as_uuid()))
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_category)
            .transpose()
            .map_err(CategoryRepositoryError::query)
    }

    async fn list_by_status(
        &self,
        status: CategoryStatus,
    ) -> Result<Vec<Category>, CategoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CategoryRow> = categories::table
            .filter(categories::status.eq(status.as_str()))
            .select(CategoryRow::as_select())
            .order_by((categories::name, categories::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(
            rows.into_iter().map(row_to_category),
            CategoryRepositoryError::query,
        )
    }

    async fn insert(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(categories::table)
            .values(&category_to_row(category))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = CategoryUpdate {
            name: &category.name,
            status: category.status.as_str(),
            parent_id: category.parent_id.map(|parent| *parent.as_uuid()),
            updated_at: category.updated_at,
        };
        let updated = diesel::update(categories::table)
            .filter(categories::id.eq(category.id.as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(CategoryRepositoryError::query(format!(
                "category {} does not exist",
                category.id
            )));
        }
        Ok(())
    }
}
