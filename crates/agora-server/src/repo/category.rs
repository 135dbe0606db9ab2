use crate::error::{AppError, Result};
use crate::models::{Category, CategoryKind};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Data access for the shared category vocabulary. All writes here are
/// single rows, so they run straight on the pool.
#[derive(Clone)]
pub struct CategoryRepository {
    db: SqlitePool,
}

impl CategoryRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, icon_url, kind, created_at, updated_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn get_by_slug(&self, slug: &str, kind: CategoryKind) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, icon_url, kind, created_at, updated_at
            FROM categories
            WHERE slug = ? AND kind = ?
            "#,
        )
        .bind(slug)
        .bind(kind)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    pub async fn list_by_kind(&self, kind: CategoryKind) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, icon_url, kind, created_at, updated_at
            FROM categories
            WHERE kind = ?
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .bind(kind)
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    /// Slug probe scoped to one kind, optionally ignoring the row being
    /// renamed.
    pub async fn slug_exists(
        &self,
        slug: &str,
        kind: CategoryKind,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE slug = ?1 AND kind = ?2 AND (?3 IS NULL OR id != ?3)
            )
            "#,
        )
        .bind(slug)
        .bind(kind)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn insert(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, icon_url, kind, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.icon_url)
        .bind(category.kind)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.db)
        .await
        .map_err(AppError::conflict_on_unique(
            "A category with this slug already exists for this kind.",
        ))?;

        Ok(())
    }

    pub async fn update(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, icon_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.icon_url)
        .bind(category.updated_at)
        .bind(category.id)
        .execute(&self.db)
        .await
        .map_err(AppError::conflict_on_unique(
            "A category with this slug already exists for this kind.",
        ))?;

        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn has_communities(&self, id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE category_id = ?)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }
}
