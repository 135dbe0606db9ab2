use crate::error::{AppError, Result};
use crate::models::{Category, CategoryKind, CreateCategory, UpdateCategory};
use crate::repo::CategoryRepository;
use crate::slug;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Manages the shared category vocabulary communities are filed under.
#[derive(Clone)]
pub struct CategoryService {
    repo: CategoryRepository,
}

impl CategoryService {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            repo: CategoryRepository::new(db),
        }
    }

    pub async fn create(&self, input: CreateCategory) -> Result<Category> {
        let kind = CategoryKind::parse(&input.kind)
            .ok_or_else(|| AppError::Validation(format!("Invalid category kind: {}", input.kind)))?;

        let repo = &self.repo;
        let slug = slug::generate_unique(&input.name, |candidate| async move {
            repo.slug_exists(&candidate, kind, None).await
        })
        .await?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            slug,
            icon_url: input.icon_url,
            kind,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(&category).await?;

        tracing::info!(name = %category.name, kind = %category.kind, "category created");
        Ok(category)
    }

    /// Renames a category. The slug is re-derived with the category itself
    /// excluded from the probe, and `icon_url` is written as given.
    pub async fn update(&self, id: Uuid, input: UpdateCategory) -> Result<Category> {
        let mut category = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        let repo = &self.repo;
        let kind = category.kind;
        category.slug = slug::generate_unique(&input.name, |candidate| async move {
            repo.slug_exists(&candidate, kind, Some(id)).await
        })
        .await?;
        category.name = input.name;
        category.icon_url = input.icon_url;
        category.updated_at = Utc::now();

        self.repo.update(&category).await?;

        tracing::info!(name = %category.name, id = %category.id, "category updated");
        Ok(category)
    }

    /// Deletes a category unless communities are still filed under it.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let category = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        if self.repo.has_communities(id).await? {
            return Err(AppError::Conflict(
                "Cannot delete a category that has communities linked to it.".to_string(),
            ));
        }

        self.repo.delete(id).await?;

        tracing::info!(name = %category.name, id = %category.id, "category deleted");
        Ok(())
    }

    pub async fn list(&self, kind: &str) -> Result<Vec<Category>> {
        let kind = CategoryKind::parse(kind)
            .ok_or_else(|| AppError::Validation(format!("Invalid category kind: {kind}")))?;
        self.repo.list_by_kind(kind).await
    }

    pub async fn get_by_slug(&self, kind: &str, slug: &str) -> Result<Category> {
        let kind = CategoryKind::parse(kind)
            .ok_or_else(|| AppError::Validation(format!("Invalid category kind: {kind}")))?;

        self.repo
            .get_by_slug(slug, kind)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }
}
