use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::super::InsertError;
use crate::entities::genres;

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<genres::Model>> {
        let mut query = genres::Entity::find().order_by_asc(genres::Column::Name);
        if let Some(term) = search {
            query = query.filter(genres::Column::Name.eq(term));
        }
        query.all(&self.conn).await.context("Failed to list genres")
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        genres::Entity::find()
            .filter(genres::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query genre by slug")
    }

    /// Resolve a set of slugs, preserving request order. Unknown slugs are
    /// reported by name so the caller can produce a field-level error.
    pub async fn get_by_slugs(&self, slugs: &[String]) -> Result<Result<Vec<genres::Model>, String>> {
        let found = genres::Entity::find()
            .filter(genres::Column::Slug.is_in(slugs.iter().cloned()))
            .all(&self.conn)
            .await
            .context("Failed to query genres by slugs")?;

        let mut resolved = Vec::with_capacity(slugs.len());
        for slug in slugs {
            match found.iter().find(|g| &g.slug == slug) {
                Some(genre) => resolved.push(genre.clone()),
                None => return Ok(Err(slug.clone())),
            }
        }
        Ok(Ok(resolved))
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<genres::Model, InsertError> {
        let active = genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let result = genres::Entity::delete_many()
            .filter(genres::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete genre")?;
        Ok(result.rows_affected > 0)
    }
}
