use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::super::InsertError;
use crate::entities::categories;

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<categories::Model>> {
        let mut query = categories::Entity::find().order_by_asc(categories::Column::Name);
        if let Some(term) = search {
            query = query.filter(categories::Column::Name.eq(term));
        }
        query
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        categories::Entity::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query category by slug")
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<categories::Model, InsertError> {
        let active = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let result = categories::Entity::delete_many()
            .filter(categories::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected > 0)
    }
}
