use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};

use super::super::InsertError;
use crate::entities::{reviews, users};

pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_title(
        &self,
        title_id: i32,
    ) -> Result<Vec<(reviews::Model, Option<users::Model>)>> {
        reviews::Entity::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .order_by_asc(reviews::Column::PubDate)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list reviews for title")
    }

    pub async fn get(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Option<(reviews::Model, Option<users::Model>)>> {
        reviews::Entity::find_by_id(review_id)
            .filter(reviews::Column::TitleId.eq(title_id))
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query review")
    }

    /// Fast-path duplicate check; the unique index remains authoritative.
    pub async fn get_by_title_and_author(
        &self,
        title_id: i32,
        author_id: i32,
    ) -> Result<Option<reviews::Model>> {
        reviews::Entity::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .filter(reviews::Column::AuthorId.eq(author_id))
            .one(&self.conn)
            .await
            .context("Failed to query review by title and author")
    }

    pub async fn create(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i16,
    ) -> Result<reviews::Model, InsertError> {
        let active = reviews::ActiveModel {
            title_id: Set(title_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            score: Set(score),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i16>,
    ) -> Result<reviews::Model> {
        let mut active: reviews::ActiveModel = review.into();
        if let Some(text) = text {
            active.text = Set(text);
        }
        if let Some(score) = score {
            active.score = Set(score);
        }
        active.update(&self.conn).await.context("Failed to update review")
    }

    pub async fn delete(&self, review: reviews::Model) -> Result<()> {
        review
            .delete(&self.conn)
            .await
            .context("Failed to delete review")?;
        Ok(())
    }
}
