use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};

use super::super::InsertError;
use crate::entities::{comments, users};

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_review(
        &self,
        review_id: i32,
    ) -> Result<Vec<(comments::Model, Option<users::Model>)>> {
        comments::Entity::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .order_by_asc(comments::Column::PubDate)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list comments for review")
    }

    pub async fn get(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<(comments::Model, Option<users::Model>)>> {
        comments::Entity::find_by_id(comment_id)
            .filter(comments::Column::ReviewId.eq(review_id))
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query comment")
    }

    pub async fn create(
        &self,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<comments::Model, InsertError> {
        let active = comments::ActiveModel {
            review_id: Set(review_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(
        &self,
        comment: comments::Model,
        text: String,
    ) -> Result<comments::Model, InsertError> {
        let mut active: comments::ActiveModel = comment.into();
        active.text = Set(text);
        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, comment: comments::Model) -> Result<()> {
        comment
            .delete(&self.conn)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }
}
