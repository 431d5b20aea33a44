use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::super::InsertError;
use crate::entities::users::{self, Role};

/// Fields for a new user record. `date_joined` is assigned here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<users::Model>> {
        let mut query = users::Entity::find().order_by_asc(users::Column::Id);
        if let Some(term) = search {
            query = query.filter(users::Column::Username.contains(term));
        }
        query.all(&self.conn).await.context("Failed to list users")
    }

    pub async fn create(&self, new_user: NewUser) -> Result<users::Model, InsertError> {
        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            bio: Set(new_user.bio),
            role: Set(new_user.role),
            is_superuser: Set(false),
            date_joined: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        Ok(active.insert(&self.conn).await?)
    }

    pub async fn update(
        &self,
        user: users::Model,
        patch: UserPatch,
    ) -> Result<users::Model, InsertError> {
        let mut active: users::ActiveModel = user.into();
        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(bio);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        Ok(active.update(&self.conn).await?)
    }

    pub async fn delete(&self, user: users::Model) -> Result<()> {
        users::Entity::delete_by_id(user.id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }
}
