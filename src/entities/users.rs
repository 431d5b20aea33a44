use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Privilege tier. `is_superuser` on the model grants admin rights
/// independently of the role value.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "user")]
    User,

    #[sea_orm(string_value = "moderator")]
    Moderator,

    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    #[sea_orm(column_type = "Text")]
    pub bio: String,

    pub role: Role,

    pub is_superuser: bool,

    /// RFC3339, assigned at creation.
    pub date_joined: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,

    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}
