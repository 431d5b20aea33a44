use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::genre_titles::Entity")]
    GenreTitles,
}

impl Related<super::genre_titles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GenreTitles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
