use sea_orm::entity::prelude::*;

/// One review per (title, author); enforced by a composite unique index
/// created in the initial migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title_id: i32,

    pub author_id: i32,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// 1..=10, validated at the API boundary.
    pub score: i16,

    /// RFC3339, assigned at creation.
    pub pub_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::titles::Entity",
        from = "Column::TitleId",
        to = "super::titles::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Title,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::titles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Title.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
