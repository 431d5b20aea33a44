use crate::entities::prelude::*;
use crate::entities::{comments, reviews, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Categories)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Genres)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Titles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(GenreTitles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Reviews)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Comments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One review per (title, author). The API pre-checks this for a
        // friendlier message; the index is the authoritative guard under
        // concurrent creates.
        manager
            .create_index(
                Index::create()
                    .name("idx-reviews-title-author-unique")
                    .table(Reviews)
                    .col(reviews::Column::TitleId)
                    .col(reviews::Column::AuthorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // No exact-duplicate comment on the same review.
        manager
            .create_index(
                Index::create()
                    .name("idx-comments-review-text-unique")
                    .table(Comments)
                    .col(comments::Column::ReviewId)
                    .col(comments::Column::Text)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Seed a superuser so a fresh install has a working admin account.
        // It authenticates through the normal signup-resend + token flow.
        let now = chrono::Utc::now().to_rfc3339();
        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::Email,
                users::Column::FirstName,
                users::Column::LastName,
                users::Column::Bio,
                users::Column::Role,
                users::Column::IsSuperuser,
                users::Column::DateJoined,
            ])
            .values_panic([
                "admin".into(),
                "admin@reviewarr.local".into(),
                "".into(),
                "".into(),
                "".into(),
                "admin".into(),
                true.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GenreTitles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Titles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genres).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
