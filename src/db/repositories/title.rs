use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::collections::HashMap;

use crate::entities::{categories, genre_titles, genres, reviews, titles};

/// List filters; all optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct TitleQuery {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// A title with its read-side associations.
#[derive(Debug, Clone)]
pub struct TitleDetail {
    pub title: titles::Model,
    pub category: Option<categories::Model>,
    pub genres: Vec<genres::Model>,
    /// Rounded average review score, None when unreviewed.
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    /// Replaces the whole genre link set when present.
    pub genre_ids: Option<Vec<i32>>,
}

pub struct TitleRepository {
    conn: DatabaseConnection,
}

impl TitleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<titles::Model>> {
        titles::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query title by id")
    }

    pub async fn get_detail(&self, id: i32) -> Result<Option<TitleDetail>> {
        let Some(title) = self.get(id).await? else {
            return Ok(None);
        };
        let mut details = self.hydrate(vec![title]).await?;
        Ok(details.pop())
    }

    pub async fn list(&self, query: &TitleQuery) -> Result<Vec<TitleDetail>> {
        let mut select = titles::Entity::find().order_by_asc(titles::Column::Name);

        if let Some(name) = &query.name {
            select = select.filter(titles::Column::Name.contains(name));
        }
        if let Some(year) = query.year {
            select = select.filter(titles::Column::Year.eq(year));
        }
        if let Some(slug) = &query.category {
            let category = categories::Entity::find()
                .filter(categories::Column::Slug.eq(slug))
                .one(&self.conn)
                .await
                .context("Failed to resolve category filter")?;
            let Some(category) = category else {
                return Ok(Vec::new());
            };
            select = select.filter(titles::Column::CategoryId.eq(category.id));
        }
        if let Some(slug) = &query.genre {
            let genre = genres::Entity::find()
                .filter(genres::Column::Slug.eq(slug))
                .one(&self.conn)
                .await
                .context("Failed to resolve genre filter")?;
            let Some(genre) = genre else {
                return Ok(Vec::new());
            };
            let linked_ids: Vec<i32> = genre_titles::Entity::find()
                .filter(genre_titles::Column::GenreId.eq(genre.id))
                .select_only()
                .column(genre_titles::Column::TitleId)
                .into_tuple()
                .all(&self.conn)
                .await
                .context("Failed to resolve genre links")?;
            select = select.filter(titles::Column::Id.is_in(linked_ids));
        }

        let titles = select.all(&self.conn).await.context("Failed to list titles")?;
        self.hydrate(titles).await
    }

    pub async fn create(
        &self,
        name: &str,
        year: i32,
        description: Option<String>,
        category_id: i32,
        genre_ids: &[i32],
    ) -> Result<titles::Model> {
        let title = titles::ActiveModel {
            name: Set(name.to_string()),
            year: Set(year),
            description: Set(description),
            category_id: Set(Some(category_id)),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert title")?;

        self.replace_genre_links(title.id, genre_ids).await?;
        Ok(title)
    }

    pub async fn update(&self, title: titles::Model, patch: TitlePatch) -> Result<titles::Model> {
        let title_id = title.id;
        let mut active: titles::ActiveModel = title.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(year) = patch.year {
            active.year = Set(year);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(category_id) = patch.category_id {
            active.category_id = Set(Some(category_id));
        }
        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update title")?;

        if let Some(genre_ids) = patch.genre_ids {
            genre_titles::Entity::delete_many()
                .filter(genre_titles::Column::TitleId.eq(title_id))
                .exec(&self.conn)
                .await
                .context("Failed to clear genre links")?;
            self.replace_genre_links(title_id, &genre_ids).await?;
        }

        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = titles::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete title")?;
        Ok(result.rows_affected > 0)
    }

    async fn replace_genre_links(&self, title_id: i32, genre_ids: &[i32]) -> Result<()> {
        if genre_ids.is_empty() {
            return Ok(());
        }
        let links = genre_ids.iter().map(|genre_id| genre_titles::ActiveModel {
            genre_id: Set(*genre_id),
            title_id: Set(title_id),
            ..Default::default()
        });
        genre_titles::Entity::insert_many(links)
            .exec(&self.conn)
            .await
            .context("Failed to insert genre links")?;
        Ok(())
    }

    /// Attach category, genres and rating to a page of titles.
    async fn hydrate(&self, titles: Vec<titles::Model>) -> Result<Vec<TitleDetail>> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        let title_ids: Vec<i32> = titles.iter().map(|t| t.id).collect();

        let category_ids: Vec<i32> = titles.iter().filter_map(|t| t.category_id).collect();
        let categories_by_id: HashMap<i32, categories::Model> = categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.conn)
            .await
            .context("Failed to load categories for titles")?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut genres_by_title: HashMap<i32, Vec<genres::Model>> = HashMap::new();
        let links = genre_titles::Entity::find()
            .filter(genre_titles::Column::TitleId.is_in(title_ids.clone()))
            .find_also_related(genres::Entity)
            .all(&self.conn)
            .await
            .context("Failed to load genres for titles")?;
        for (link, genre) in links {
            if let Some(genre) = genre {
                genres_by_title.entry(link.title_id).or_default().push(genre);
            }
        }

        let score_rows: Vec<(i32, i16)> = reviews::Entity::find()
            .filter(reviews::Column::TitleId.is_in(title_ids))
            .select_only()
            .column(reviews::Column::TitleId)
            .column(reviews::Column::Score)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load review scores for titles")?;
        let mut score_sums: HashMap<i32, (i64, i64)> = HashMap::new();
        for (title_id, score) in score_rows {
            let entry = score_sums.entry(title_id).or_insert((0, 0));
            entry.0 += i64::from(score);
            entry.1 += 1;
        }

        Ok(titles
            .into_iter()
            .map(|title| {
                let category = title
                    .category_id
                    .and_then(|id| categories_by_id.get(&id).cloned());
                let genres = genres_by_title.remove(&title.id).unwrap_or_default();
                #[allow(clippy::cast_possible_truncation)]
                let rating = score_sums.get(&title.id).map(|(sum, count)| {
                    (*sum as f64 / *count as f64).round() as i32
                });
                TitleDetail {
                    title,
                    category,
                    genres,
                    rating,
                }
            })
            .collect())
    }
}
