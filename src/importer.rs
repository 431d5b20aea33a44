//! Offline CSV bulk loader.
//!
//! Loads fixture files from a directory in foreign-key dependency order:
//! users, category, genre, titles, genre_title, review, comments. A missing
//! file is skipped with a warning; bad rows are collected and reported at
//! the end instead of aborting the whole import.

use std::path::Path;

use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::db::Store;
use crate::entities::users::Role;
use crate::entities::{categories, comments, genre_titles, genres, reviews, titles, users};

#[derive(Debug, Default)]
pub struct ImportReport {
    pub loaded: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    role: Role,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    id: i32,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TitleRow {
    id: i32,
    name: String,
    year: i32,
    category: i32,
}

#[derive(Debug, Deserialize)]
struct GenreTitleRow {
    id: i32,
    title_id: i32,
    genre_id: i32,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    id: i32,
    title_id: i32,
    text: String,
    author: i32,
    score: i16,
    pub_date: String,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: i32,
    review_id: i32,
    text: String,
    author: i32,
    pub_date: String,
}

pub async fn import_dir(store: &Store, dir: &Path) -> Result<ImportReport> {
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let mut report = ImportReport::default();

    for row in read_rows::<UserRow>(dir, "users.csv", &mut report)? {
        let active = users::ActiveModel {
            id: Set(row.id),
            username: Set(row.username),
            email: Set(row.email),
            first_name: Set(row.first_name),
            last_name: Set(row.last_name),
            bio: Set(row.bio),
            role: Set(row.role),
            is_superuser: Set(false),
            date_joined: Set(chrono::Utc::now().to_rfc3339()),
        };
        insert(active, &store.conn, "users.csv", &mut report).await;
    }

    for row in read_rows::<SlugRow>(dir, "category.csv", &mut report)? {
        let active = categories::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        };
        insert(active, &store.conn, "category.csv", &mut report).await;
    }

    for row in read_rows::<SlugRow>(dir, "genre.csv", &mut report)? {
        let active = genres::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        };
        insert(active, &store.conn, "genre.csv", &mut report).await;
    }

    for row in read_rows::<TitleRow>(dir, "titles.csv", &mut report)? {
        let active = titles::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            year: Set(row.year),
            description: Set(None),
            category_id: Set(Some(row.category)),
        };
        insert(active, &store.conn, "titles.csv", &mut report).await;
    }

    for row in read_rows::<GenreTitleRow>(dir, "genre_title.csv", &mut report)? {
        let active = genre_titles::ActiveModel {
            id: Set(row.id),
            genre_id: Set(row.genre_id),
            title_id: Set(row.title_id),
        };
        insert(active, &store.conn, "genre_title.csv", &mut report).await;
    }

    for row in read_rows::<ReviewRow>(dir, "review.csv", &mut report)? {
        let active = reviews::ActiveModel {
            id: Set(row.id),
            title_id: Set(row.title_id),
            author_id: Set(row.author),
            text: Set(row.text),
            score: Set(row.score),
            pub_date: Set(row.pub_date),
        };
        insert(active, &store.conn, "review.csv", &mut report).await;
    }

    for row in read_rows::<CommentRow>(dir, "comments.csv", &mut report)? {
        let active = comments::ActiveModel {
            id: Set(row.id),
            review_id: Set(row.review_id),
            author_id: Set(row.author),
            text: Set(row.text),
            pub_date: Set(row.pub_date),
        };
        insert(active, &store.conn, "comments.csv", &mut report).await;
    }

    info!(
        "CSV import finished: {} rows loaded, {} errors",
        report.loaded,
        report.errors.len()
    );
    Ok(report)
}

/// Deserialize every row of `name`, collecting per-row parse errors.
/// A missing file yields no rows.
fn read_rows<T: DeserializeOwned>(
    dir: &Path,
    name: &str,
    report: &mut ImportReport,
) -> Result<Vec<T>> {
    let path = dir.join(name);
    if !path.exists() {
        warn!("{name} not found in {}, skipping", dir.display());
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            // header is line 1, first record line 2
            Err(err) => report.errors.push(format!("{name} line {}: {err}", index + 2)),
        }
    }
    Ok(rows)
}

async fn insert<A>(
    active: A,
    conn: &sea_orm::DatabaseConnection,
    name: &str,
    report: &mut ImportReport,
) where
    A: ActiveModelTrait + sea_orm::ActiveModelBehavior + Send + 'static,
    <A::Entity as sea_orm::EntityTrait>::Model: sea_orm::IntoActiveModel<A>,
{
    if let Err(err) = active.insert(conn).await {
        report.errors.push(format!("{name}: {err}"));
    } else {
        report.loaded += 1;
    }
}
