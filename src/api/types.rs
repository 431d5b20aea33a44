use serde::{Deserialize, Serialize};

use crate::db::TitleDetail;
use crate::entities::users::Role;
use crate::entities::{categories, comments, genres, reviews, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<users::Model> for UserDto {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for CategoryDto {
    fn from(category: categories::Model) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenreDto {
    pub name: String,
    pub slug: String,
}

impl From<genres::Model> for GenreDto {
    fn from(genre: genres::Model) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleDto {
    pub id: i32,
    pub name: String,
    pub year: i32,
    /// Rounded average review score; null until the first review.
    pub rating: Option<i32>,
    pub description: Option<String>,
    pub genre: Vec<GenreDto>,
    pub category: Option<CategoryDto>,
}

impl From<TitleDetail> for TitleDto {
    fn from(detail: TitleDetail) -> Self {
        Self {
            id: detail.title.id,
            name: detail.title.name,
            year: detail.title.year,
            rating: detail.rating,
            description: detail.title.description,
            genre: detail.genres.into_iter().map(GenreDto::from).collect(),
            category: detail.category.map(CategoryDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub score: i16,
    pub pub_date: String,
}

impl From<(reviews::Model, Option<users::Model>)> for ReviewDto {
    fn from((review, author): (reviews::Model, Option<users::Model>)) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: author.map(|a| a.username).unwrap_or_default(),
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: String,
}

impl From<(comments::Model, Option<users::Model>)> for CommentDto {
    fn from((comment, author): (comments::Model, Option<users::Model>)) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: author.map(|a| a.username).unwrap_or_default(),
            pub_date: comment.pub_date,
        }
    }
}

/// Signup response: the accepted identity, echoed back.
#[derive(Debug, Serialize)]
pub struct SignupDto {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenDto {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}
