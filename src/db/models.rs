use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "u.id, u.email, u.display_name, u.avatar_url, u.created_at, u.updated_at";

    /// Maps a row selected with [`User::COLUMNS`] starting at `offset`.
    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            email: row.get(offset + 1)?,
            display_name: row.get(offset + 2)?,
            avatar_url: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
            updated_at: row.get(offset + 5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
    pub created_at: String,
}

impl Restaurant {
    pub const COLUMNS: &'static str =
        "r.id, r.name, r.address, r.latitude, r.longitude, r.place_id, r.created_at";

    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            address: row.get(offset + 2)?,
            latitude: row.get(offset + 3)?,
            longitude: row.get(offset + 4)?,
            place_id: row.get(offset + 5)?,
            created_at: row.get(offset + 6)?,
        })
    }
}

/// A post joined with its author and restaurant, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub likes_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub user: User,
    pub restaurant: Restaurant,
    #[serde(default)]
    pub is_liked: bool,
}

impl Post {
    pub const COLUMNS: &'static str = "p.id, p.user_id, p.restaurant_id, p.description, p.images, \
         p.likes_count, p.created_at, p.updated_at";

    /// Maps a row of `Post::COLUMNS, User::COLUMNS, Restaurant::COLUMNS, is_liked`.
    pub fn from_joined_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let images_json: String = row.get(4)?;
        let images = serde_json::from_str(&images_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            restaurant_id: row.get(2)?,
            description: row.get(3)?,
            images,
            likes_count: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            user: User::from_row(row, 8)?,
            restaurant: Restaurant::from_row(row, 14)?,
            is_liked: row.get(21)?,
        })
    }
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}
