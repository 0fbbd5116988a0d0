//! Request payloads and their validation rules.
//!
//! Validation never touches the database; a payload that fails produces a
//! [`FieldErrors`] map keyed by the JSON field name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_POST_IMAGES: usize = 3;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Key for errors that belong to the body as a whole.
pub const ROOT_FIELD: &str = "_root";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Errors for a body that failed to deserialize. `detail` is the
    /// deserializer's message, optionally prefixed with the path it failed
    /// at (`images: invalid type ...`). Errors are keyed by the top-level
    /// field so they line up with the rule-based checks.
    pub fn from_body_error(detail: &str) -> Self {
        let detail = detail
            .split_once("target type: ")
            .map_or(detail, |(_, rest)| rest);
        let detail = detail
            .rfind(" at line ")
            .map_or(detail, |idx| &detail[..idx])
            .trim();

        let (field, message) = match detail.split_once(": ") {
            Some((path, message)) if is_field_path(path) => (top_level_field(path), message),
            _ => match missing_field(detail) {
                Some(field) => (field, detail),
                None => (ROOT_FIELD, detail),
            },
        };

        let mut errors = FieldErrors::default();
        errors.add(field, message);
        errors
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

fn top_level_field(path: &str) -> &str {
    path.split(['.', '[']).next().unwrap_or(path)
}

fn missing_field(detail: &str) -> Option<&str> {
    detail
        .strip_prefix("missing field `")?
        .split('`')
        .next()
        .filter(|f| !f.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A post payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub restaurant_id: String,
    pub description: Option<String>,
    pub images: Vec<String>,
}

impl CreatePostInput {
    pub fn validate(self) -> Result<NewPost, FieldErrors> {
        let mut errors = FieldErrors::default();

        let restaurant_id = self
            .restaurant_id
            .map(|id| id.trim().to_string())
            .unwrap_or_default();
        if restaurant_id.is_empty() {
            errors.add("restaurantId", "Restaurant id is required");
        }

        if self.images.len() > MAX_POST_IMAGES {
            errors.add(
                "images",
                format!("At most {} images are allowed", MAX_POST_IMAGES),
            );
        }
        if self.images.iter().any(|img| img.trim().is_empty()) {
            errors.add("images", "Image references cannot be empty");
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(ref d) = description {
            if d.chars().count() > MAX_DESCRIPTION_CHARS {
                errors.add(
                    "description",
                    format!(
                        "Description must be {} characters or less",
                        MAX_DESCRIPTION_CHARS
                    ),
                );
            }
        }

        errors.into_result()?;
        Ok(NewPost {
            restaurant_id,
            description,
            images: self.images,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantInput {
    #[serde(default)]
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
}

impl CreateRestaurantInput {
    pub fn validate(mut self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            errors.add("name", "Restaurant name is required");
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            errors.add("latitude", "Latitude must be between -90 and 90");
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            errors.add("longitude", "Longitude must be between -180 and 180");
        }
        self.address = self.address.filter(|a| !a.trim().is_empty());
        self.place_id = self.place_id.filter(|p| !p.trim().is_empty());

        errors.into_result()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[serde(default)]
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl UpdateUserInput {
    pub fn validate(mut self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        self.display_name = self.display_name.trim().to_string();
        let len = self.display_name.chars().count();
        if len == 0 {
            errors.add("displayName", "Display name is required");
        } else if len > MAX_DISPLAY_NAME_CHARS {
            errors.add(
                "displayName",
                format!(
                    "Display name must be {} characters or less",
                    MAX_DISPLAY_NAME_CHARS
                ),
            );
        }

        if let Some(ref avatar) = self.avatar_url {
            let valid = url::Url::parse(avatar)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                errors.add("avatarUrl", "Avatar must be a valid URL");
            }
        }

        errors.into_result()?;
        Ok(self)
    }
}
