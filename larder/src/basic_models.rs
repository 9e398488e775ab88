use serde::{Deserialize, Serialize};

use crate::validation::{validate_recipe, ValidationError};

/// One line of a recipe's ingredient list.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Ingredient {
    /// Row key for a single edit session. Never stored remotely, renumbered on every load.
    #[serde(skip)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            quantity: quantity.into(),
        }
    }

    /// Both name and quantity are filled in
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.quantity.trim().is_empty()
    }

    /// Neither name nor quantity is filled in
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.quantity.trim().is_empty()
    }
}

/// A raw image file, as picked by the user, before it becomes a remote asset.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ImageForUpload {
    pub content_type: String,
    pub file_name: String,
    pub content_bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageForUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageForUpload")
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .field("content_bytes", &self.content_bytes.len())
            .finish()
    }
}

impl ImageForUpload {
    /// Guess the content type from the file extension, for when the caller doesn't know it.
    pub fn guess_content_type(file_name: &str) -> &'static str {
        match file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("svg") => "image/svg+xml",
            Some("webp") => "image/webp",
            Some("avif") => "image/avif",
            _ => "application/octet-stream",
        }
    }
}

/// Everything needed to create a recipe
#[derive(Deserialize, Serialize, Clone)]
pub struct RecipeForUpload {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub image: Option<ImageForUpload>,
}

impl std::fmt::Debug for RecipeForUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeForUpload")
            .field("title", &self.title)
            .field("description", &self.description.len())
            .field("ingredients", &self.ingredients)
            .field("image", &self.image)
            .finish()
    }
}

impl RecipeForUpload {
    /// Check the recipe the way the entry form does, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_recipe(&self.title, &self.description, &self.ingredients)
    }
}

/// A link from a recipe to its published image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub asset_id: String,
    /// Absolute URL, when the store has resolved the asset
    pub url: Option<String>,
    pub title: Option<String>,
}

/// A recipe as listed from the content store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub recipe_id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub image: Option<ImageRef>,
}
