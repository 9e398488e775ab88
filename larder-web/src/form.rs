use axum::extract::Multipart;
use itertools::Itertools;
use larder::{ImageForUpload, IngredientList, Recipe, RecipeForUpload};
use larder_client::{EntryId, ImageChange, RecipeUpdate};
use serde::Serialize;

use crate::errors::WebResult;

/// The recipe form as submitted, or as pre-filled for editing.
#[derive(Debug, Clone, Default)]
pub struct RecipeForm {
    pub title: String,
    pub description: String,
    pub ingredients: IngredientList,
    pub image: Option<ImageForUpload>,
}

/// What the templates need to redraw the form
#[derive(Debug, Serialize)]
pub struct FormView {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<larder::Ingredient>,
}

impl RecipeForm {
    /// Read a multipart submission.
    ///
    /// Ingredient names and quantities arrive as repeated `ingredient_name` and
    /// `ingredient_quantity` fields and are paired in order. An image part without a file
    /// name or without content means no image was picked.
    pub async fn from_multipart(mut multipart: Multipart) -> WebResult<Self> {
        let mut text_fields = vec![];
        let mut image = None;
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if file_name.is_empty() || bytes.is_empty() {
                    continue;
                }
                let content_type = content_type
                    .filter(|ct| ct.starts_with("image/"))
                    .unwrap_or_else(|| ImageForUpload::guess_content_type(&file_name).into());
                tracing::debug!("Received image {} ({} bytes)", file_name, bytes.len());
                image = Some(ImageForUpload {
                    content_type,
                    file_name,
                    content_bytes: bytes.to_vec(),
                });
            } else {
                text_fields.push((name, field.text().await?));
            }
        }
        Ok(Self::from_fields(text_fields, image))
    }

    pub fn from_fields(
        fields: impl IntoIterator<Item = (String, String)>,
        image: Option<ImageForUpload>,
    ) -> Self {
        let mut form = RecipeForm {
            image,
            ..Default::default()
        };
        let mut names = vec![];
        let mut quantities = vec![];
        for (name, value) in fields {
            match name.as_str() {
                "title" => form.title = value,
                "description" => form.description = value,
                "ingredient_name" => names.push(value),
                "ingredient_quantity" => quantities.push(value),
                other => tracing::debug!("Ignoring form field {}", other),
            }
        }

        let mut ingredients = IngredientList::from_loaded(Vec::new());
        for (name, quantity) in names
            .into_iter()
            .zip_longest(quantities)
            .map(|pair| pair.or_default())
        {
            let id = ingredients.add();
            ingredients.set_name(id, name.trim());
            ingredients.set_quantity(id, quantity.trim());
        }
        ingredients.prune_blank();
        if ingredients.rows().is_empty() {
            ingredients.reset();
        }
        form.ingredients = ingredients;
        form
    }

    /// Pre-fill the form from a listed recipe. The image is kept unless a new one is sent.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let ingredients = if recipe.ingredients.is_empty() {
            IngredientList::default()
        } else {
            IngredientList::from_loaded(recipe.ingredients.iter().cloned())
        };
        RecipeForm {
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            ingredients,
            image: None,
        }
    }

    /// The form for display, with one spare blank row to type into
    pub fn view(&self) -> FormView {
        let mut rows = self.ingredients.clone();
        if rows.rows().iter().all(|row| !row.is_blank()) {
            rows.add();
        }
        FormView {
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: rows.into_vec(),
        }
    }

    pub fn to_upload(&self) -> RecipeForUpload {
        RecipeForUpload {
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: self.ingredients.rows().to_vec(),
            image: self.image.clone(),
        }
    }

    pub fn to_update(&self, entry_id: EntryId) -> RecipeUpdate {
        RecipeUpdate {
            entry_id,
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: self.ingredients.rows().to_vec(),
            image: match &self.image {
                Some(image) => ImageChange::Replace(image.clone()),
                None => ImageChange::Keep,
            },
        }
    }
}
