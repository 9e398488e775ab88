//! Pre-flight checks for recipe forms.
//!
//! Checks run in a fixed order and the first violated rule is reported, so a form can
//! show one message at a time. Nothing here touches the network.

use crate::basic_models::Ingredient;

pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 600;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required.")]
    TitleRequired,
    #[error("Description must be at least {} characters.", DESCRIPTION_MIN_CHARS)]
    DescriptionTooShort,
    #[error("Description must not exceed {} characters.", DESCRIPTION_MAX_CHARS)]
    DescriptionTooLong,
    #[error("At least one complete ingredient (with both name and quantity) is required.")]
    NoCompleteIngredient,
}

/// Validate the editable fields of a recipe.
pub fn validate_recipe(
    title: &str,
    description: &str,
    ingredients: &[Ingredient],
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    // Counted in UTF-16 units, untrimmed, as a browser counts a textarea
    let description_len = description.encode_utf16().count();
    if description_len < DESCRIPTION_MIN_CHARS {
        return Err(ValidationError::DescriptionTooShort);
    }
    if description_len > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }
    if !ingredients.iter().any(Ingredient::is_complete) {
        return Err(ValidationError::NoCompleteIngredient);
    }
    Ok(())
}
