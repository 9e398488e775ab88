pub mod basic_models;
pub mod ingredients;
pub mod search;
pub mod validation;

pub use basic_models::{ImageForUpload, ImageRef, Ingredient, Recipe, RecipeForUpload};
pub use ingredients::{parse_ingredients, IngredientList, ParseError};
pub use validation::{validate_recipe, ValidationError};
