use serde_json::Value;

use crate::basic_models::Ingredient;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("ingredients are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a list of ingredients, found {0}")]
    NotAList(&'static str),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Read a stored ingredient list, which is either a JSON array or a string holding one.
pub fn try_parse_ingredients(value: &Value) -> Result<Vec<Ingredient>, ParseError> {
    match value {
        Value::Null => Ok(vec![]),
        Value::Array(_) => Ok(serde_json::from_value(value.clone())?),
        Value::String(text) => match serde_json::from_str::<Value>(text)? {
            parsed @ Value::Array(_) => Ok(serde_json::from_value(parsed)?),
            other => Err(ParseError::NotAList(kind_of(&other))),
        },
        other => Err(ParseError::NotAList(kind_of(other))),
    }
}

/// Like [`try_parse_ingredients`], but anything unreadable becomes an empty list.
///
/// Rows are numbered from zero, so ids are only meaningful for this load.
pub fn parse_ingredients(value: Option<&Value>) -> Vec<Ingredient> {
    let Some(value) = value else {
        return vec![];
    };
    match try_parse_ingredients(value) {
        Ok(ingredients) => IngredientList::from_loaded(ingredients).into_vec(),
        Err(err) => {
            tracing::warn!("Error parsing ingredients: {}", err);
            vec![]
        }
    }
}

/// The ingredient rows of one edit session.
///
/// Each row gets a fresh id from a counter local to the list, which is what rows are
/// addressed by while editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientList {
    rows: Vec<Ingredient>,
    next_id: u32,
}

impl Default for IngredientList {
    /// A new form starts with one blank row
    fn default() -> Self {
        let mut list = Self {
            rows: vec![],
            next_id: 0,
        };
        list.add();
        list
    }
}

impl IngredientList {
    /// Take over loaded ingredients, discarding whatever ids they had.
    pub fn from_loaded(ingredients: impl IntoIterator<Item = Ingredient>) -> Self {
        let mut list = Self {
            rows: vec![],
            next_id: 0,
        };
        for ingredient in ingredients {
            let id = list.take_id();
            list.rows.push(Ingredient { id, ..ingredient });
        }
        list
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append a blank row and return its id
    pub fn add(&mut self) -> u32 {
        let id = self.take_id();
        self.rows.push(Ingredient {
            id,
            ..Default::default()
        });
        id
    }

    fn row_mut(&mut self, id: u32) -> Option<&mut Ingredient> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    pub fn set_name(&mut self, id: u32, name: impl Into<String>) -> bool {
        self.row_mut(id).map(|row| row.name = name.into()).is_some()
    }

    pub fn set_quantity(&mut self, id: u32, quantity: impl Into<String>) -> bool {
        self.row_mut(id)
            .map(|row| row.quantity = quantity.into())
            .is_some()
    }

    /// Remove a row. The last remaining row is never removed.
    pub fn remove(&mut self, id: u32) -> bool {
        if self.rows.len() <= 1 {
            return false;
        }
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    /// Drop rows with neither name nor quantity, keeping at least one row.
    pub fn prune_blank(&mut self) {
        let blank: Vec<u32> = self
            .rows
            .iter()
            .filter(|row| row.is_blank())
            .map(|row| row.id)
            .collect();
        for id in blank {
            self.remove(id);
        }
    }

    /// Back to a single blank row, with ids counting from zero again
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn rows(&self) -> &[Ingredient] {
        &self.rows
    }

    pub fn into_vec(self) -> Vec<Ingredient> {
        self.rows
    }
}
