//! The recipe list a user browses and edits.
//!
//! The catalog keeps a snapshot of every published recipe and filters it locally. Every
//! successful change is followed by a full reload, so the snapshot is always replaced
//! wholesale and never patched.

use larder::{search, Recipe, RecipeForUpload};

use crate::delivery::ContentDelivery;
use crate::errors::SyncError;
use crate::management::ContentManagement;
use crate::models::EntryId;
use crate::sync::{RecipeSync, RecipeUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Operation {
    #[strum(to_string = "Loading")]
    Loading,
    #[strum(to_string = "Creating")]
    Creating,
    #[strum(to_string = "Updating")]
    Updating,
    #[strum(to_string = "Deleting")]
    Deleting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Busy(Operation),
}

pub struct Catalog<D, M> {
    delivery: D,
    sync: RecipeSync<M>,
    recipes: Vec<Recipe>,
    query: String,
    status: Status,
    last_error: Option<String>,
    load_error: Option<String>,
}

impl<D: ContentDelivery, M: ContentManagement> Catalog<D, M> {
    /// An empty catalog; call [`Catalog::refresh`] to load it
    pub fn new(delivery: D, sync: RecipeSync<M>) -> Self {
        Self {
            delivery,
            sync,
            recipes: Vec::new(),
            query: String::new(),
            status: Status::Idle,
            last_error: None,
            load_error: None,
        }
    }

    /// Reload every recipe, replacing the snapshot.
    ///
    /// On failure the previous snapshot stays and the error is kept in `load_error`.
    pub async fn refresh(&mut self) -> bool {
        self.status = Status::Busy(Operation::Loading);
        let result = self.delivery.list_entries().await;
        self.status = Status::Idle;
        match result {
            Ok(recipes) => {
                self.recipes = recipes;
                self.load_error = None;
                true
            }
            Err(err) => {
                tracing::error!("Loading recipes failed: {}", err);
                self.load_error = Some(err.to_string());
                false
            }
        }
    }

    /// Set the search query and reload
    pub async fn search(&mut self, query: impl Into<String>) -> bool {
        self.query = query.into();
        self.refresh().await
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Recipes matching the current query, in store order
    pub fn visible(&self) -> Vec<&Recipe> {
        search::filter_by_title(&self.recipes, &self.query)
    }

    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.recipe_id == id)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The message of the last failed change, until a later change succeeds
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub async fn add(&mut self, recipe: &RecipeForUpload) -> Result<EntryId, SyncError> {
        self.status = Status::Busy(Operation::Creating);
        let result = self.sync.create(recipe).await;
        self.settle(result).await
    }

    pub async fn edit(&mut self, update: &RecipeUpdate) -> Result<(), SyncError> {
        self.status = Status::Busy(Operation::Updating);
        let result = self.sync.update(update).await;
        self.settle(result).await
    }

    pub async fn remove(&mut self, id: &EntryId) -> Result<(), SyncError> {
        self.status = Status::Busy(Operation::Deleting);
        let result = self.sync.delete(id).await;
        self.settle(result).await
    }

    async fn settle<T>(&mut self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        self.status = Status::Idle;
        match &result {
            Ok(_) => {
                self.last_error = None;
                self.refresh().await;
            }
            // Shown next to the form, never retained
            Err(err) if err.is_validation() => {}
            Err(err) => {
                tracing::error!("{}", err);
                self.last_error = Some(err.to_string());
            }
        }
        result
    }
}
