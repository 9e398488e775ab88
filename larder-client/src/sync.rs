//! Multi-step create, update and delete of recipes against the management API.
//!
//! Each workflow validates locally first, then makes its remote calls strictly in order.
//! Anything that fails part way is reported with the step it failed at.

use larder::{ImageForUpload, Ingredient, RecipeForUpload, ValidationError};
use serde_json::{json, Value};

use crate::config::ContentStoreConfig;
use crate::errors::{ClientError, RemoteStep, SyncError};
use crate::management::ContentManagement;
use crate::models::{localized_fields, Asset, AssetId, EntryId, Fields};

/// What an update does to the recipe's image
#[derive(Debug, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(ImageForUpload),
}

/// New values for an existing recipe
#[derive(Debug)]
pub struct RecipeUpdate {
    pub entry_id: EntryId,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub image: ImageChange,
}

impl RecipeUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        larder::validate_recipe(&self.title, &self.description, &self.ingredients)
    }
}

struct StepFailure {
    step: RemoteStep,
    source: ClientError,
}

trait AtStep<T> {
    fn at(self, step: RemoteStep) -> Result<T, StepFailure>;
}

impl<T> AtStep<T> for Result<T, ClientError> {
    fn at(self, step: RemoteStep) -> Result<T, StepFailure> {
        self.map_err(|source| StepFailure { step, source })
    }
}

fn ingredients_value(ingredients: &[Ingredient]) -> Value {
    Value::Array(
        ingredients
            .iter()
            .filter(|ingredient| !ingredient.is_blank())
            .map(|ingredient| json!({"name": ingredient.name, "quantity": ingredient.quantity}))
            .collect(),
    )
}

fn image_link(id: &AssetId) -> Value {
    json!({"sys": {"type": "Link", "linkType": "Asset", "id": id.as_str()}})
}

/// Runs recipe workflows against a management backend.
pub struct RecipeSync<M> {
    store: M,
    content_type: String,
    locale: String,
}

impl<M: ContentManagement> RecipeSync<M> {
    pub fn new(store: M, config: &ContentStoreConfig) -> Self {
        Self {
            store,
            content_type: config.content_type.clone(),
            locale: config.locale.clone(),
        }
    }

    fn text_fields(
        title: &str,
        description: &str,
        ingredients: &[Ingredient],
    ) -> [(&'static str, Value); 3] {
        [
            ("title", Value::from(title)),
            ("description", Value::from(description)),
            ("ingredients", ingredients_value(ingredients)),
        ]
    }

    /// Create and publish a recipe, with its image if it has one.
    ///
    /// The image is uploaded, processed and published before the entry is created, so the
    /// published entry never links to an image that isn't live.
    pub async fn create(&self, recipe: &RecipeForUpload) -> Result<EntryId, SyncError> {
        recipe.validate()?;
        let mut orphan = None;
        let result = self.try_create(recipe, &mut orphan).await;
        match result {
            Ok(id) => {
                tracing::info!("Created recipe {} ({})", id, recipe.title);
                Ok(id)
            }
            Err(StepFailure { step, source }) => {
                tracing::warn!("Creating {} failed while {}: {}", recipe.title, step, source);
                if let Some(asset) = &orphan {
                    tracing::warn!("Asset {} is not linked from any recipe", asset);
                }
                Err(SyncError::Create {
                    step,
                    orphaned_asset: orphan,
                    source,
                })
            }
        }
    }

    async fn try_create(
        &self,
        recipe: &RecipeForUpload,
        orphan: &mut Option<AssetId>,
    ) -> Result<EntryId, StepFailure> {
        let image = match &recipe.image {
            Some(file) => Some(self.publish_new_image(&recipe.title, file, orphan).await?),
            None => None,
        };

        let mut values =
            Self::text_fields(&recipe.title, &recipe.description, &recipe.ingredients).to_vec();
        if let Some(asset) = &image {
            values.push(("image", image_link(&asset.id())));
        }
        let fields: Fields = localized_fields(&self.locale, values);

        let entry = self
            .store
            .create_entry(&self.content_type, fields)
            .await
            .at(RemoteStep::CreateEntry)?;
        *orphan = None;
        let entry = self
            .store
            .publish_entry(&entry)
            .await
            .at(RemoteStep::PublishEntry)?;
        Ok(entry.id())
    }

    async fn publish_new_image(
        &self,
        title: &str,
        file: &ImageForUpload,
        orphan: &mut Option<AssetId>,
    ) -> Result<Asset, StepFailure> {
        let asset = self
            .store
            .create_asset_from_file(&format!("Image for {title}"), file, &self.locale)
            .await
            .at(RemoteStep::UploadAsset)?;
        *orphan = Some(asset.id());
        tracing::info!("Created asset {} for {}", asset.sys.id, file.file_name);

        let asset = self
            .store
            .process_asset(&asset, &self.locale)
            .await
            .at(RemoteStep::ProcessAsset)?;
        self.store
            .publish_asset(&asset)
            .await
            .at(RemoteStep::PublishAsset)
    }

    /// Reuse an asset with the same file name if there is one, otherwise upload.
    async fn resolve_image(
        &self,
        title: &str,
        file: &ImageForUpload,
        orphan: &mut Option<AssetId>,
    ) -> Result<Asset, StepFailure> {
        let found = self
            .store
            .find_assets_by_file_name(&file.file_name, 1)
            .await
            .at(RemoteStep::FindAsset)?;
        let Some(asset) = found.into_iter().next() else {
            return self.publish_new_image(title, file, orphan).await;
        };
        tracing::info!("Reusing asset {} for {}", asset.sys.id, file.file_name);
        if asset.is_published() {
            return Ok(asset);
        }
        let asset = if asset.is_processed(&self.locale) {
            asset
        } else {
            self.store
                .process_asset(&asset, &self.locale)
                .await
                .at(RemoteStep::ProcessAsset)?
        };
        self.store
            .publish_asset(&asset)
            .await
            .at(RemoteStep::PublishAsset)
    }

    /// Overwrite a recipe's fields and republish it.
    ///
    /// The entry is fetched fresh so the write is based on its current version, and any
    /// field this crate doesn't manage is sent back untouched.
    pub async fn update(&self, update: &RecipeUpdate) -> Result<(), SyncError> {
        update.validate()?;
        let mut orphan = None;
        let result = self.try_update(update, &mut orphan).await;
        match result {
            Ok(()) => {
                tracing::info!("Updated recipe {}", update.entry_id);
                Ok(())
            }
            Err(StepFailure { step, source }) => {
                tracing::warn!(
                    "Updating {} failed while {}: {}",
                    update.entry_id,
                    step,
                    source
                );
                Err(SyncError::Update {
                    step,
                    orphaned_asset: orphan,
                    source,
                })
            }
        }
    }

    async fn try_update(
        &self,
        update: &RecipeUpdate,
        orphan: &mut Option<AssetId>,
    ) -> Result<(), StepFailure> {
        let mut entry = self
            .store
            .get_entry(&update.entry_id)
            .await
            .at(RemoteStep::FetchEntry)?;

        if let ImageChange::Replace(file) = &update.image {
            let asset = self.resolve_image(&update.title, file, orphan).await?;
            entry.set_field("image", &self.locale, image_link(&asset.id()));
        }
        for (name, value) in
            Self::text_fields(&update.title, &update.description, &update.ingredients)
        {
            entry.set_field(name, &self.locale, value);
        }

        let entry = self
            .store
            .update_entry(&entry)
            .await
            .at(RemoteStep::UpdateEntry)?;
        *orphan = None;
        self.store
            .publish_entry(&entry)
            .await
            .at(RemoteStep::PublishEntry)?;
        Ok(())
    }

    /// Remove a recipe and the image it links to.
    ///
    /// The image goes before the entry, so a failure leaves the entry in place and the
    /// delete can be retried. An image that's already gone is skipped, and so is one that
    /// another recipe still links to.
    pub async fn delete(&self, id: &EntryId) -> Result<(), SyncError> {
        match self.try_delete(id).await {
            Ok(()) => {
                tracing::info!("Deleted recipe {}", id);
                Ok(())
            }
            Err(StepFailure { step, source }) => {
                tracing::warn!("Deleting {} failed while {}: {}", id, step, source);
                Err(SyncError::Delete { step, source })
            }
        }
    }

    async fn try_delete(&self, id: &EntryId) -> Result<(), StepFailure> {
        let mut entry = self
            .store
            .get_entry(id)
            .await
            .at(RemoteStep::FetchEntry)?;
        if entry.is_published() {
            entry = self
                .store
                .unpublish_entry(&entry)
                .await
                .at(RemoteStep::UnpublishEntry)?;
        }
        if let Some(asset_id) = entry.linked_asset("image", &self.locale) {
            self.remove_image(&asset_id, id).await?;
        }
        self.store
            .delete_entry(&entry)
            .await
            .at(RemoteStep::DeleteEntry)
    }

    async fn remove_image(&self, id: &AssetId, owner: &EntryId) -> Result<(), StepFailure> {
        let mut asset = match self.store.get_asset(id).await {
            Ok(asset) => asset,
            Err(err) if err.is_not_found() => {
                tracing::warn!("Image {} is already gone, skipping it", id);
                return Ok(());
            }
            Err(err) => return Err(err).at(RemoteStep::FetchAsset),
        };
        // Reuse by file name lets several recipes share one image
        let linking = self
            .store
            .find_entries_linking(id)
            .await
            .at(RemoteStep::FindLinks)?;
        if let Some(other) = linking.iter().find(|entry| entry.id() != *owner) {
            tracing::warn!("Image {} is still used by {}, keeping it", id, other.sys.id);
            return Ok(());
        }
        if asset.is_published() {
            asset = self
                .store
                .unpublish_asset(&asset)
                .await
                .at(RemoteStep::UnpublishAsset)?;
        }
        self.store
            .delete_asset(&asset)
            .await
            .at(RemoteStep::DeleteAsset)
    }
}
