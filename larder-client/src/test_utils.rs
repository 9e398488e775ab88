//! An in-memory content store for unit tests.
//!
//! It enforces the same rules the hosted store does where the workflow depends on them:
//! writes must carry the current version, published resources cannot be deleted, an
//! asset must be processed before it is published, and an entry cannot be published
//! while it links an unpublished asset. Every call is recorded in order.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use larder::{parse_ingredients, ImageForUpload, ImageRef, Recipe};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::delivery::ContentDelivery;
use crate::errors::{ClientError, ClientResult};
use crate::management::ContentManagement;
use crate::models::{
    localized_fields, Asset, AssetFile, AssetId, Entry, EntryId, Fields, Link, Sys,
};

pub const LOCALE: &str = "en-US";

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    assets: BTreeMap<String, Asset>,
    next_id: u32,
    calls: Vec<String>,
    fail_on: Option<&'static str>,
    never_process: bool,
}

impl State {
    fn record(&mut self, op: &'static str, target: &str) -> ClientResult<()> {
        self.calls.push(format!("{op} {target}"));
        if self.fail_on == Some(op) {
            return Err(ClientError::Unexpected(format!("{op} failed (test)")));
        }
        Ok(())
    }

    fn new_sys(&mut self, prefix: &str) -> Sys {
        self.next_id += 1;
        Sys {
            id: format!("{prefix}-{:03}", self.next_id),
            version: 1,
            published_version: None,
        }
    }
}

fn conflict(id: &str) -> ClientError {
    ClientError::Status {
        status: StatusCode::CONFLICT,
        body: format!("VersionMismatch for {id}"),
    }
}

fn rejected(status: StatusCode, body: String) -> ClientError {
    ClientError::Status { status, body }
}

fn check_version(current: &Sys, sent: &Sys) -> ClientResult<()> {
    if current.version != sent.version {
        return Err(conflict(&current.id));
    }
    Ok(())
}

fn publish(sys: &mut Sys) {
    sys.published_version = Some(sys.version);
    sys.version += 1;
}

fn unpublish(sys: &mut Sys) {
    sys.published_version = None;
    sys.version += 1;
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of this operation fail
    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().unwrap().fail_on = Some(op);
    }

    /// Uploaded assets never finish processing
    pub fn never_process(&self) {
        self.state.lock().unwrap().never_process = true;
    }

    /// Operation names in call order, without their targets
    pub fn ops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn entry(&self, id: &str) -> Option<Entry> {
        self.state.lock().unwrap().entries.get(id).cloned()
    }

    pub fn asset(&self, id: &str) -> Option<Asset> {
        self.state.lock().unwrap().assets.get(id).cloned()
    }

    pub fn asset_count(&self) -> usize {
        self.state.lock().unwrap().assets.len()
    }

    /// Put a processed asset in the store
    pub fn seed_asset(&self, id: &str, file_name: &str, published: bool) {
        let url = format!("//images.test/{id}/{file_name}");
        self.insert_asset(id, file_name, Some(url), published);
    }

    /// Put an asset whose file was uploaded but never processed in the store
    pub fn seed_unprocessed_asset(&self, id: &str, file_name: &str) {
        self.insert_asset(id, file_name, None, false);
    }

    fn insert_asset(&self, id: &str, file_name: &str, url: Option<String>, published: bool) {
        let file = AssetFile {
            content_type: "image/png".into(),
            file_name: file_name.into(),
            upload_from: url.is_none().then(|| Link::upload("upload-0")),
            url,
        };
        let mut sys = Sys {
            id: id.into(),
            version: 3,
            published_version: None,
        };
        if published {
            publish(&mut sys);
        }
        let fields = localized_fields(
            LOCALE,
            [
                ("title", json!(format!("Image {id}"))),
                ("file", serde_json::to_value(file).unwrap()),
            ],
        );
        self.state
            .lock()
            .unwrap()
            .assets
            .insert(id.into(), Asset { sys, fields });
    }

    /// Put a recipe entry in the store
    pub fn seed_entry(&self, id: &str, title: &str, image: Option<&str>, published: bool) {
        let mut values = vec![
            ("title", json!(title)),
            (
                "description",
                json!("A recipe that has been in the family for years."),
            ),
            ("ingredients", json!([{"name": "Water", "quantity": "1L"}])),
        ];
        if let Some(image) = image {
            values.push((
                "image",
                serde_json::to_value(Link::asset(&AssetId::from(image))).unwrap(),
            ));
        }
        let mut sys = Sys {
            id: id.into(),
            version: 5,
            published_version: None,
        };
        if published {
            publish(&mut sys);
        }
        let fields = localized_fields(LOCALE, values);
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(id.into(), Entry { sys, fields });
    }

    /// Someone else edits the entry, bumping its version
    pub fn edit_remotely(&self, id: &str, field: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        let entry = state.entries.get_mut(id).unwrap();
        entry.set_field(field, LOCALE, value);
        entry.sys.version += 1;
    }
}

#[async_trait]
impl ContentManagement for InMemoryStore {
    async fn get_entry(&self, id: &EntryId) -> ClientResult<Entry> {
        let mut state = self.state.lock().unwrap();
        state.record("get_entry", id.as_str())?;
        state
            .entries
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("entry {id}")))
    }

    async fn create_entry(&self, _content_type: &str, fields: Fields) -> ClientResult<Entry> {
        let mut state = self.state.lock().unwrap();
        state.record("create_entry", "")?;
        let entry = Entry {
            sys: state.new_sys("entry"),
            fields,
        };
        state.entries.insert(entry.sys.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn update_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let mut state = self.state.lock().unwrap();
        state.record("update_entry", &entry.sys.id)?;
        let stored = state
            .entries
            .get_mut(&entry.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("entry {}", entry.sys.id)))?;
        check_version(&stored.sys, &entry.sys)?;
        stored.fields = entry.fields.clone();
        stored.sys.version += 1;
        Ok(stored.clone())
    }

    async fn publish_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let mut state = self.state.lock().unwrap();
        state.record("publish_entry", &entry.sys.id)?;
        let linked = entry.linked_asset("image", LOCALE);
        if let Some(asset_id) = linked {
            let published = state
                .assets
                .get(asset_id.as_str())
                .is_some_and(Asset::is_published);
            if !published {
                return Err(rejected(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("link to unpublished asset {asset_id}"),
                ));
            }
        }
        let stored = state
            .entries
            .get_mut(&entry.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("entry {}", entry.sys.id)))?;
        check_version(&stored.sys, &entry.sys)?;
        publish(&mut stored.sys);
        Ok(stored.clone())
    }

    async fn unpublish_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let mut state = self.state.lock().unwrap();
        state.record("unpublish_entry", &entry.sys.id)?;
        let stored = state
            .entries
            .get_mut(&entry.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("entry {}", entry.sys.id)))?;
        if !stored.is_published() {
            return Err(rejected(StatusCode::BAD_REQUEST, "not published".into()));
        }
        unpublish(&mut stored.sys);
        Ok(stored.clone())
    }

    async fn delete_entry(&self, entry: &Entry) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record("delete_entry", &entry.sys.id)?;
        match state.entries.get(&entry.sys.id).map(Entry::is_published) {
            None => Err(ClientError::NotFound(format!("entry {}", entry.sys.id))),
            Some(true) => Err(rejected(
                StatusCode::BAD_REQUEST,
                "cannot delete a published entry".into(),
            )),
            Some(false) => {
                state.entries.remove(&entry.sys.id);
                Ok(())
            }
        }
    }

    async fn find_entries_linking(&self, asset: &AssetId) -> ClientResult<Vec<Entry>> {
        let mut state = self.state.lock().unwrap();
        state.record("find_links", asset.as_str())?;
        Ok(state
            .entries
            .values()
            .filter(|entry| entry.linked_asset("image", LOCALE).as_ref() == Some(asset))
            .cloned()
            .collect())
    }

    async fn get_asset(&self, id: &AssetId) -> ClientResult<Asset> {
        let mut state = self.state.lock().unwrap();
        state.record("get_asset", id.as_str())?;
        state
            .assets
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("asset {id}")))
    }

    async fn find_assets_by_file_name(
        &self,
        file_name: &str,
        limit: usize,
    ) -> ClientResult<Vec<Asset>> {
        let mut state = self.state.lock().unwrap();
        state.record("find_assets", file_name)?;
        Ok(state
            .assets
            .values()
            .filter(|asset| asset.file(LOCALE).is_some_and(|f| f.file_name == file_name))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_asset_from_file(
        &self,
        title: &str,
        file: &ImageForUpload,
        locale: &str,
    ) -> ClientResult<Asset> {
        let mut state = self.state.lock().unwrap();
        state.record("create_asset", &file.file_name)?;
        let asset_file = AssetFile {
            content_type: file.content_type.clone(),
            file_name: file.file_name.clone(),
            url: None,
            upload_from: Some(Link::upload("upload-1")),
        };
        let asset = Asset {
            sys: state.new_sys("asset"),
            fields: localized_fields(
                locale,
                [
                    ("title", json!(title)),
                    ("file", serde_json::to_value(asset_file)?),
                ],
            ),
        };
        state.assets.insert(asset.sys.id.clone(), asset.clone());
        Ok(asset)
    }

    async fn process_asset(&self, asset: &Asset, locale: &str) -> ClientResult<Asset> {
        let mut state = self.state.lock().unwrap();
        state.record("process_asset", &asset.sys.id)?;
        let never_process = state.never_process;
        let stored = state
            .assets
            .get_mut(&asset.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("asset {}", asset.sys.id)))?;
        check_version(&stored.sys, &asset.sys)?;
        if never_process {
            return Err(ClientError::StillProcessing(asset.id()));
        }
        let file_name = stored.file(locale).map(|f| f.file_name).unwrap_or_default();
        stored.fields["file"][locale]["url"] =
            json!(format!("//images.test/{}/{}", asset.sys.id, file_name));
        stored.sys.version += 1;
        Ok(stored.clone())
    }

    async fn publish_asset(&self, asset: &Asset) -> ClientResult<Asset> {
        let mut state = self.state.lock().unwrap();
        state.record("publish_asset", &asset.sys.id)?;
        let stored = state
            .assets
            .get_mut(&asset.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("asset {}", asset.sys.id)))?;
        check_version(&stored.sys, &asset.sys)?;
        if !stored.is_processed(LOCALE) {
            return Err(rejected(
                StatusCode::UNPROCESSABLE_ENTITY,
                "asset file is not processed".into(),
            ));
        }
        publish(&mut stored.sys);
        Ok(stored.clone())
    }

    async fn unpublish_asset(&self, asset: &Asset) -> ClientResult<Asset> {
        let mut state = self.state.lock().unwrap();
        state.record("unpublish_asset", &asset.sys.id)?;
        let stored = state
            .assets
            .get_mut(&asset.sys.id)
            .ok_or_else(|| ClientError::NotFound(format!("asset {}", asset.sys.id)))?;
        unpublish(&mut stored.sys);
        Ok(stored.clone())
    }

    async fn delete_asset(&self, asset: &Asset) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record("delete_asset", &asset.sys.id)?;
        match state.assets.get(&asset.sys.id).map(Asset::is_published) {
            None => Err(ClientError::NotFound(format!("asset {}", asset.sys.id))),
            Some(true) => Err(rejected(
                StatusCode::BAD_REQUEST,
                "cannot delete a published asset".into(),
            )),
            Some(false) => {
                state.assets.remove(&asset.sys.id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ContentDelivery for InMemoryStore {
    async fn list_entries(&self) -> ClientResult<Vec<Recipe>> {
        let mut state = self.state.lock().unwrap();
        state.record("list_entries", "")?;
        let text = |entry: &Entry, name: &str| {
            entry
                .field(name, LOCALE)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(state
            .entries
            .values()
            .filter(|entry| entry.is_published())
            .map(|entry| Recipe {
                recipe_id: entry.sys.id.clone(),
                title: text(entry, "title"),
                description: text(entry, "description"),
                ingredients: parse_ingredients(entry.field("ingredients", LOCALE)),
                image: entry.linked_asset("image", LOCALE).map(|id| ImageRef {
                    url: state
                        .assets
                        .get(id.as_str())
                        .and_then(|a| a.file(LOCALE))
                        .and_then(|f| f.url),
                    title: None,
                    asset_id: id.to_string(),
                }),
            })
            .collect())
    }
}
