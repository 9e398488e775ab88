use std::collections::HashMap;

use async_trait::async_trait;
use larder::{parse_ingredients, ImageRef, Recipe};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ConfigError, ContentStoreConfig};
use crate::errors::{check_response, ClientResult};
use crate::models::{absolute_url, Fields, Link, Sys};

/// Read-only access to published recipes.
#[async_trait]
pub trait ContentDelivery: Send + Sync {
    /// Every published recipe, in the order the store returns them
    async fn list_entries(&self) -> ClientResult<Vec<Recipe>>;
}

/// Client for the content delivery API, which only ever sees published content.
#[derive(Clone)]
pub struct DeliveryClient {
    http: Client,
    delivery_api: String,
    space_id: String,
    environment: String,
    content_type: String,
    token: String,
}

#[derive(Deserialize)]
struct DeliveryItem {
    sys: Sys,
    #[serde(default)]
    fields: Fields,
}

#[derive(Deserialize, Default)]
struct Includes {
    #[serde(rename = "Asset", default)]
    assets: Vec<DeliveryItem>,
}

#[derive(Deserialize)]
struct DeliveryPage {
    #[serde(default)]
    items: Vec<DeliveryItem>,
    #[serde(default)]
    includes: Includes,
}

fn text(fields: &Fields, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

impl DeliveryPage {
    /// Turn entries into recipes, resolving image links against the included assets.
    fn into_recipes(self) -> Vec<Recipe> {
        let assets: HashMap<&str, &DeliveryItem> = self
            .includes
            .assets
            .iter()
            .map(|asset| (asset.sys.id.as_str(), asset))
            .collect();
        self.items
            .iter()
            .map(|item| {
                let image = item.fields.get("image").and_then(Link::asset_id).map(|id| {
                    let asset = assets.get(id.as_str());
                    ImageRef {
                        url: asset
                            .and_then(|a| a.fields.get("file"))
                            .and_then(|file| file.get("url"))
                            .and_then(Value::as_str)
                            .map(absolute_url),
                        title: asset.and_then(|a| text(&a.fields, "title")),
                        asset_id: id.to_string(),
                    }
                });
                Recipe {
                    recipe_id: item.sys.id.clone(),
                    title: text(&item.fields, "title").unwrap_or_default(),
                    description: text(&item.fields, "description").unwrap_or_default(),
                    ingredients: parse_ingredients(item.fields.get("ingredients")),
                    image,
                }
            })
            .collect()
    }
}

impl DeliveryClient {
    pub fn new(config: &ContentStoreConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: Client::new(),
            delivery_api: config.delivery_api.trim_end_matches('/').to_string(),
            space_id: config.space_id.clone(),
            environment: config.environment.clone(),
            content_type: config.content_type.clone(),
            token: config.delivery_token()?.to_string(),
        })
    }

    fn entries_url(&self) -> String {
        format!(
            "{}/spaces/{}/environments/{}/entries",
            self.delivery_api,
            url_escape::encode_component(&self.space_id),
            url_escape::encode_component(&self.environment),
        )
    }
}

#[async_trait]
impl ContentDelivery for DeliveryClient {
    async fn list_entries(&self) -> ClientResult<Vec<Recipe>> {
        let url = self.entries_url();
        tracing::debug!("Listing entries from {}", url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("content_type", self.content_type.as_str()),
                ("include", "1"),
                ("limit", "1000"),
            ])
            .send()
            .await?;
        let page: DeliveryPage = check_response(resp, "entry list").await?.json().await?;
        let recipes = page.into_recipes();
        tracing::info!("Fetched {} recipes", recipes.len());
        Ok(recipes)
    }
}
