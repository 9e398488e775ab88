use async_trait::async_trait;
use larder::ImageForUpload;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

use crate::config::{ConfigError, ContentStoreConfig, ProcessingConfig};
use crate::errors::{check_response, ClientError, ClientResult};
use crate::models::{
    localized_fields, Asset, AssetFile, AssetId, Collection, Entry, EntryId, Fields, Link, Upload,
};

const MANAGEMENT_JSON: &str = "application/vnd.contentful.management.v1+json";
const VERSION_HEADER: &str = "X-Contentful-Version";
const CONTENT_TYPE_HEADER: &str = "X-Contentful-Content-Type";

/// Read/write access to entries and assets.
///
/// Methods that change a resource take the resource as last fetched, because the store
/// rejects writes that are not based on its current version.
#[async_trait]
pub trait ContentManagement: Send + Sync {
    async fn get_entry(&self, id: &EntryId) -> ClientResult<Entry>;
    async fn create_entry(&self, content_type: &str, fields: Fields) -> ClientResult<Entry>;
    async fn update_entry(&self, entry: &Entry) -> ClientResult<Entry>;
    async fn publish_entry(&self, entry: &Entry) -> ClientResult<Entry>;
    async fn unpublish_entry(&self, entry: &Entry) -> ClientResult<Entry>;
    async fn delete_entry(&self, entry: &Entry) -> ClientResult<()>;
    /// Entries, draft or published, with a field linking to this asset
    async fn find_entries_linking(&self, asset: &AssetId) -> ClientResult<Vec<Entry>>;

    async fn get_asset(&self, id: &AssetId) -> ClientResult<Asset>;
    /// Assets whose file has exactly this name, at most `limit` of them
    async fn find_assets_by_file_name(&self, file_name: &str, limit: usize)
        -> ClientResult<Vec<Asset>>;
    /// Upload the bytes and create an (unprocessed, unpublished) asset around them
    async fn create_asset_from_file(
        &self,
        title: &str,
        file: &ImageForUpload,
        locale: &str,
    ) -> ClientResult<Asset>;
    /// Ask the store to process the file and wait until it has, returning the fresh asset
    async fn process_asset(&self, asset: &Asset, locale: &str) -> ClientResult<Asset>;
    async fn publish_asset(&self, asset: &Asset) -> ClientResult<Asset>;
    async fn unpublish_asset(&self, asset: &Asset) -> ClientResult<Asset>;
    async fn delete_asset(&self, asset: &Asset) -> ClientResult<()>;
}

/// Client for the content management and upload APIs.
#[derive(Clone)]
pub struct ManagementClient {
    http: Client,
    management_api: String,
    upload_api: String,
    space_id: String,
    environment: String,
    token: String,
    processing: ProcessingConfig,
}

impl ManagementClient {
    pub fn new(config: &ContentStoreConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: Client::new(),
            management_api: config.management_api.trim_end_matches('/').to_string(),
            upload_api: config.upload_api.trim_end_matches('/').to_string(),
            space_id: config.space_id.clone(),
            environment: config.environment.clone(),
            token: config.management_token()?.to_string(),
            processing: config.processing.clone(),
        })
    }

    fn environment_url(&self, path: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}{}",
            self.management_api,
            url_escape::encode_component(&self.space_id),
            url_escape::encode_component(&self.environment),
            path
        )
    }

    fn entry_url(&self, id: &str, suffix: &str) -> String {
        self.environment_url(&format!(
            "/entries/{}{}",
            url_escape::encode_component(id),
            suffix
        ))
    }

    fn asset_url(&self, id: &str, suffix: &str) -> String {
        self.environment_url(&format!(
            "/assets/{}{}",
            url_escape::encode_component(id),
            suffix
        ))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, MANAGEMENT_JSON)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> ClientResult<T> {
        let resp = check_response(request.send().await?, what).await?;
        Ok(resp.json().await?)
    }

    async fn send_empty(&self, request: RequestBuilder, what: &str) -> ClientResult<()> {
        check_response(request.send().await?, what).await?;
        Ok(())
    }

    /// Fetch the environment, which only works with a valid management token.
    pub async fn check_access(&self) -> ClientResult<Value> {
        let url = self.environment_url("");
        self.send(self.request(Method::GET, &url), "environment")
            .await
    }

    /// One check of the processing state, failing with `StillProcessing` until it's done.
    async fn processed_asset(&self, id: &AssetId, locale: &str) -> ClientResult<Asset> {
        let asset = self.get_asset(id).await?;
        if asset.is_processed(locale) {
            Ok(asset)
        } else {
            Err(ClientError::StillProcessing(id.clone()))
        }
    }
}

#[async_trait]
impl ContentManagement for ManagementClient {
    async fn get_entry(&self, id: &EntryId) -> ClientResult<Entry> {
        let url = self.entry_url(id.as_str(), "");
        self.send(self.request(Method::GET, &url), &format!("entry {id}"))
            .await
    }

    async fn create_entry(&self, content_type: &str, fields: Fields) -> ClientResult<Entry> {
        let url = self.environment_url("/entries");
        let body = serde_json::to_vec(&json!({ "fields": fields }))?;
        self.send(
            self.request(Method::POST, &url)
                .header(CONTENT_TYPE_HEADER, content_type)
                .body(body),
            "entries",
        )
        .await
    }

    async fn update_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let url = self.entry_url(&entry.sys.id, "");
        let body = serde_json::to_vec(&json!({ "fields": entry.fields }))?;
        self.send(
            self.request(Method::PUT, &url)
                .header(VERSION_HEADER, entry.sys.version)
                .body(body),
            &format!("entry {}", entry.sys.id),
        )
        .await
    }

    async fn publish_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let url = self.entry_url(&entry.sys.id, "/published");
        self.send(
            self.request(Method::PUT, &url)
                .header(VERSION_HEADER, entry.sys.version),
            &format!("entry {}", entry.sys.id),
        )
        .await
    }

    async fn unpublish_entry(&self, entry: &Entry) -> ClientResult<Entry> {
        let url = self.entry_url(&entry.sys.id, "/published");
        self.send(
            self.request(Method::DELETE, &url)
                .header(VERSION_HEADER, entry.sys.version),
            &format!("entry {}", entry.sys.id),
        )
        .await
    }

    async fn delete_entry(&self, entry: &Entry) -> ClientResult<()> {
        let url = self.entry_url(&entry.sys.id, "");
        self.send_empty(
            self.request(Method::DELETE, &url),
            &format!("entry {}", entry.sys.id),
        )
        .await
    }

    async fn find_entries_linking(&self, asset: &AssetId) -> ClientResult<Vec<Entry>> {
        let url = self.environment_url("/entries");
        let page: Collection<Entry> = self
            .send(
                self.request(Method::GET, &url)
                    .query(&[("links_to_asset", asset.as_str())]),
                "entries",
            )
            .await?;
        Ok(page.items)
    }

    async fn get_asset(&self, id: &AssetId) -> ClientResult<Asset> {
        let url = self.asset_url(id.as_str(), "");
        self.send(self.request(Method::GET, &url), &format!("asset {id}"))
            .await
    }

    async fn find_assets_by_file_name(
        &self,
        file_name: &str,
        limit: usize,
    ) -> ClientResult<Vec<Asset>> {
        let url = self.environment_url("/assets");
        let limit = limit.to_string();
        let page: Collection<Asset> = self
            .send(
                self.request(Method::GET, &url)
                    .query(&[("fields.file.fileName", file_name), ("limit", &limit)]),
                "assets",
            )
            .await?;
        Ok(page.items)
    }

    async fn create_asset_from_file(
        &self,
        title: &str,
        file: &ImageForUpload,
        locale: &str,
    ) -> ClientResult<Asset> {
        // The bytes go to the upload API first, the asset then points at the upload
        let upload_url = format!(
            "{}/spaces/{}/uploads",
            self.upload_api,
            url_escape::encode_component(&self.space_id)
        );
        tracing::debug!("POST {}", upload_url);
        let resp = self
            .http
            .post(&upload_url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(file.content_bytes.clone())
            .send()
            .await?;
        let upload: Upload = check_response(resp, "uploads").await?.json().await?;
        tracing::info!(
            "Uploaded {} ({} bytes) as {}",
            file.file_name,
            file.content_bytes.len(),
            upload.sys.id
        );

        let asset_file = AssetFile {
            content_type: file.content_type.clone(),
            file_name: file.file_name.clone(),
            url: None,
            upload_from: Some(Link::upload(&upload.sys.id)),
        };
        let fields = localized_fields(
            locale,
            [
                ("title", Value::from(title)),
                ("file", serde_json::to_value(asset_file)?),
            ],
        );
        let url = self.environment_url("/assets");
        let body = serde_json::to_vec(&json!({ "fields": fields }))?;
        self.send(self.request(Method::POST, &url).body(body), "assets")
            .await
    }

    async fn process_asset(&self, asset: &Asset, locale: &str) -> ClientResult<Asset> {
        let url = self.asset_url(
            &asset.sys.id,
            &format!("/files/{}/process", url_escape::encode_component(locale)),
        );
        self.send_empty(
            self.request(Method::PUT, &url)
                .header(VERSION_HEADER, asset.sys.version),
            &format!("asset {}", asset.sys.id),
        )
        .await?;

        let id = asset.id();
        let strategy = FixedInterval::from_millis(self.processing.check_interval_ms)
            .take(self.processing.check_retries);
        RetryIf::start(
            strategy,
            || self.processed_asset(&id, locale),
            |err: &ClientError| matches!(err, ClientError::StillProcessing(_)),
        )
        .await
    }

    async fn publish_asset(&self, asset: &Asset) -> ClientResult<Asset> {
        let url = self.asset_url(&asset.sys.id, "/published");
        self.send(
            self.request(Method::PUT, &url)
                .header(VERSION_HEADER, asset.sys.version),
            &format!("asset {}", asset.sys.id),
        )
        .await
    }

    async fn unpublish_asset(&self, asset: &Asset) -> ClientResult<Asset> {
        let url = self.asset_url(&asset.sys.id, "/published");
        self.send(
            self.request(Method::DELETE, &url)
                .header(VERSION_HEADER, asset.sys.version),
            &format!("asset {}", asset.sys.id),
        )
        .await
    }

    async fn delete_asset(&self, asset: &Asset) -> ClientResult<()> {
        let url = self.asset_url(&asset.sys.id, "");
        self.send_empty(
            self.request(Method::DELETE, &url),
            &format!("asset {}", asset.sys.id),
        )
        .await
    }
}
