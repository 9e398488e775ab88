use serde::Deserialize;

pub const SPACE_ID_VAR: &str = "LARDER_SPACE_ID";
pub const DELIVERY_TOKEN_VAR: &str = "LARDER_DELIVERY_TOKEN";
pub const MANAGEMENT_TOKEN_VAR: &str = "LARDER_MANAGEMENT_TOKEN";
pub const ENVIRONMENT_VAR: &str = "LARDER_ENVIRONMENT";
pub const LOCALE_VAR: &str = "LARDER_LOCALE";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Where the content store lives and how to talk to it.
///
/// Listing only needs the delivery token. Creating, editing and deleting need the
/// management token.
#[derive(Clone, Deserialize)]
pub struct ContentStoreConfig {
    pub space_id: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub delivery_token: Option<String>,
    #[serde(default)]
    pub management_token: Option<String>,
    #[serde(default = "default_delivery_api")]
    pub delivery_api: String,
    #[serde(default = "default_management_api")]
    pub management_api: String,
    #[serde(default = "default_upload_api")]
    pub upload_api: String,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// How long to wait for the store to finish processing an uploaded image.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub check_interval_ms: u64,
    pub check_retries: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            check_retries: 5,
        }
    }
}

fn default_environment() -> String {
    "master".into()
}

fn default_locale() -> String {
    "en-US".into()
}

fn default_content_type() -> String {
    "recipes".into()
}

fn default_delivery_api() -> String {
    "https://cdn.contentful.com".into()
}

fn default_management_api() -> String {
    "https://api.contentful.com".into()
}

fn default_upload_api() -> String {
    "https://upload.contentful.com".into()
}

impl std::fmt::Debug for ContentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens are secrets, only say whether they are there
        f.debug_struct("ContentStoreConfig")
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .field("locale", &self.locale)
            .field("content_type", &self.content_type)
            .field("delivery_token", &self.delivery_token.is_some())
            .field("management_token", &self.management_token.is_some())
            .field("delivery_api", &self.delivery_api)
            .field("management_api", &self.management_api)
            .field("upload_api", &self.upload_api)
            .field("processing", &self.processing)
            .finish()
    }
}

impl ContentStoreConfig {
    /// A configuration with every optional setting at its default
    pub fn new(space_id: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            environment: default_environment(),
            locale: default_locale(),
            content_type: default_content_type(),
            delivery_token: None,
            management_token: None,
            delivery_api: default_delivery_api(),
            management_api: default_management_api(),
            upload_api: default_upload_api(),
            processing: ProcessingConfig::default(),
        }
    }

    /// Load the configuration from a YAML file.
    pub fn load(yml_path: &str) -> Result<Self, ConfigError> {
        let yml = std::fs::read_to_string(yml_path).map_err(|source| ConfigError::Read {
            path: yml_path.to_string(),
            source,
        })?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }

    /// Load the configuration from the environment, including a `.env` file if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build the configuration from any key-value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let space_id = get(SPACE_ID_VAR).ok_or(ConfigError::Missing(SPACE_ID_VAR))?;
        let mut config = Self::new(space_id);
        config.delivery_token = get(DELIVERY_TOKEN_VAR);
        config.management_token = get(MANAGEMENT_TOKEN_VAR);
        if let Some(environment) = get(ENVIRONMENT_VAR) {
            config.environment = environment;
        }
        if let Some(locale) = get(LOCALE_VAR) {
            config.locale = locale;
        }
        Ok(config)
    }

    pub fn delivery_token(&self) -> Result<&str, ConfigError> {
        self.delivery_token
            .as_deref()
            .ok_or(ConfigError::Missing(DELIVERY_TOKEN_VAR))
    }

    pub fn management_token(&self) -> Result<&str, ConfigError> {
        self.management_token
            .as_deref()
            .ok_or(ConfigError::Missing(MANAGEMENT_TOKEN_VAR))
    }

    /// Point every API at one base URL, e.g. a local stand-in for the store.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.delivery_api = base.to_string();
        self.management_api = base.to_string();
        self.upload_api = base.to_string();
        self
    }
}
