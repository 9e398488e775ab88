use larder_client::ContentStoreConfig;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub content_store: ContentStoreConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(yml_path: &str) -> anyhow::Result<Self> {
        let yml = std::fs::read_to_string(yml_path)?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    /// Where the access log goes. Defaults to the working directory
    #[serde(default)]
    pub log_dir: Option<String>,
}
