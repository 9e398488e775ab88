pub mod catalog;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod management;
pub mod models;
pub mod sync;
#[cfg(test)]
mod test_utils;

pub use catalog::{Catalog, Operation, Status};
pub use config::{ConfigError, ContentStoreConfig, ProcessingConfig};
pub use delivery::{ContentDelivery, DeliveryClient};
pub use errors::{ClientError, ClientResult, RemoteStep, SyncError};
pub use management::{ContentManagement, ManagementClient};
pub use models::{AssetId, EntryId};
pub use sync::{ImageChange, RecipeSync, RecipeUpdate};
