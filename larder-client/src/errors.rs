use larder::ValidationError;

use crate::config::ConfigError;
use crate::models::AssetId;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Anything that can go wrong in a single call to the content store.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content store answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{0} not found")]
    NotFound(String),
    #[error("asset {0} has not finished processing")]
    StillProcessing(AssetId),
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    Unexpected(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Turn a non-success response into an error, keeping the body for the message.
pub(crate) async fn check_response(
    resp: reqwest::Response,
    what: &str,
) -> ClientResult<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, body });
    }
    Ok(resp)
}

/// The remote call a workflow was making when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RemoteStep {
    #[strum(to_string = "fetching the entry")]
    FetchEntry,
    #[strum(to_string = "looking up the image")]
    FindAsset,
    #[strum(to_string = "uploading the image")]
    UploadAsset,
    #[strum(to_string = "processing the image")]
    ProcessAsset,
    #[strum(to_string = "publishing the image")]
    PublishAsset,
    #[strum(to_string = "fetching the image")]
    FetchAsset,
    #[strum(to_string = "checking which recipes use the image")]
    FindLinks,
    #[strum(to_string = "unpublishing the image")]
    UnpublishAsset,
    #[strum(to_string = "deleting the image")]
    DeleteAsset,
    #[strum(to_string = "creating the entry")]
    CreateEntry,
    #[strum(to_string = "saving the entry")]
    UpdateEntry,
    #[strum(to_string = "publishing the entry")]
    PublishEntry,
    #[strum(to_string = "unpublishing the entry")]
    UnpublishEntry,
    #[strum(to_string = "deleting the entry")]
    DeleteEntry,
}

/// The outcome of a failed create, update or delete.
///
/// The store has no transactions, so a failure part way through can leave an uploaded
/// image that no entry links to. When that happens its id is in `orphaned_asset`.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("creation failed while {step}: {source}")]
    Create {
        step: RemoteStep,
        orphaned_asset: Option<AssetId>,
        source: ClientError,
    },
    #[error("update failed while {step}: {source}")]
    Update {
        step: RemoteStep,
        orphaned_asset: Option<AssetId>,
        source: ClientError,
    },
    #[error("deletion failed: {source}")]
    Delete { step: RemoteStep, source: ClientError },
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }

    /// Which remote call failed, for anything but validation
    pub fn step(&self) -> Option<RemoteStep> {
        match self {
            SyncError::Validation(_) => None,
            SyncError::Create { step, .. }
            | SyncError::Update { step, .. }
            | SyncError::Delete { step, .. } => Some(*step),
        }
    }

    pub fn orphaned_asset(&self) -> Option<&AssetId> {
        match self {
            SyncError::Create { orphaned_asset, .. } | SyncError::Update { orphaned_asset, .. } => {
                orphaned_asset.as_ref()
            }
            _ => None,
        }
    }
}
