use skuttle_net::NetError;
use skuttle_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in as the configured identity")]
    NotLoggedIn,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("timed out waiting for a reply")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("no peer to sync with")]
    NoPeers,

    #[error("token cache worker stopped")]
    WorkerStopped,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("log store error: {0}")]
    Net(#[from] NetError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
