use skuttle_shared::MultiserverAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("not connected to {0}")]
    NotConnected(MultiserverAddress),

    #[error("log store is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;
