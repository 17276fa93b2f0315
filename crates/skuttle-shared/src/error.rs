use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Expected sigil '{expected}' in {value}")]
    InvalidSigil { expected: char, value: String },

    #[error("Missing or unsupported suffix in {0}")]
    InvalidSuffix(String),

    #[error("Invalid base64 payload in {0}")]
    InvalidEncoding(String),

    #[error("Expected 32 bytes behind {0}")]
    InvalidLength(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Missing secret-handshake key in {0}")]
    MissingKey(String),

    #[error("Missing scheme in {0}")]
    MissingScheme(String),

    #[error("Missing port in {0}")]
    MissingPort(String),

    #[error("Invalid port in {0}")]
    InvalidPort(String),

    #[error("Empty host in {0}")]
    EmptyHost(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("Invalid invite format: {0}")]
    InvalidFormat(String),

    #[error("Invalid relay identity: {0}")]
    Identity(#[from] IdentifierError),

    #[error("Invalid relay address: {0}")]
    Address(#[from] AddressError),
}
