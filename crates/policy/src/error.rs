use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid permission name: {0:?}")]
    InvalidPermissionName(String),
}
