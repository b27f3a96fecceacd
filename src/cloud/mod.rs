//! Secret-storage service integration.
//!
//! # Supported Services
//!
//! - Google Secret Manager (REST API v1)

pub mod gcp;

use crate::error::FetchError;

pub use gcp::{ClientConfig, SecretManagerClient};

/// Read access to secret versions, addressed by full resource path.
///
/// Implementations classify every failure into a [`FetchError`] before
/// returning; callers never inspect transport-specific errors.
pub trait SecretVersionSource {
    /// Fetch the raw payload of `projects/{project}/secrets/{name}/versions/{version}`.
    fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: SecretVersionSource + ?Sized> SecretVersionSource for &T {
    fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, FetchError> {
        (**self).access_secret_version(name)
    }
}
