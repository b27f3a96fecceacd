//! gsm-lookup - Resolve secrets from Google Secret Manager.
//!
//! This library turns lookup terms into secret values with per-call
//! policies for missing and denied secrets, and optional traversal into
//! JSON-encoded payloads. It is read-only and keeps nothing on disk.

pub mod cloud;
pub mod config;
pub mod error;
pub mod policy;
pub mod resolver;

pub use cloud::{SecretManagerClient, SecretVersionSource};
pub use error::{FetchError, LookupError};
pub use policy::Policy;
pub use resolver::{LookupOptions, Notifier, SecretResolver, TracingNotifier};
