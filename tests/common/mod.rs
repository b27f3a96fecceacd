//! Common testing utilities for gsm-lookup integration tests.

use gsm_lookup::cloud::SecretVersionSource;
use gsm_lookup::error::FetchError;
use gsm_lookup::resolver::Notifier;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

#[allow(dead_code)]
pub const PROJECT: &str = "P";

/// In-memory secret store keyed by full resource path.
///
/// Every access is recorded so tests can assert which paths were fetched
/// and in which order.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeSecretStore {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
    calls: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` as the latest version of `secret`.
    pub fn with_secret(self, secret: &str, value: &str) -> Self {
        self.with_payload(&latest(secret), Ok(value.as_bytes().to_vec()))
    }

    /// Make every access to the latest version of `secret` fail with `outcome`.
    pub fn with_failure(self, secret: &str, outcome: FetchError) -> Self {
        self.with_payload(&latest(secret), Err(outcome))
    }

    pub fn with_payload(mut self, path: &str, payload: Result<Vec<u8>, FetchError>) -> Self {
        self.responses.insert(path.to_string(), payload);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl SecretVersionSource for FakeSecretStore {
    fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.borrow_mut().push(name.to_string());
        self.responses
            .get(name)
            .cloned()
            .unwrap_or(Err(FetchError::NotFound))
    }
}

/// Resource path of the latest version of `secret` in the test project.
#[allow(dead_code)]
pub fn latest(secret: &str) -> String {
    format!("projects/{}/secrets/{}/versions/latest", PROJECT, secret)
}

/// Notifier that keeps every warning for later inspection.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    warnings: Rc<RefCell<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn warning(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}

/// Test context that manages temporary files and directories.
#[allow(dead_code)]
pub struct TestContext {
    /// Path to temporary directory
    pub temp_path: PathBuf,
    /// The temporary directory (kept to prevent early deletion)
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new test context with a temporary directory.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a test file with content.
    pub fn create_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let file_path = self.temp_path.join(name);
        fs::write(&file_path, content)?;
        Ok(file_path)
    }
}
