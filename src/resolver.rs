//! Secret resolution: turn lookup terms into secret values.
//!
//! A term is either a plain secret name (`db-password`) or, for nested
//! lookups, a secret name followed by a dotted key path into a JSON payload
//! (`app-config.database.password`). Each term costs exactly one fetch from
//! the secret-storage service; nothing is retried or cached.

use crate::cloud::SecretVersionSource;
use crate::error::{FetchError, LookupError, Result};
use crate::policy::Policy;
use serde_json::Value;
use tracing::{debug, warn};

/// Version used when the caller does not pin one.
pub const DEFAULT_VERSION: &str = "latest";

/// Per-call lookup options. Policies are already validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Secret version to read (default: `latest`)
    pub version_id: Option<String>,
    /// Accepted for compatibility, not used when building the resource path
    pub version_stage: Option<String>,
    /// Treat payloads as JSON and walk the dotted key path of each term
    pub nested: bool,
    /// Concatenate all values into a single result
    pub join: bool,
    /// Terms were expanded from a hierarchy by the caller; disables `join`
    pub bypath: bool,
    /// Action when the secret does not exist
    pub on_missing: Policy,
    /// Action when access to the secret is denied
    pub on_denied: Policy,
}

impl LookupOptions {
    /// Build options from raw policy strings, failing before any fetch.
    pub fn with_policies(on_missing: &str, on_denied: &str) -> Result<Self> {
        Ok(Self {
            on_missing: Policy::parse_option("on_missing", on_missing)?,
            on_denied: Policy::parse_option("on_denied", on_denied)?,
            ..Self::default()
        })
    }
}

/// Side channel for non-fatal notices.
pub trait Notifier {
    fn warning(&self, message: &str);
}

/// Sends warnings to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Build `projects/{project}/secrets/{secret}/versions/{version}`.
///
/// A missing or empty version resolves to `latest`.
pub fn resource_path(project: &str, secret_name: &str, version_id: Option<&str>) -> String {
    let version = version_id
        .filter(|version| !version.is_empty())
        .unwrap_or(DEFAULT_VERSION);
    format!(
        "projects/{}/secrets/{}/versions/{}",
        project, secret_name, version
    )
}

/// Resolves lookup terms against one secret-storage client and project.
pub struct SecretResolver<C> {
    client: C,
    project: String,
    notifier: Box<dyn Notifier>,
}

impl<C: SecretVersionSource> SecretResolver<C> {
    pub fn new(client: C, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
            notifier: Box::new(TracingNotifier),
        }
    }

    /// Replace the warning channel.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Resolve every term in order.
    ///
    /// Terms skipped by policy, and terms whose value is empty, leave no
    /// entry in the output. With `join` the values are concatenated into a
    /// single element. The first fatal error aborts the batch.
    pub fn resolve<S: AsRef<str>>(&self, terms: &[S], options: &LookupOptions) -> Result<Vec<String>> {
        let mut secrets = Vec::with_capacity(terms.len());

        for term in terms {
            let term = term.as_ref();
            match self.resolve_one(term, options)? {
                Some(value) if !value.is_empty() => secrets.push(value),
                Some(_) => debug!(term, "dropping empty secret value"),
                None => {}
            }
        }

        if options.join && !options.bypath {
            return Ok(vec![secrets.concat()]);
        }

        Ok(secrets)
    }

    /// Resolve a single term. `Ok(None)` means the term was skipped by policy.
    pub fn resolve_one(&self, term: &str, options: &LookupOptions) -> Result<Option<String>> {
        let (secret_name, keys) = split_term(term, options.nested)?;
        check_segment("secret name", secret_name)?;
        if let Some(version) = options.version_id.as_deref().filter(|v| !v.is_empty()) {
            check_segment("version", version)?;
        }
        let name = resource_path(&self.project, secret_name, options.version_id.as_deref());

        let payload = match self.client.access_secret_version(&name) {
            Ok(payload) => payload,
            Err(outcome) => return self.apply_policy(term, outcome, options),
        };

        let text = String::from_utf8(payload).map_err(|err| LookupError::InvalidPayload {
            term: term.to_string(),
            reason: err.to_string(),
        })?;

        if !options.nested {
            return Ok(Some(text));
        }

        let document: Value =
            serde_json::from_str(&text).map_err(|err| LookupError::InvalidPayload {
                term: term.to_string(),
                reason: format!("not a JSON document: {err}"),
            })?;

        walk(&document, &keys).map(|value| Some(render(value)))
    }

    fn apply_policy(
        &self,
        term: &str,
        outcome: FetchError,
        options: &LookupOptions,
    ) -> Result<Option<String>> {
        match outcome {
            FetchError::NotFound => match options.on_missing {
                Policy::Error => Err(LookupError::NotFound {
                    term: term.to_string(),
                }),
                Policy::Warn => {
                    self.notifier
                        .warning(&format!("Skipping, did not find secret {}", term));
                    Ok(None)
                }
                Policy::Skip => Ok(None),
            },
            FetchError::PermissionDenied => match options.on_denied {
                Policy::Error => Err(LookupError::AccessDenied {
                    term: term.to_string(),
                }),
                Policy::Warn => {
                    self.notifier
                        .warning(&format!("Skipping, access denied for secret {}", term));
                    Ok(None)
                }
                Policy::Skip => Ok(None),
            },
            FetchError::Other(message) => Err(LookupError::Service(message)),
        }
    }
}

/// Split a term into the secret name and, for nested lookups, its key path.
fn split_term(term: &str, nested: bool) -> Result<(&str, Vec<&str>)> {
    if !nested {
        return Ok((term, Vec::new()));
    }

    let mut segments = term.split('.');
    let secret_name = segments.next().unwrap_or(term);
    let keys: Vec<&str> = segments.collect();

    if keys.is_empty() {
        return Err(LookupError::Configuration(
            "Nested query must use the following syntax: `secret_name.key1.key2...`".to_string(),
        ));
    }

    Ok((secret_name, keys))
}

/// Secret IDs and version aliases are limited to letters, digits, `-` and
/// `_`. Anything else would change the request path, so it is rejected
/// before the fetch.
fn check_segment(kind: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(LookupError::Configuration(format!(
            "Invalid {} '{}': only letters, digits, '-' and '_' are allowed",
            kind, value
        )));
    }

    Ok(())
}

fn walk<'v>(document: &'v Value, keys: &[&str]) -> Result<&'v Value> {
    keys.iter().try_fold(document, |current, key| {
        current
            .as_object()
            .and_then(|object| object.get(*key))
            .ok_or_else(|| {
                LookupError::Configuration(format!(
                    "Successfully retrieved secret but there exists no key {} in the secret",
                    key
                ))
            })
    })
}

// Strings come back bare; everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
