//! Core domain types shared between the host and the worker.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one bootstrap run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Third-party API credentials resolved from the shared credentials store.
///
/// Fields are optional because the resolver extracts without validating;
/// a missing key reaches the worker as `null`. `Debug` redacts the secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub associate_tag: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() { "<redacted>" } else { "<missing>" }
        }

        f.debug_struct("Credentials")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("associate_tag", &self.associate_tag)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// KnownPublishers
// ---------------------------------------------------------------------------

/// Persisted dedupe/resume state: a set of opaque publisher identifiers.
///
/// Membership ignores order, but iteration follows first-seen load order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KnownPublishers {
    order: Vec<String>,
    members: HashSet<String>,
}

impl KnownPublishers {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identifier. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in load order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl PartialEq for KnownPublishers {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for KnownPublishers {}

impl<S: Into<String>> FromIterator<S> for KnownPublishers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl From<Vec<String>> for KnownPublishers {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<KnownPublishers> for Vec<String> {
    fn from(set: KnownPublishers) -> Self {
        set.order
    }
}

// ---------------------------------------------------------------------------
// WorkerConfig
// ---------------------------------------------------------------------------

/// The sole initialization input handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    pub credentials: Credentials,
    pub known_publishers: KnownPublishers,
    /// Process arguments passed through verbatim, in order.
    pub argv: Vec<String>,
}

// ---------------------------------------------------------------------------
// FileWriteRequest
// ---------------------------------------------------------------------------

/// One `writeFile` emission from the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWriteRequest {
    pub filename: String,
    pub contents: String,
}

impl FileWriteRequest {
    pub fn new(filename: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_publishers_dedupes_and_keeps_order() {
        let set: KnownPublishers = ["b", "a", "b", "c"].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains("a"));
        assert!(!set.contains("d"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn known_publishers_equality_ignores_order() {
        let a: KnownPublishers = ["x", "y"].into_iter().collect();
        let b: KnownPublishers = ["y", "x"].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = Credentials {
            access_key_id: Some("AKIAEXAMPLE".into()),
            secret_access_key: Some("s3cr3t".into()),
            associate_tag: Some("tag-22".into()),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn worker_config_serializes_camel_case() {
        let config = WorkerConfig {
            credentials: Credentials {
                access_key_id: Some("K".into()),
                secret_access_key: Some("S".into()),
                associate_tag: None,
            },
            known_publishers: ["p1", "p2"].into_iter().collect(),
            argv: vec!["--full".into()],
        };
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["credentials"]["accessKeyId"], "K");
        assert_eq!(json["credentials"]["associateTag"], serde_json::Value::Null);
        assert_eq!(json["knownPublishers"], serde_json::json!(["p1", "p2"]));
        assert_eq!(json["argv"], serde_json::json!(["--full"]));
    }
}
