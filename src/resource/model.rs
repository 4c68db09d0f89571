//! Resource identity and the mutable object model
//!
//! A `ResourceKey` addresses exactly one object in the resource store. A
//! `Resource` is the transient in-memory copy owned by one fetch-mutate-update
//! cycle; only its label and annotation maps are ever modified.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one object in the resource store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// API group, empty for the core group
    pub group: String,
    /// API version
    pub version: String,
    /// Plural resource name (e.g. `pods`, `deployments`)
    pub resource: String,
    /// Namespace; `None` addresses a cluster-scoped object
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ResourceKey {
    /// Build a key from request fields
    ///
    /// An empty namespace becomes `None` so that the store routes to the
    /// cluster-scoped accessor instead of silently picking a namespace.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            namespace: if namespace.is_empty() {
                None
            } else {
                Some(namespace)
            },
            name: name.into(),
        }
    }

    /// Namespace as a display string, empty when cluster-scoped
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_none()
    }

    /// `group/version` as used by the API server, `version` alone for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Diagnostic form `<group>/<version>/<resource>:<name>`
impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.group, self.version, self.resource, self.name
        )
    }
}

/// A fetched object with mutable label and annotation maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Object kind, used only for diagnostics
    pub kind: String,
    /// Object name, used only for diagnostics
    pub name: String,
    pub labels: Option<BTreeMap<String, String>>,
    pub annotations: Option<BTreeMap<String, String>>,
    /// The full object as returned by the store
    #[serde(default)]
    pub body: serde_json::Value,
}

impl Resource {
    /// Create a resource with empty metadata maps
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            labels: None,
            annotations: None,
            body: serde_json::Value::Null,
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    /// Label map, created on first use
    pub fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.labels.get_or_insert_with(BTreeMap::new)
    }

    /// Annotation map, created on first use
    pub fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.annotations.get_or_insert_with(BTreeMap::new)
    }

    /// `<kind>/<name>` for log messages
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}
