//! Document types read and written by the pipeline.
//!
//! Every type here is (de)serialized with serde + serde_yaml. Field names follow
//! the Kubernetes/kustomize wire spelling via `rename`; Rust-side names stay
//! snake_case.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `kind` of a Kubernetes list wrapper document.
pub const LIST_KIND: &str = "List";

/// `kind` that reconciliation never overwrites.
pub const CRD_KIND: &str = "CustomResourceDefinition";

// ---------------------------------------------------------------------------
// Minimal identity
// ---------------------------------------------------------------------------

/// The `metadata` fields that take part in resource identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinimalK8sMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Minimal identity of one resource document.
///
/// Two documents with equal `MinimalK8sYaml` are treated as the "before" and
/// "after" version of the same logical resource. Fields not listed here are
/// ignored when parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinimalK8sYaml {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: MinimalK8sMetadata,
}

impl MinimalK8sYaml {
    pub fn new(api_version: &str, kind: &str, name: &str, namespace: &str) -> Self {
        Self {
            api_version: api_version.to_owned(),
            kind: kind.to_owned(),
            metadata: MinimalK8sMetadata {
                name: name.to_owned(),
                namespace: namespace.to_owned(),
            },
        }
    }

    pub fn is_crd(&self) -> bool {
        self.kind == CRD_KIND
    }

    pub fn is_list(&self) -> bool {
        self.kind == LIST_KIND
    }
}

impl fmt::Display for MinimalK8sYaml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.kind.is_empty() { "<no kind>" } else { &self.kind };
        if !self.api_version.is_empty() {
            write!(f, "{} ", self.api_version)?;
        }
        write!(f, "{kind}")?;
        match (self.metadata.namespace.as_str(), self.metadata.name.as_str()) {
            (_, "") => Ok(()),
            ("", name) => write!(f, " {name}"),
            (ns, name) => write!(f, " {ns}/{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// List documents
// ---------------------------------------------------------------------------

/// Top-level shape of a possible `kind: List` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListK8sYaml {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<serde_yaml::Value>,
}

/// Reconstruction record emitted when a `List` file is expanded.
///
/// Owned by the workflow state; the pipeline only produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// Path of the `List` file that was expanded (and then removed).
    pub path: PathBuf,
    /// Identities of the extracted items, in `items` order.
    #[serde(default)]
    pub items: Vec<MinimalK8sYaml>,
}

// ---------------------------------------------------------------------------
// kustomization.yaml
// ---------------------------------------------------------------------------

/// The subset of `kustomization.yaml` the pipeline reads and writes.
///
/// Unknown keys are kept in `extra` so a parsed file can be written back
/// without dropping fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(
        rename = "patchesStrategicMerge",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub patches_strategic_merge: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
