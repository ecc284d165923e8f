//! Identity derivation and file naming for manifest documents.

use std::path::Path;

use crate::types::MinimalK8sYaml;

/// File name of an overlay configuration.
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

impl MinimalK8sYaml {
    /// Parse the minimal identity out of one YAML document.
    ///
    /// Empty and comment-only documents yield the empty identity instead of
    /// an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        if is_blank_document(&String::from_utf8_lossy(bytes)) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(bytes)
    }

    /// Identity of an already-parsed document.
    pub fn from_value(value: &serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value.clone())
    }
}

/// True when `text` holds no YAML content: only blank lines, comments and
/// document markers.
pub fn is_blank_document(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// `.yaml` / `.yml` extension check.
pub fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// True when the file name is exactly `kustomization.yaml`.
pub fn is_kustomization(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(KUSTOMIZATION_FILE)
}

/// Deterministic file stem for the `idx`-th document extracted from a file.
///
/// `<kind>-<name>[-<namespace>]-<idx>` for named resources (the namespace is
/// left out when empty or `default`), `<kind>-<idx>` otherwise. The result is
/// lower-cased and anything outside `[a-z0-9._-]` becomes `-`.
pub fn generate_name_from_metadata(identity: &MinimalK8sYaml, idx: usize) -> String {
    let kind = if identity.kind.is_empty() { "resource" } else { &identity.kind };
    let mut stem = kind.to_owned();
    let meta = &identity.metadata;
    if !meta.name.is_empty() {
        stem.push('-');
        stem.push_str(&meta.name);
        if !meta.namespace.is_empty() && meta.namespace != "default" {
            stem.push('-');
            stem.push_str(&meta.namespace);
        }
    }
    stem.push_str(&format!("-{idx}"));

    stem.to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '-',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_documents_yield_empty_identity() {
        let id = MinimalK8sYaml::from_slice(b"# only a comment\n\n---\n").expect("parse");
        assert_eq!(id, MinimalK8sYaml::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let src = b"apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  labels:\n    app: web\nspec:\n  ports: []\n";
        let id = MinimalK8sYaml::from_slice(src).expect("parse");
        assert_eq!(id, MinimalK8sYaml::new("v1", "Service", "web", ""));
    }

    #[test]
    fn yaml_extension_check() {
        assert!(is_yaml_path(Path::new("a/b.yaml")));
        assert!(is_yaml_path(Path::new("b.yml")));
        assert!(!is_yaml_path(Path::new("README.md")));
        assert!(!is_yaml_path(Path::new("yaml")));
    }

    #[test]
    fn kustomization_match_is_exact() {
        assert!(is_kustomization(Path::new("base/kustomization.yaml")));
        assert!(!is_kustomization(Path::new("base/my-kustomization.yaml")));
    }

    #[test]
    fn generated_name_sanitizes() {
        let id = MinimalK8sYaml::new("rbac/v1", "ClusterRole", "system:reader", "");
        assert_eq!(generate_name_from_metadata(&id, 3), "clusterrole-system-reader-3");
    }
}
