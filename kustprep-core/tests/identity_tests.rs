//! Identity stability and naming tests for `kustprep-core`.
//!
//! Each `#[case]` is isolated; no shared state.

use kustprep_core::{generate_name_from_metadata, MinimalK8sYaml};
use rstest::rstest;

const WEB: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
spec:
  replicas: 2
";

// ---------------------------------------------------------------------------
// Stability
// ---------------------------------------------------------------------------

#[test]
fn identity_is_stable_for_identical_content() {
    let a = MinimalK8sYaml::from_slice(WEB.as_bytes()).expect("parse");
    let b = MinimalK8sYaml::from_slice(WEB.as_bytes()).expect("parse");
    assert_eq!(a, b);
    assert_eq!(a, MinimalK8sYaml::new("apps/v1", "Deployment", "web", "prod"));
}

#[test]
fn identity_ignores_spec_changes() {
    let patched = WEB.replace("replicas: 2", "replicas: 5");
    let a = MinimalK8sYaml::from_slice(WEB.as_bytes()).expect("parse");
    let b = MinimalK8sYaml::from_slice(patched.as_bytes()).expect("parse");
    assert_eq!(a, b);
}

#[rstest]
#[case("name: web", "name: api")]
#[case("namespace: prod", "namespace: staging")]
#[case("kind: Deployment", "kind: StatefulSet")]
#[case("apiVersion: apps/v1", "apiVersion: apps/v1beta1")]
fn differing_identity_fields_differ(#[case] from: &str, #[case] to: &str) {
    let changed = WEB.replace(from, to);
    let a = MinimalK8sYaml::from_slice(WEB.as_bytes()).expect("parse");
    let b = MinimalK8sYaml::from_slice(changed.as_bytes()).expect("parse");
    assert_ne!(a, b, "changing `{from}` must change identity");
}

#[test]
fn malformed_yaml_is_error() {
    assert!(MinimalK8sYaml::from_slice(b"kind: [unclosed").is_err());
}

// ---------------------------------------------------------------------------
// Generated names
// ---------------------------------------------------------------------------

#[rstest]
#[case(MinimalK8sYaml::new("v1", "ConfigMap", "c1", ""), 0, "configmap-c1-0")]
#[case(MinimalK8sYaml::new("v1", "ConfigMap", "c1", "default"), 1, "configmap-c1-1")]
#[case(MinimalK8sYaml::new("v1", "Secret", "s", "kube-system"), 2, "secret-s-kube-system-2")]
#[case(MinimalK8sYaml::new("v1", "Service", "", ""), 4, "service-4")]
#[case(MinimalK8sYaml::default(), 0, "resource-0")]
fn generated_names(#[case] id: MinimalK8sYaml, #[case] idx: usize, #[case] expected: &str) {
    assert_eq!(generate_name_from_metadata(&id, idx), expected);
}

#[test]
fn position_disambiguates_identical_items() {
    let id = MinimalK8sYaml::new("v1", "ConfigMap", "dup", "");
    assert_ne!(
        generate_name_from_metadata(&id, 0),
        generate_name_from_metadata(&id, 1)
    );
}
