//! End-to-end pipeline runs against a scripted overlay builder.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use kustprep_core::{FileState, KustomizeStep, MinimalK8sYaml, PipelineOptions, KUSTOMIZATION_FILE};
use kustprep_pipeline::{
    overlay::parse_built_output, BuildError, BuiltResource, Kustomizer, OverlayBuilder, Phase,
    ReplaceOutcome,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const WEB: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
";

const WEB_BUILT: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    env: prod
spec:
  replicas: 3
";

const LIST: &str = "\
apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: c1
  data:
    key: one
- apiVersion: v1
  kind: ConfigMap
  metadata:
    name: c2
  data:
    key: two
";

/// Builder that answers per directory; unknown directories get `default`.
struct ScriptedBuilder {
    default: String,
    by_dir: Vec<(PathBuf, String)>,
    calls: RefCell<Vec<PathBuf>>,
}

impl ScriptedBuilder {
    fn new(default: &str) -> Self {
        Self {
            default: default.to_string(),
            by_dir: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn answer(mut self, dir: &Path, stream: &str) -> Self {
        self.by_dir.push((dir.to_path_buf(), stream.to_string()));
        self
    }
}

impl OverlayBuilder for ScriptedBuilder {
    fn build(&self, dir: &Path) -> Result<Vec<BuiltResource>, BuildError> {
        self.calls.borrow_mut().push(dir.to_path_buf());
        let stream = self
            .by_dir
            .iter()
            .find(|(d, _)| d == dir)
            .map(|(_, s)| s.as_str())
            .unwrap_or(&self.default);
        parse_built_output(stream).map_err(BuildError::Output)
    }
}

fn options(root: &TempDir) -> PipelineOptions {
    PipelineOptions {
        temp_root: Some(root.path().join("tmp")),
        ..PipelineOptions::default()
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn replicas(path: &Path) -> Option<u64> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(path).expect("read")).expect("yaml");
    value["spec"]["replicas"].as_u64()
}

// ---------------------------------------------------------------------------
// Scenario: deployment + list + leaf kustomization
// ---------------------------------------------------------------------------

#[test]
fn deployment_list_and_leaf_kustomization() {
    let root = TempDir::new().expect("root");
    let base = root.path().join("base");
    fs::create_dir_all(&base).expect("mkdir");
    fs::write(base.join("a.yaml"), WEB).expect("write a");
    fs::write(base.join("list.yaml"), LIST).expect("write list");
    fs::write(base.join(KUSTOMIZATION_FILE), "resources:\n- a.yaml\n- list.yaml\n")
        .expect("write kustomization");

    let state_path = root.path().join(".kustprep").join("state.yaml");
    let mut state = FileState::new(&state_path);
    let builder = ScriptedBuilder::new(WEB_BUILT);

    let report = Kustomizer::new(&builder)
        .with_options(options(&root))
        .pre_execute(&KustomizeStep::new(&base), &mut state)
        .expect("pre_execute");

    assert_eq!(
        file_names(&base),
        vec!["a.yaml", "configmap-c1-0.yaml", "configmap-c2-1.yaml"],
        "list replaced by two files and kustomization.yaml removed"
    );
    assert_eq!(replicas(&base.join("a.yaml")), Some(3));

    let c1 = fs::read_to_string(base.join("configmap-c1-0.yaml")).expect("c1");
    assert!(c1.contains("key: one"));
    let c2 = fs::read_to_string(base.join("configmap-c2-1.yaml")).expect("c2");
    assert!(c2.contains("key: two"));

    assert!(report
        .replaced
        .iter()
        .any(|o| matches!(o, ReplaceOutcome::Replaced { path, .. } if path.ends_with("a.yaml"))));
    assert_eq!(
        report
            .replaced
            .iter()
            .filter(|o| matches!(o, ReplaceOutcome::NoMatch { .. }))
            .count(),
        2
    );

    let lists = state.load_lists().expect("state");
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].path, base.join("list.yaml"));
    assert_eq!(
        lists[0].items,
        vec![
            MinimalK8sYaml::new("v1", "ConfigMap", "c1", ""),
            MinimalK8sYaml::new("v1", "ConfigMap", "c2", ""),
        ]
    );
    assert_eq!(builder.calls.borrow().len(), 1);
}

#[test]
#[cfg(unix)]
fn modes_survive_for_rewritten_and_untouched_files() {
    use std::os::unix::fs::PermissionsExt;

    const CRD: &str = "\
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
";
    const UNMATCHED: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n";

    let root = TempDir::new().expect("root");
    let base = root.path().join("base");
    fs::create_dir_all(&base).expect("mkdir");
    let files = [
        ("a.yaml", WEB, 0o640),
        ("crd.yaml", CRD, 0o600),
        ("settings.yaml", UNMATCHED, 0o600),
    ];
    for (name, content, mode) in files {
        let path = base.join(name);
        fs::write(&path, content).expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    let built = format!("{WEB_BUILT}---\n{CRD}spec:\n  group: example.com\n");
    let report = Kustomizer::new(ScriptedBuilder::new(&built))
        .with_options(options(&root))
        .pre_execute(&KustomizeStep::new(&base), &mut kustprep_core::MemoryState::default())
        .expect("pre_execute");

    let mode_of = |name: &str| {
        fs::metadata(base.join(name)).expect("meta").permissions().mode() & 0o777
    };
    assert_eq!(replicas(&base.join("a.yaml")), Some(3));
    assert_eq!(mode_of("a.yaml"), 0o640);

    for &(name, content, mode) in &files[1..] {
        assert_eq!(
            fs::read_to_string(base.join(name)).expect("read"),
            content,
            "{name} must be byte-identical"
        );
        assert_eq!(mode_of(name), mode, "{name} must keep its mode");
    }
    assert!(report
        .replaced
        .iter()
        .any(|o| matches!(o, ReplaceOutcome::SkippedCrd { path } if path.ends_with("crd.yaml"))));
}

// ---------------------------------------------------------------------------
// Scenario: base pointing at an upstream base
// ---------------------------------------------------------------------------

#[test]
fn upstream_base_receives_provided_overlay() {
    let root = TempDir::new().expect("root");
    let upstream = root.path().join("upstream");
    let overlay = root.path().join("overlay");
    fs::create_dir_all(&upstream).expect("mkdir upstream");
    fs::create_dir_all(&overlay).expect("mkdir overlay");
    fs::write(upstream.join("deploy.yaml"), WEB).expect("write deploy");

    let overlay_kustomization = "bases:\n- ../upstream\npatchesStrategicMerge:\n- patch.yaml\n";
    fs::write(overlay.join(KUSTOMIZATION_FILE), overlay_kustomization).expect("write");
    fs::write(overlay.join("patch.yaml"), "kind: Deployment\n").expect("write patch");

    let provided = WEB.replace("replicas: 1", "replicas: 2");
    let builder = ScriptedBuilder::new(WEB_BUILT).answer(&overlay, &provided);

    let report = Kustomizer::new(&builder)
        .with_options(options(&root))
        .pre_execute(&KustomizeStep::new(&overlay), &mut kustprep_core::MemoryState::default())
        .expect("pre_execute");

    assert!(report.substituted());
    assert_eq!(report.active_base, upstream);
    assert!(report.completed.contains(&Phase::ApplyUpstreamOverlay));
    assert!(report.upstream.iter().any(ReplaceOutcome::is_replaced));

    let calls = builder.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], overlay, "provided overlay is built from the step base");
    assert_ne!(calls[1], overlay);

    assert_eq!(replicas(&upstream.join("deploy.yaml")), Some(3));
    assert!(!upstream.join(KUSTOMIZATION_FILE).exists());
    assert_eq!(
        fs::read_to_string(overlay.join(KUSTOMIZATION_FILE)).expect("read"),
        overlay_kustomization,
        "the step base itself is never rewritten"
    );
}

#[test]
fn multiple_bases_leave_tree_untouched() {
    let root = TempDir::new().expect("root");
    let base = root.path().join("base");
    fs::create_dir_all(&base).expect("mkdir");
    fs::write(base.join("list.yaml"), LIST).expect("write list");
    fs::write(base.join(KUSTOMIZATION_FILE), "bases:\n- ../a\n- ../b\n").expect("write");

    let builder = ScriptedBuilder::new(WEB_BUILT);
    let err = Kustomizer::new(&builder)
        .with_options(options(&root))
        .pre_execute(&KustomizeStep::new(&base), &mut kustprep_core::MemoryState::default())
        .expect_err("multi-base must fail");

    assert!(err.to_string().contains("multiple bases"), "got: {err}");
    assert_eq!(file_names(&base), vec![KUSTOMIZATION_FILE, "list.yaml"]);
    assert!(builder.calls.borrow().is_empty());
}
