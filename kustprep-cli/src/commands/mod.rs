pub mod lists;
pub mod prepare;
pub mod split;

use std::path::Path;

use anyhow::{Context, Result};
use kustprep_core::{NonYamlPolicy, PipelineOptions};

/// State file used when `--state` is not given.
pub const DEFAULT_STATE_FILE: &str = ".kustprep/state.yaml";

/// Pipeline options from `--config` (if any), with command-line overrides applied.
pub fn load_options(config: Option<&Path>, skip_non_yaml: bool) -> Result<PipelineOptions> {
    let mut options = match config {
        Some(path) => {
            tracing::debug!("loading options from {}", path.display());
            PipelineOptions::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => PipelineOptions::default(),
    };
    if skip_non_yaml {
        options.non_yaml = NonYamlPolicy::SkipFile;
    }
    Ok(options)
}
