//! `kustprep split`: normalization only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kustprep_core::FileState;
use kustprep_pipeline::{contains_base, KustomizeCli, Kustomizer};

use super::{load_options, DEFAULT_STATE_FILE};

/// Arguments for `kustprep split`.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Base directory to normalize. An upstream base it points at is used instead.
    pub base: PathBuf,

    /// State file recording expanded List files.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// YAML file with pipeline options.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip non-YAML files instead of stopping at them.
    #[arg(long)]
    pub skip_non_yaml: bool,
}

impl SplitArgs {
    pub fn run(self) -> Result<()> {
        let options = load_options(self.config.as_deref(), self.skip_non_yaml)?;
        let resolution = contains_base(&self.base)
            .with_context(|| format!("failed to resolve base {}", self.base.display()))?;
        let active = resolution.active();

        // The builder is never invoked by normalization.
        let kustomizer = Kustomizer::new(KustomizeCli::default()).with_options(options);
        let mut state = FileState::new(&self.state);
        let outcome = kustomizer
            .normalize(active, &mut state)
            .with_context(|| format!("split failed for {}", active.display()))?;

        if outcome.is_empty() {
            println!("✓ '{}' — nothing to split", active.display());
            return Ok(());
        }

        println!(
            "{} '{}' split ({} written, {} removed, {} lists recorded)",
            "✓".green().bold(),
            active.display(),
            outcome.written.len(),
            outcome.removed.len(),
            outcome.lists.len()
        );
        for path in &outcome.removed {
            println!("  {}  {}", "✗".bright_black(), path.display());
        }
        for path in &outcome.written {
            println!("  ✂  {}", path.display());
        }
        Ok(())
    }
}
