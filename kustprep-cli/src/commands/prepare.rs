//! `kustprep prepare`: the full pre-kustomize pipeline.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::{ColoredString, Colorize};

use kustprep_core::{FileState, KustomizeStep};
use kustprep_pipeline::{KustomizeCli, Kustomizer, PipelineError, PreExecuteReport, ReplaceOutcome};

use super::{load_options, DEFAULT_STATE_FILE};

/// Arguments for `kustprep prepare`.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Base directory whose manifests are rewritten in place.
    pub base: PathBuf,

    /// Directory with patch files to apply on top of the base.
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Also write every built resource to its own file in this directory.
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// State file recording expanded List files.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// kustomize executable to run.
    #[arg(long, default_value = "kustomize")]
    pub kustomize: PathBuf,

    /// YAML file with pipeline options.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip non-YAML files instead of stopping at them.
    #[arg(long)]
    pub skip_non_yaml: bool,
}

impl PrepareArgs {
    pub fn run(self) -> Result<()> {
        let options = load_options(self.config.as_deref(), self.skip_non_yaml)?;
        let step = KustomizeStep {
            overlay: self.overlay,
            dest: self.dest,
            ..KustomizeStep::new(&self.base)
        };
        let mut state = FileState::new(&self.state);

        let report = Kustomizer::new(KustomizeCli::new(&self.kustomize))
            .with_options(options)
            .pre_execute(&step, &mut state)
            .map_err(|e| with_category(e, &self.base))?;

        print_report(&report);
        Ok(())
    }
}

fn with_category(err: PipelineError, base: &Path) -> anyhow::Error {
    let category = err.category();
    anyhow::Error::new(err).context(format!(
        "prepare failed for {} ({category} error)",
        base.display()
    ))
}

fn print_report(report: &PreExecuteReport) {
    if report.substituted() {
        println!(
            "{} {} uses upstream base {}",
            "→".cyan(),
            report.original_base.display(),
            report.active_base.display()
        );
    }

    let replaced = count(&report.replaced, |o| o.is_replaced());
    let unchanged = count(&report.replaced, |o| {
        matches!(o, ReplaceOutcome::Unchanged { .. })
    });
    println!(
        "{} '{}' prepared ({} replaced, {} unchanged, {} split)",
        "✓".green().bold(),
        report.active_base.display(),
        replaced,
        unchanged,
        report.split.written.len()
    );

    for path in &report.split.written {
        println!("  ✂  {}", path.display());
    }
    for outcome in report.upstream.iter().chain(&report.replaced) {
        if let Some(glyph) = glyph(outcome) {
            println!("  {}  {}", glyph, outcome.path().display());
        }
    }
    for path in &report.dest_files {
        println!("  +  {}", path.display());
    }
}

/// Outcomes worth a line of their own; the rest only show up in the counts.
fn glyph(outcome: &ReplaceOutcome) -> Option<ColoredString> {
    match outcome {
        ReplaceOutcome::Replaced { .. } => Some("✎".normal()),
        ReplaceOutcome::Unchanged { .. } => Some("·".normal()),
        ReplaceOutcome::PrunedKustomization { .. } => Some("✗".bright_black()),
        ReplaceOutcome::SkippedCrd { .. }
        | ReplaceOutcome::NoMatch { .. }
        | ReplaceOutcome::Excluded { .. } => None,
    }
}

fn count(outcomes: &[ReplaceOutcome], pred: impl Fn(&ReplaceOutcome) -> bool) -> usize {
    outcomes.iter().filter(|o| pred(o)).count()
}
