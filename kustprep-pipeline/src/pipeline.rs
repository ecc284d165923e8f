//! The pre-kustomize pipeline.
//!
//! ```text
//! ResolveBase → Normalize → [ApplyUpstreamOverlay] → WriteConfig → Build
//!             → [WritePostKustomize] → Reconcile
//! ```
//!
//! Phases run strictly one after another. A [`CancelToken`] is only looked at
//! between phases, never inside a directory walk or a build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kustprep_core::{KustomizeStep, PipelineOptions, StateManager};

use crate::base;
use crate::error::PipelineError;
use crate::overlay::{self, BuiltResources, OverlayBuilder, TempOverlayDir};
use crate::reconcile::{self, ReplaceOutcome};
use crate::resolver;
use crate::split::{self, SplitOutcome};

// ---------------------------------------------------------------------------
// Phases and cancellation
// ---------------------------------------------------------------------------

/// One step of [`Kustomizer::pre_execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolveBase,
    Normalize,
    ApplyUpstreamOverlay,
    WriteConfig,
    Build,
    WritePostKustomize,
    Reconcile,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::ResolveBase => "maybe find existing base",
            Phase::Normalize => "maybe split yaml",
            Phase::ApplyUpstreamOverlay => "run provided kustomization yaml",
            Phase::WriteConfig => "write base kustomization",
            Phase::Build => "build overlay",
            Phase::WritePostKustomize => "write initial kustomized yaml",
            Phase::Reconcile => "replace original yaml",
        };
        f.write_str(s)
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Everything a successful [`Kustomizer::pre_execute`] did.
#[derive(Debug, Clone, Default)]
pub struct PreExecuteReport {
    /// Base named by the step.
    pub original_base: PathBuf,
    /// Base the pipeline worked on; differs from `original_base` when the
    /// step's base pointed at an upstream base.
    pub active_base: PathBuf,
    pub split: SplitOutcome,
    /// Files of the upstream base rewritten with the step base's overlay.
    pub upstream: Vec<ReplaceOutcome>,
    pub dest_files: Vec<PathBuf>,
    pub replaced: Vec<ReplaceOutcome>,
    pub completed: Vec<Phase>,
}

impl PreExecuteReport {
    pub fn substituted(&self) -> bool {
        self.original_base != self.active_base
    }
}

// ---------------------------------------------------------------------------
// Kustomizer
// ---------------------------------------------------------------------------

/// Runs the pipeline against an [`OverlayBuilder`].
#[derive(Debug)]
pub struct Kustomizer<B> {
    builder: B,
    options: PipelineOptions,
    cancel: CancelToken,
}

impl<B: OverlayBuilder> Kustomizer<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            options: PipelineOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Prepare `step.base` for overlay and reconcile it with the built output.
    pub fn pre_execute(
        &self,
        step: &KustomizeStep,
        state: &mut dyn StateManager,
    ) -> Result<PreExecuteReport, PipelineError> {
        let mut report = PreExecuteReport {
            original_base: step.base.clone(),
            ..PreExecuteReport::default()
        };

        self.checkpoint(Phase::ResolveBase)?;
        let resolution =
            resolver::contains_base(&step.base).map_err(|e| e.in_phase(Phase::ResolveBase))?;
        let active = resolution.active().to_path_buf();
        report.active_base = active.clone();
        self.complete(&mut report, Phase::ResolveBase);

        self.checkpoint(Phase::Normalize)?;
        report.split = self
            .normalize(&active, state)
            .map_err(|e| e.in_phase(Phase::Normalize))?;
        self.complete(&mut report, Phase::Normalize);

        if let Some(upstream) = &resolution.resolved {
            self.checkpoint(Phase::ApplyUpstreamOverlay)?;
            report.upstream = self
                .run_provided_overlays(&resolution.original, upstream)
                .map_err(|e| e.in_phase(Phase::ApplyUpstreamOverlay))?;
            self.complete(&mut report, Phase::ApplyUpstreamOverlay);
        }

        self.checkpoint(Phase::WriteConfig)?;
        let temp = self
            .write_config(&active, step.overlay.as_deref())
            .map_err(|e| e.in_phase(Phase::WriteConfig))?;
        self.complete(&mut report, Phase::WriteConfig);

        self.checkpoint(Phase::Build)?;
        let built = self
            .build(temp.path())
            .map_err(|e| e.in_phase(Phase::Build))?;
        drop(temp);
        self.complete(&mut report, Phase::Build);

        if let Some(dest) = &step.dest {
            self.checkpoint(Phase::WritePostKustomize)?;
            report.dest_files = reconcile::write_post_kustomize_files(dest, &built)
                .map_err(|e| e.in_phase(Phase::WritePostKustomize))?;
            self.complete(&mut report, Phase::WritePostKustomize);
        }

        self.checkpoint(Phase::Reconcile)?;
        report.replaced = reconcile::replace_original(&active, &built)
            .map_err(|e| e.in_phase(Phase::Reconcile))?;
        self.complete(&mut report, Phase::Reconcile);

        Ok(report)
    }

    /// Split multi-document files (if enabled), then `List` files, under `base`.
    pub fn normalize(
        &self,
        base: &Path,
        state: &mut dyn StateManager,
    ) -> Result<SplitOutcome, PipelineError> {
        let mut outcome = SplitOutcome::default();
        if self.options.split_multidoc {
            outcome.extend(split::maybe_split_multidoc_yaml(base, self.options.non_yaml)?);
        }
        outcome.extend(split::maybe_split_list_yaml(base, self.options.non_yaml, state)?);
        Ok(outcome)
    }

    /// Apply `original`'s own kustomization to `upstream` and write the result
    /// into `upstream`, so later phases can use `upstream` alone.
    fn run_provided_overlays(
        &self,
        original: &Path,
        upstream: &Path,
    ) -> Result<Vec<ReplaceOutcome>, PipelineError> {
        base::write_base(upstream)?;
        let built = self
            .build(original)
            .map_err(|e| e.in_phase(Phase::Build))?;
        reconcile::replace_original(upstream, &built)
    }

    fn write_config(
        &self,
        active: &Path,
        overlay_dir: Option<&Path>,
    ) -> Result<TempOverlayDir, PipelineError> {
        base::write_base(active)?;
        let temp = TempOverlayDir::create(self.options.temp_root.as_deref())?;
        overlay::write_overlay(temp.path(), active, overlay_dir)?;
        Ok(temp)
    }

    fn build(&self, dir: &Path) -> Result<BuiltResources, PipelineError> {
        let resources = self.builder.build(dir)?;
        tracing::debug!("built {} resources from {}", resources.len(), dir.display());
        BuiltResources::from_resources(resources)
    }

    fn checkpoint(&self, next: Phase) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::info!("cancelled before {next}");
            return Err(PipelineError::Cancelled { phase: next });
        }
        Ok(())
    }

    fn complete(&self, report: &mut PreExecuteReport, phase: Phase) {
        tracing::info!("{phase}: done");
        report.completed.push(phase);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
