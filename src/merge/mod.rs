//! Combines per-SDK slices of a module into one `.xcframework`.

pub mod headers;

use crate::artifact;
use crate::build::{Linkage, Module, Sdk};
use crate::result::{ForgeError, Result};
use crate::utils::fs::remove_dir_if_exists;
use crate::utils::process::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};

pub use headers::ScratchHeaders;

/// What a merge consumed and produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub output: Option<PathBuf>,
    pub inputs: usize,
    pub expected: usize,
}

impl MergeOutcome {
    pub fn is_partial(&self) -> bool {
        self.inputs < self.expected
    }
}

pub struct SliceMerger<'a, R: CommandRunner> {
    runner: &'a R,
    program: String,
    prune_dynamic_slices: bool,
}

impl<'a, R: CommandRunner> SliceMerger<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            program: "xcodebuild".to_string(),
            prune_dynamic_slices: false,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Deletes dynamic `.framework` originals after a merge that saw every slice.
    pub fn prune_dynamic_slices(mut self, prune: bool) -> Self {
        self.prune_dynamic_slices = prune;
        self
    }

    /** Packages the slices that exist on disk into `output`
     *
     * Static slices are paired with `headers`, which is then mandatory.
     * Missing slices are skipped with a warning; with none present the
     * packaging tool is not run and no artifact is produced.
     */
    pub async fn merge(
        &self,
        output: &Path,
        slices: &[PathBuf],
        headers: Option<&Path>,
        linkage: Linkage,
    ) -> Result<MergeOutcome> {
        let headers = match (linkage, headers) {
            (Linkage::Static, None) => {
                return Err(ForgeError::config(format!(
                    "Static merge of {} requires a headers directory",
                    output.display()
                )))
            }
            (Linkage::Static, Some(h)) => Some(h),
            (Linkage::Dynamic, _) => None,
        };

        let present: Vec<&PathBuf> = slices.iter().filter(|p| p.exists()).collect();
        for missing in slices.iter().filter(|p| !p.exists()) {
            log::warn!("Slice missing, skipping: {}", missing.display());
        }

        let outcome = MergeOutcome {
            output: None,
            inputs: present.len(),
            expected: slices.len(),
        };

        if present.is_empty() {
            log::warn!("No slices found for {}, nothing to merge", output.display());
            return Ok(outcome);
        }

        if remove_dir_if_exists(output)? {
            log::warn!("Replaced existing {}", output.display());
        }

        let mut inv = Invocation::new(self.program.clone())
            .arg("-create-xcframework")
            .arg("-output")
            .path_arg(output);
        for slice in &present {
            match headers {
                Some(headers) => {
                    inv = inv
                        .arg("-library")
                        .path_arg(slice)
                        .arg("-headers")
                        .path_arg(headers);
                }
                None => inv = inv.arg("-framework").path_arg(slice),
            }
        }

        self.runner.run_checked(&inv).await?;
        log::info!(
            "Created {} from {} of {} slices",
            output.display(),
            outcome.inputs,
            outcome.expected
        );

        if linkage == Linkage::Dynamic && self.prune_dynamic_slices && !outcome.is_partial() {
            for slice in &present {
                remove_dir_if_exists(slice)?;
            }
        }

        Ok(MergeOutcome {
            output: Some(output.to_path_buf()),
            ..outcome
        })
    }

    /// Merges a module's device, simulator and Catalyst slices into
    /// `<build_root>/<binary>.xcframework`.
    pub async fn merge_module(
        &self,
        module: &Module,
        sdks: &[Sdk],
        build_root: &Path,
        configuration: &str,
        public_headers: &Path,
    ) -> Result<MergeOutcome> {
        let slices: Vec<PathBuf> = sdks
            .iter()
            .map(|&sdk| {
                artifact::slice_path(
                    build_root,
                    configuration,
                    sdk,
                    &module.root,
                    &module.binary,
                    module.linkage,
                )
            })
            .collect();
        let output = artifact::xcframework_path(build_root, &module.binary);

        match module.linkage {
            Linkage::Static => {
                let scratch = ScratchHeaders::prepare(public_headers)?;
                self.merge(&output, &slices, Some(scratch.path()), Linkage::Static)
                    .await
            }
            Linkage::Dynamic => self.merge(&output, &slices, None, Linkage::Dynamic).await,
        }
    }
}
