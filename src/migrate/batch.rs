use std::path::{Path, PathBuf};

use crate::encode::sink::PersistenceSink;
use crate::foundation::error::{CombineError, CombineResult};
use crate::migrate::material::{LegacyShader, MaterialRecord};
use crate::migrate::upgrader::MaterialUpgrader;

/// What a batch does after one material fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure; later materials are left alone.
    #[default]
    Abort,
    /// Record the failure and move on to the next material.
    KeepGoing,
}

/// One material file to upgrade and where to write the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl MaterialJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Overwrite the input with the upgraded record.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            output: path.clone(),
            input: path,
        }
    }
}

/// How one job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Upgraded,
    /// Not a legacy material (already converted, or a shader without an upgrade path).
    Skipped { shader: String },
    Failed(CombineError),
}

#[derive(Debug)]
pub struct JobReport {
    pub input: PathBuf,
    pub outcome: JobOutcome,
}

/// Per-material results of [`MaterialUpgrader::upgrade_batch`], in job order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<JobReport>,
    /// Jobs never started because the batch aborted.
    pub not_run: Vec<PathBuf>,
}

impl BatchReport {
    pub fn upgraded_count(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Upgraded))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &CombineError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            JobOutcome::Failed(err) => Some((e.input.as_path(), err)),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

impl MaterialUpgrader {
    /// Upgrade every job's material file, writing packed maps through `sink`.
    ///
    /// Records with a shader that has no upgrade path are skipped, not failed. The output of a
    /// failed job is never written.
    #[tracing::instrument(skip(self, jobs, sink), fields(jobs = jobs.len()))]
    pub fn upgrade_batch(
        &self,
        jobs: &[MaterialJob],
        policy: FailurePolicy,
        sink: &mut dyn PersistenceSink,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (i, job) in jobs.iter().enumerate() {
            let outcome = match self.run_job(job, sink) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(input = %job.input.display(), error = %err, "material failed");
                    JobOutcome::Failed(err)
                }
            };
            let failed = matches!(outcome, JobOutcome::Failed(_));
            report.entries.push(JobReport {
                input: job.input.clone(),
                outcome,
            });
            if failed && policy == FailurePolicy::Abort {
                report.not_run = jobs[i + 1..].iter().map(|j| j.input.clone()).collect();
                break;
            }
        }
        tracing::info!(
            upgraded = report.upgraded_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "batch finished"
        );
        report
    }

    fn run_job(
        &self,
        job: &MaterialJob,
        sink: &mut dyn PersistenceSink,
    ) -> CombineResult<JobOutcome> {
        let src = MaterialRecord::from_path(&job.input)?;
        if LegacyShader::from_shader_name(&src.shader).is_none() {
            tracing::debug!(input = %job.input.display(), shader = %src.shader, "skipped");
            return Ok(JobOutcome::Skipped { shader: src.shader });
        }
        let dst = self.upgrade(&src, sink)?;
        write_material(&job.output, &dst)?;
        Ok(JobOutcome::Upgraded)
    }
}

/// Write `record` as pretty JSON, creating parent directories.
pub fn write_material(path: &Path, record: &MaterialRecord) -> CombineResult<()> {
    let json = record.to_json_pretty()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CombineError::persistence(format!("create dir '{}': {e}", parent.display()))
        })?;
    }
    std::fs::write(path, json + "\n").map_err(|e| {
        CombineError::persistence(format!("write material '{}': {e}", path.display()))
    })
}

/// Material JSON files under `dir`, recursively, sorted by path. Import sidecars are ignored.
pub fn find_material_files(dir: &Path) -> CombineResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    collect_json(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) -> CombineResult<()> {
    let rd = std::fs::read_dir(dir).map_err(|e| {
        CombineError::validation(format!("read material dir '{}': {e}", dir.display()))
    })?;
    for entry in rd {
        let path = entry
            .map_err(|e| CombineError::validation(format!("read '{}': {e}", dir.display())))?
            .path();
        if path.is_dir() {
            collect_json(&path, out)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let name = name.to_ascii_lowercase();
        if name.ends_with(".json") && !name.ends_with(".import.json") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/migrate/batch.rs"]
mod tests;
