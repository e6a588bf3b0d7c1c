//! Job definitions and the directory-backed job store.
//!
//! Job files are YAML documents with a top-level `jobs` mapping:
//!
//! ```yaml
//! jobs:
//!   greet_user:
//!     description: Say hello
//!     steps:
//!       - name: greet
//!         call: life_jobs.shell.run
//!         args:
//!           command: "echo Hello {name}!"
//! ```
//!
//! Every `*.yaml` / `*.yml` file in the directory is read in sorted filename
//! order and merged. A job id defined in more than one file takes the
//! definition from the last file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{JobError, JobLoadError, Result};

/// Loaded jobs keyed by id.
pub type Jobs = BTreeMap<String, JobDefinition>;

/// A named sequence of steps.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct JobDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// A single call to a step function.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepDefinition {
    #[serde(default = "default_step_name")]
    pub name: String,
    pub call: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

fn default_step_name() -> String {
    "unnamed".to_string()
}

/// Brief listing entry for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub description: String,
}

/// Something the runner can load job definitions from.
pub trait JobSource {
    fn load(&self) -> Result<Jobs>;
}

impl JobSource for Jobs {
    fn load(&self) -> Result<Jobs> {
        Ok(self.clone())
    }
}

/// Result of scanning a directory: every job that parsed plus every file that didn't.
#[derive(Debug, Default)]
pub struct JobScan {
    pub jobs: Jobs,
    pub errors: Vec<(PathBuf, String)>,
}

impl JobScan {
    /// Convert into the loaded jobs, failing if any file was invalid.
    pub fn into_result(self) -> std::result::Result<Jobs, JobLoadError> {
        if self.errors.is_empty() {
            Ok(self.jobs)
        } else {
            Err(JobLoadError {
                errors: self.errors,
            })
        }
    }
}

/// Directory of YAML job files.
#[derive(Debug, Clone)]
pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted list of job files. A missing directory has none.
    pub fn files(&self) -> std::io::Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e == "yaml" || e == "yml")
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Parse every job file, keeping the jobs that loaded and recording per-file errors.
    ///
    /// Only use [`JobScan::jobs`] from a scan with errors for reporting.
    pub fn scan(&self) -> std::io::Result<JobScan> {
        let mut scan = JobScan::default();

        for path in self.files()? {
            match parse_job_file(&path) {
                Ok(jobs) => {
                    for (job_id, job) in jobs {
                        if scan.jobs.insert(job_id.clone(), job).is_some() {
                            debug!(job_id = %job_id, file = %path.display(), "job redefined by later file");
                        }
                    }
                }
                Err(e) => scan.errors.push((path, e)),
            }
        }

        Ok(scan)
    }

    /// Look up a single job.
    pub fn get(&self, job_id: &str) -> Result<JobDefinition> {
        let mut jobs = self.load()?;
        jobs.remove(job_id).ok_or_else(|| JobError::JobNotFound {
            job_id: job_id.to_string(),
            available: jobs.into_keys().collect(),
        })
    }

    /// Job ids with descriptions, sorted by id.
    pub fn list(&self) -> Result<Vec<JobSummary>> {
        Ok(self
            .load()?
            .into_iter()
            .map(|(job_id, job)| JobSummary {
                job_id,
                description: job.description,
            })
            .collect())
    }
}

impl JobSource for JobStore {
    /// Load every job, failing with all per-file errors if any file is invalid.
    fn load(&self) -> Result<Jobs> {
        Ok(self.scan()?.into_result()?)
    }
}

fn parse_job_file(path: &Path) -> std::result::Result<Jobs, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let doc: Option<serde_yaml::Value> = serde_yaml::from_str(&content).map_err(|e| e.to_string())?;

    let jobs = match doc {
        Some(serde_yaml::Value::Mapping(mut map)) => map.remove("jobs"),
        _ => None,
    };

    match jobs {
        None | Some(serde_yaml::Value::Null) => Ok(Jobs::new()),
        Some(jobs) => serde_yaml::from_value(jobs).map_err(|e| e.to_string()),
    }
}

/// Load every job in `dir`.
pub fn load_jobs(dir: impl AsRef<Path>) -> Result<Jobs> {
    JobStore::new(dir.as_ref()).load()
}

/// Load `dir` and look up `job_id`.
pub fn get_job(dir: impl AsRef<Path>, job_id: &str) -> Result<JobDefinition> {
    JobStore::new(dir.as_ref()).get(job_id)
}

/// List the jobs in `dir`, sorted by id.
pub fn list_jobs(dir: impl AsRef<Path>) -> Result<Vec<JobSummary>> {
    JobStore::new(dir.as_ref()).list()
}
