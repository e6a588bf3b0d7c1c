//! Config-driven tasks for Life-CLI.
//!
//! Each task in `life.yml` is one or more shell commands with `{variable}`
//! placeholders. This crate fills those placeholders, runs the commands, and
//! for incremental syncs keeps a high-water mark per task in a JSON state file.
//!
//! - [`CommandRunner`]: substitution, dry-run, and `sh -c` execution
//! - [`TaskRunner`]: sync/merge/process/status dispatch over a [`LifeConfig`]
//! - [`StateTracker`]: incremental sync state
//! - [`parse_date_range`]: `7d` / `2w` / `1m` into ISO dates
//!
//! [`LifeConfig`]: life_config::LifeConfig

pub mod command;
pub mod dates;
pub mod error;
pub mod state;
pub mod task;

pub use command::CommandRunner;
pub use dates::{date_variables, parse_date_range};
pub use error::{Result, TaskError};
pub use state::{LAST_RUN_FIELD, State, StateTracker, utc_timestamp};
pub use task::{DEFAULT_INCREMENTAL_FORMAT, MergeOutcome, TaskListing, TaskRun, TaskRunner};
