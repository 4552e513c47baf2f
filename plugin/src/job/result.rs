//! Run result reported back to the caller

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::PluginError;
use crate::job::context::JobContext;

/// Final status of a plugin run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Fail,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "Success"),
            Status::Fail => write!(f, "Fail"),
        }
    }
}

/// Result of a plugin run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunResult {
    pub status: Status,

    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub outputs: HashMap<String, String>,
}

impl RunResult {
    /// Successful run with outputs
    pub fn success(outputs: HashMap<String, String>) -> Self {
        Self {
            status: Status::Success,
            details: String::new(),
            outputs,
        }
    }

    /// Failed run
    ///
    /// The cause is logged on the job and redacted before it becomes the
    /// result details.
    pub fn fail(job: &dyn JobContext, err: &PluginError) -> Self {
        let details = err.to_string();
        job.error(&details);
        Self {
            status: Status::Fail,
            details: job.redact(&details).into_owned(),
            outputs: HashMap::new(),
        }
    }

    /// Convert the outcome of a deployment into the result contract
    pub fn from_outcome(
        job: &dyn JobContext,
        outcome: Result<HashMap<String, String>, PluginError>,
    ) -> Self {
        match outcome {
            Ok(outputs) => Self::success(outputs),
            Err(e) => Self::fail(job, &e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
