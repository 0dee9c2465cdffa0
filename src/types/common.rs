//! Common types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the job whose log summary is streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobLogRef {
    /// Project ID.
    pub project_id: u64,
    /// Job ID within the project.
    pub job_id: u64,
}

impl JobLogRef {
    /// Creates a new job reference.
    pub fn new(project_id: u64, job_id: u64) -> Self {
        Self { project_id, job_id }
    }

    /// Path of the streaming summary endpoint, relative to the base URL.
    pub fn stream_path(&self) -> String {
        format!(
            "gitlab/pipelines/{}/jobs/{}/log/stream",
            self.project_id, self.job_id
        )
    }
}

impl fmt::Display for JobLogRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_path() {
        let job = JobLogRef::new(12, 345);
        assert_eq!(job.stream_path(), "gitlab/pipelines/12/jobs/345/log/stream");
        assert_eq!(job.to_string(), "12/345");
    }
}
