//! Per-project job configuration — which automated jobs run, and when.
//!
//! Deserialized from the `package_config` JSON stored with a project.
//! Checkers treat these as read-only inputs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The automated job a checker pipeline protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    CoprBuild,
    UpstreamKojiBuild,
    BodhiUpdate,
    VmImageBuild,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CoprBuild => "copr_build",
            JobType::UpstreamKojiBuild => "upstream_koji_build",
            JobType::BodhiUpdate => "bodhi_update",
            JobType::VmImageBuild => "vm_image_build",
        }
    }
}

/// What kind of forge activity starts the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Commit,
    PullRequest,
    Release,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job: JobType,
    pub trigger: JobTrigger,
    /// Copr chroots / Koji targets the job builds for.
    #[serde(default)]
    pub targets: BTreeSet<String>,
    /// Dist-git branches (or branch aliases) the job acts on.
    #[serde(default)]
    pub dist_git_branches: BTreeSet<String>,
    /// Single branch override for commit-triggered jobs.
    #[serde(default)]
    pub branch: Option<String>,
    /// Scratch (throwaway) build rather than a production one.
    #[serde(default)]
    pub scratch: bool,
    /// Repository receiving denial reports, overrides the package-level one.
    #[serde(default)]
    pub issue_repository: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default)]
    pub downstream_package_name: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    #[serde(default)]
    pub issue_repository: Option<String>,
}

impl PackageConfig {
    /// The issue repository for a job, job-level setting first.
    pub fn issue_repository_for<'a>(&'a self, job: &'a JobConfig) -> Option<&'a str> {
        job.issue_repository
            .as_deref()
            .or(self.issue_repository.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_package_config_from_json() {
        let value = json!({
            "downstream_package_name": "knx-stack",
            "issue_repository": "https://github.com/mmassari/knx-stack-issues",
            "jobs": [
                {
                    "job": "copr_build",
                    "trigger": "pull_request",
                    "targets": ["fedora-40-x86_64"]
                },
                {
                    "job": "bodhi_update",
                    "trigger": "commit",
                    "dist_git_branches": ["fedora-stable"]
                },
                {
                    "job": "upstream_koji_build",
                    "trigger": "pull_request",
                    "scratch": true,
                    "branch": "release"
                }
            ]
        });

        let config: PackageConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.jobs.len(), 3);
        assert_eq!(config.jobs[0].job, JobType::CoprBuild);
        assert_eq!(config.jobs[0].trigger, JobTrigger::PullRequest);
        assert!(config.jobs[0].targets.contains("fedora-40-x86_64"));
        assert_eq!(config.jobs[1].job, JobType::BodhiUpdate);
        assert!(config.jobs[1].dist_git_branches.contains("fedora-stable"));
        assert!(config.jobs[2].scratch);
        assert_eq!(config.jobs[2].branch.as_deref(), Some("release"));
    }

    #[test]
    fn test_issue_repository_job_level_wins() {
        let mut config: PackageConfig = serde_json::from_value(json!({
            "issue_repository": "https://github.com/org/package-issues",
            "jobs": [{"job": "bodhi_update", "trigger": "commit"}]
        }))
        .unwrap();

        let job = config.jobs[0].clone();
        assert_eq!(
            config.issue_repository_for(&job),
            Some("https://github.com/org/package-issues")
        );

        config.jobs[0].issue_repository = Some("https://github.com/org/overrides".into());
        let job = config.jobs[0].clone();
        assert_eq!(
            config.issue_repository_for(&job),
            Some("https://github.com/org/overrides")
        );
    }
}
