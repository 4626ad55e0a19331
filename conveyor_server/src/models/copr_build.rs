//! copr_build_targets — one row per (Copr build, chroot) pair.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Text};
use serde::{Deserialize, Serialize};

use crate::schema::copr_build_targets;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = copr_build_targets)]
pub struct CoprBuildTarget {
    pub id: i64,
    pub build_id: String,
    pub project_name: String,
    pub owner: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
    pub srpm_build_id: Option<i64>,
    pub built_packages: Option<serde_json::Value>,
    pub build_submitted_time: Option<DateTime<Utc>>,
    pub build_start_time: Option<DateTime<Utc>>,
    pub build_finished_time: Option<DateTime<Utc>>,
    pub pr_id: Option<i32>,
    pub branch_name: Option<String>,
    pub repo_namespace: Option<String>,
    pub repo_name: Option<String>,
    pub project_url: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = copr_build_targets)]
pub struct NewCoprBuildTarget {
    pub build_id: String,
    pub project_name: String,
    pub owner: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub pr_id: Option<i32>,
    pub branch_name: Option<String>,
    pub repo_namespace: Option<String>,
    pub repo_name: Option<String>,
    pub project_url: Option<String>,
    pub build_submitted_time: Option<DateTime<Utc>>,
}

/// One logical build aggregated across its chroot rows.
#[derive(Debug, QueryableByName)]
pub struct MergedBuildRow {
    #[diesel(sql_type = Text)]
    pub build_id: String,
    #[diesel(sql_type = Array<Text>)]
    pub targets: Vec<String>,
    #[diesel(sql_type = Array<Text>)]
    pub statuses: Vec<String>,
    #[diesel(sql_type = Array<BigInt>)]
    pub target_ids: Vec<i64>,
}

/// Render an optional timestamp as epoch seconds.
pub fn optional_timestamp(time: Option<DateTime<Utc>>) -> Option<i64> {
    time.map(|t| t.timestamp())
}
