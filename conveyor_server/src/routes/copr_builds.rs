//! Copr build reporting — the merged list and single-chroot detail views.

use std::collections::BTreeMap;

use diesel_async::AsyncPgConnection;
use serde::{Deserialize, Serialize};

use crate::models::copr_build::optional_timestamp;
use crate::services::build_records;

/// Range-style pagination over the merged build listing.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Map page/per_page onto (first, last) row indices.
pub fn indices(pagination: &Pagination) -> (i64, i64) {
    let page = pagination.page.unwrap_or(1).max(1);
    let per_page = pagination.per_page.unwrap_or(20).clamp(1, 100);
    ((page - 1) * per_page, page * per_page)
}

/// `Content-Range` value for a listing response, 1-based.
pub fn content_range(first: i64, last: i64) -> String {
    format!("copr-builds {}-{}/*", first + 1, last)
}

/// One logical build in the paginated listing.
#[derive(Debug, Serialize)]
pub struct CoprBuildSummary {
    pub id: i64,
    pub project: String,
    pub build_id: String,
    pub status_per_chroot: BTreeMap<String, String>,
    pub id_per_chroot: BTreeMap<String, i64>,
    pub build_submitted_time: Option<i64>,
    pub web_url: Option<String>,
    #[serde(rename = "ref")]
    pub commit_sha: String,
    pub pr_id: Option<i32>,
    pub branch_name: Option<String>,
    pub repo_namespace: Option<String>,
    pub repo_name: Option<String>,
    pub project_url: Option<String>,
}

/// Detail view of one (build, chroot) row.
#[derive(Debug, Serialize)]
pub struct CoprBuildDetail {
    pub build_id: String,
    pub status: String,
    pub chroot: String,
    pub build_submitted_time: Option<i64>,
    pub build_start_time: Option<i64>,
    pub build_finished_time: Option<i64>,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
    pub copr_project: String,
    pub copr_owner: String,
    pub srpm_build_id: Option<i64>,
    pub run_ids: Vec<i64>,
    pub built_packages: Option<serde_json::Value>,
    pub repo_namespace: Option<String>,
    pub repo_name: Option<String>,
    pub project_url: Option<String>,
    pub pr_id: Option<i32>,
    pub branch_name: Option<String>,
}

/// List merged builds for the dashboard table.
///
/// Builds still waiting on their source RPM stage carry no useful state and
/// are filtered out.
pub async fn list_builds(
    conn: &mut AsyncPgConnection,
    first: i64,
    last: i64,
) -> anyhow::Result<Vec<CoprBuildSummary>> {
    let mut result = Vec::new();

    for merged in build_records::get_merged_chroots(conn, first, last).await? {
        let Some(info) = build_records::get_by_build_id(conn, &merged.build_id).await? else {
            continue;
        };
        if info.status == "waiting_for_srpm" {
            continue;
        }

        let mut status_per_chroot = BTreeMap::new();
        let mut id_per_chroot = BTreeMap::new();
        for (i, chroot) in merged.targets.iter().enumerate() {
            if let Some(status) = merged.statuses.get(i) {
                status_per_chroot.insert(chroot.clone(), status.clone());
            }
            if let Some(target_id) = merged.target_ids.get(i) {
                id_per_chroot.insert(chroot.clone(), *target_id);
            }
        }

        result.push(CoprBuildSummary {
            id: info.id,
            project: info.project_name,
            build_id: merged.build_id,
            status_per_chroot,
            id_per_chroot,
            build_submitted_time: optional_timestamp(info.build_submitted_time),
            web_url: info.web_url,
            commit_sha: info.commit_sha,
            pr_id: info.pr_id,
            branch_name: info.branch_name,
            repo_namespace: info.repo_namespace,
            repo_name: info.repo_name,
            project_url: info.project_url,
        });
    }

    Ok(result)
}

/// Detail of one chroot row, `None` when the id is unknown.
pub async fn get_build_detail(
    conn: &mut AsyncPgConnection,
    id: i64,
) -> anyhow::Result<Option<CoprBuildDetail>> {
    let Some(build) = build_records::get_by_id(conn, id).await? else {
        return Ok(None);
    };

    let run_ids = build_records::run_ids_for_target(conn, build.id).await?;

    Ok(Some(CoprBuildDetail {
        build_id: build.build_id,
        status: build.status,
        chroot: build.target,
        build_submitted_time: optional_timestamp(build.build_submitted_time),
        build_start_time: optional_timestamp(build.build_start_time),
        build_finished_time: optional_timestamp(build.build_finished_time),
        commit_sha: build.commit_sha,
        web_url: build.web_url,
        build_logs_url: build.build_logs_url,
        copr_project: build.project_name,
        copr_owner: build.owner,
        srpm_build_id: build.srpm_build_id,
        run_ids,
        built_packages: build.built_packages,
        repo_namespace: build.repo_namespace,
        repo_name: build.repo_name,
        project_url: build.project_url,
        pr_id: build.pr_id,
        branch_name: build.branch_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_defaults() {
        let (first, last) = indices(&Pagination::default());
        assert_eq!((first, last), (0, 20));
    }

    #[test]
    fn test_indices_second_page() {
        let pagination = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(indices(&pagination), (20, 30));
    }

    #[test]
    fn test_indices_clamp_bogus_input() {
        let pagination = Pagination {
            page: Some(0),
            per_page: Some(100_000),
        };
        let (first, last) = indices(&pagination);
        assert_eq!(first, 0);
        assert_eq!(last, 100);
    }

    #[test]
    fn test_content_range_is_one_based() {
        assert_eq!(content_range(0, 20), "copr-builds 1-20/*");
        assert_eq!(content_range(20, 30), "copr-builds 21-30/*");
    }

    #[test]
    fn test_summary_serializes_commit_as_ref() {
        let summary = CoprBuildSummary {
            id: 1,
            project: "packit-ogr-21".to_string(),
            build_id: "123456".to_string(),
            status_per_chroot: BTreeMap::from([(
                "fedora-40-x86_64".to_string(),
                "success".to_string(),
            )]),
            id_per_chroot: BTreeMap::from([("fedora-40-x86_64".to_string(), 1)]),
            build_submitted_time: Some(1_700_000_000),
            web_url: None,
            commit_sha: "abc123".to_string(),
            pr_id: Some(21),
            branch_name: None,
            repo_namespace: Some("packit".to_string()),
            repo_name: Some("ogr".to_string()),
            project_url: Some("https://github.com/packit/ogr".to_string()),
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["ref"], "abc123");
        assert!(value.get("commit_sha").is_none());
        assert_eq!(value["status_per_chroot"]["fedora-40-x86_64"], "success");
    }
}
