//! Event processing — match jobs, run checkers, dispatch to build systems.
//!
//! One pipeline run per inbound event: for each configured job whose trigger
//! covers the event, the job's checkers run in order; the job handler only
//! fires once every checker agreed.

use std::collections::BTreeSet;
use std::sync::Arc;

use diesel_async::AsyncPgConnection;

use crate::checkers::bodhi::{
    HasIssueCommenterRetriggeringPermissions, IsAuthorAPackager,
    IsKojiBuildCompleteAndBranchConfigured,
};
use crate::checkers::koji::PermissionOnKojiBuild;
use crate::checkers::vm_image::{HasAuthorWriteAccess, IsCoprBuildForChrootOk};
use crate::checkers::{run_checkers, Checker};
use crate::events::koji::KojiBuildData;
use crate::events::{EventData, EventKind};
use crate::models::copr_build::NewCoprBuildTarget;
use crate::models::job::{JobConfig, JobTrigger, JobType, PackageConfig};
use crate::models::project::Project;
use crate::routes::ServiceState;
use crate::services::branches::get_branches;
use crate::services::build_records;
use crate::services::forge::{ForgeStatusReporter, GitProject};
use crate::services::koji::{EventKojiBuildSource, KojiBuildDataSource, KojiServiceSource};
use crate::services::projects;
use crate::services::reporting::{ForgeIssueReporter, IssueReporter, LogOnlyReporter};

/// Does the job's trigger cover this event kind?
///
/// Comment events count as retrigger requests for the jobs they can retry.
pub fn job_matches_event(job: &JobConfig, kind: EventKind) -> bool {
    match job.trigger {
        JobTrigger::Commit => matches!(
            kind,
            EventKind::PushGithub
                | EventKind::PushGitlab
                | EventKind::PushPagure
                | EventKind::KojiBuild
                | EventKind::IssueCommentGithub
                | EventKind::IssueCommentGitlab
                | EventKind::PullRequestCommentPagure
        ),
        JobTrigger::PullRequest => matches!(
            kind,
            EventKind::PullRequestGithub
                | EventKind::MergeRequestGitlab
                | EventKind::PullRequestCommentGithub
        ),
        // TODO: wire forge release events through the bus bridge.
        JobTrigger::Release => false,
    }
}

fn issue_reporter(
    state: &ServiceState,
    package_config: &PackageConfig,
    job: &JobConfig,
) -> anyhow::Result<Arc<dyn IssueReporter>> {
    match package_config.issue_repository_for(job) {
        Some(url) => Ok(Arc::new(ForgeIssueReporter {
            project: Arc::new(state.forge.project(url)?),
        })),
        None => Ok(Arc::new(LogOnlyReporter)),
    }
}

/// Assemble the checkers protecting one job for one event.
fn checkers_for(
    state: &ServiceState,
    package_config: &PackageConfig,
    job: &JobConfig,
    event: &EventData,
    koji_build: Option<&KojiBuildData>,
) -> anyhow::Result<Vec<Box<dyn Checker>>> {
    let project: Arc<dyn GitProject> = Arc::new(state.forge.project(&event.project_url)?);
    let actor = event.actor.clone().unwrap_or_default();

    let checkers: Vec<Box<dyn Checker>> = match job.job {
        // Copr PR builds are open to everyone; trigger matching is enough.
        JobType::CoprBuild => vec![],
        JobType::UpstreamKojiBuild => {
            let status = Arc::new(ForgeStatusReporter {
                project: project.clone(),
                commit_sha: event.commit_sha.clone(),
                context: "conveyor/koji-build".to_string(),
            });
            vec![Box::new(PermissionOnKojiBuild {
                job_config: job.clone(),
                data: event.clone(),
                project,
                status,
                admins: state.config.admins.clone(),
            })]
        }
        JobType::BodhiUpdate => {
            let reporter = issue_reporter(state, package_config, job)?;
            let source: Arc<dyn KojiBuildDataSource> = match koji_build {
                // The build event itself already carries the facts.
                Some(data) => Arc::new(EventKojiBuildSource { data: data.clone() }),
                // Comment retriggers go through the Koji hub.
                None => {
                    let package = package_config
                        .downstream_package_name
                        .clone()
                        .unwrap_or_else(|| project.repo().to_string());
                    Arc::new(KojiServiceSource {
                        koji: state.koji.clone(),
                        package,
                        branches: configured_update_branches(job),
                    })
                }
            };
            vec![
                Box::new(IsAuthorAPackager {
                    data: event.clone(),
                    actor: actor.clone(),
                    packagers: state.packagers.clone(),
                    reporter: reporter.clone(),
                }),
                Box::new(HasIssueCommenterRetriggeringPermissions {
                    data: event.clone(),
                    actor,
                    project: project.clone(),
                    reporter,
                }),
                Box::new(IsKojiBuildCompleteAndBranchConfigured {
                    job_config: job.clone(),
                    data: event.clone(),
                    source,
                }),
            ]
        }
        JobType::VmImageBuild => vec![
            Box::new(HasAuthorWriteAccess {
                data: event.clone(),
                actor,
                project: project.clone(),
            }),
            Box::new(IsCoprBuildForChrootOk {
                job_config: job.clone(),
                data: event.clone(),
                store: state.copr_builds.clone(),
                project,
            }),
        ],
    };
    Ok(checkers)
}

fn configured_update_branches(job: &JobConfig) -> BTreeSet<String> {
    let aliases: BTreeSet<String> = if job.dist_git_branches.is_empty() {
        BTreeSet::from(["fedora-stable".to_string()])
    } else {
        job.dist_git_branches.clone()
    };
    get_branches(&aliases, "rawhide")
}

/// Process one normalized event to completion.
pub async fn process_event(
    state: &ServiceState,
    mut event: EventData,
    koji_build: Option<KojiBuildData>,
) -> anyhow::Result<()> {
    crate::metrics::event_received(event.kind.as_str());

    let mut conn = state.pool.get().await?;
    let Some(project_row) = projects::find_by_url(&mut conn, &event.project_url).await? else {
        tracing::debug!(url = %event.project_url, "No project registered for event");
        return Ok(());
    };
    let Some(config_value) = project_row.package_config.clone() else {
        tracing::debug!(project = %project_row.name, "Project has no package config");
        return Ok(());
    };
    let package_config: PackageConfig = serde_json::from_value(config_value)?;

    // PR comment payloads do not carry the head commit; checkers need it.
    if event.commit_sha.is_none() {
        if let (
            Some(pr_id),
            EventKind::PullRequestCommentGithub | EventKind::PullRequestCommentPagure,
        ) = (event.pr_id, event.kind)
        {
            let project = state.forge.project(&event.project_url)?;
            event.commit_sha = Some(project.pr_head_commit(pr_id).await?);
        }
    }

    for job in &package_config.jobs {
        if !job_matches_event(job, event.kind) {
            continue;
        }

        let checkers = checkers_for(state, &package_config, job, &event, koji_build.as_ref())?;
        if !run_checkers(&checkers).await? {
            tracing::debug!(job = job.job.as_str(), "Job skipped by pre-checks");
            continue;
        }

        dispatch(state, &mut conn, &project_row, job, &event).await?;
    }

    Ok(())
}

/// Run the job once its checkers all passed.
async fn dispatch(
    state: &ServiceState,
    conn: &mut AsyncPgConnection,
    project_row: &Project,
    job: &JobConfig,
    event: &EventData,
) -> anyhow::Result<()> {
    match job.job {
        JobType::CoprBuild => {
            let Some(commit_sha) = &event.commit_sha else {
                tracing::debug!("No commit to build, skipping Copr submission");
                return Ok(());
            };

            let copr_project = match event.pr_id {
                Some(pr_id) => format!("{}-{}-{}", project_row.namespace, project_row.name, pr_id),
                None => format!("{}-{}", project_row.namespace, project_row.name),
            };
            let clone_url = format!("{}.git", project_row.project_url);
            let chroots: Vec<String> = job.targets.iter().cloned().collect();

            let submitted = state
                .copr
                .submit_build(
                    &state.config.copr_owner,
                    &copr_project,
                    &clone_url,
                    commit_sha,
                    &chroots,
                )
                .await?;
            tracing::info!(
                build_id = submitted.build_id,
                project = %copr_project,
                "Copr build submitted"
            );

            for chroot in &chroots {
                build_records::create_target(
                    conn,
                    NewCoprBuildTarget {
                        build_id: submitted.build_id.to_string(),
                        project_name: copr_project.clone(),
                        owner: state.config.copr_owner.clone(),
                        target: chroot.clone(),
                        status: "pending".to_string(),
                        commit_sha: commit_sha.clone(),
                        web_url: Some(submitted.web_url.clone()),
                        pr_id: event.pr_id.map(|id| id as i32),
                        branch_name: event.git_ref.clone(),
                        repo_namespace: Some(project_row.namespace.clone()),
                        repo_name: Some(project_row.name.clone()),
                        project_url: Some(project_row.project_url.clone()),
                        build_submitted_time: Some(chrono::Utc::now()),
                    },
                )
                .await?;
            }
            crate::metrics::job_dispatched("copr_build");
        }
        JobType::UpstreamKojiBuild => {
            let Some(commit_sha) = &event.commit_sha else {
                tracing::debug!("No commit to build, skipping Koji submission");
                return Ok(());
            };

            let source = format!("{}.git#{}", project_row.project_url, commit_sha);
            for target in &job.targets {
                let task_id = state.koji.submit_scratch_build(&source, target).await?;
                tracing::info!(task_id, target = %target, "Koji scratch build submitted");
            }
            crate::metrics::job_dispatched("upstream_koji_build");
        }
        JobType::BodhiUpdate => {
            match (&event.kind, &event.git_ref) {
                // A finished build updates exactly its own branch.
                (EventKind::KojiBuild, Some(branch)) => {
                    state.bodhi.create_update(branch).await?;
                }
                _ => {
                    for branch in configured_update_branches(job) {
                        state.bodhi.create_update(&branch).await?;
                    }
                }
            }
            crate::metrics::job_dispatched("bodhi_update");
        }
        JobType::VmImageBuild => {
            let targets: Vec<&str> = job.targets.iter().map(String::as_str).collect();
            tracing::info!(targets = ?targets, "VM image build queued");
            if let Some(pr_id) = event.pr_id {
                let project = state.forge.project(&event.project_url)?;
                project
                    .comment_pr(
                        pr_id,
                        &format!("Building a VM image for {}.", targets.join(", ")),
                    )
                    .await?;
            }
            crate::metrics::job_dispatched("vm_image_build");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(job: JobType, trigger: JobTrigger) -> JobConfig {
        JobConfig {
            job,
            trigger,
            targets: Default::default(),
            dist_git_branches: Default::default(),
            branch: None,
            scratch: false,
            issue_repository: None,
        }
    }

    #[test]
    fn test_commit_trigger_covers_pushes_and_retriggers() {
        let config = job(JobType::BodhiUpdate, JobTrigger::Commit);
        for kind in [
            EventKind::PushPagure,
            EventKind::KojiBuild,
            EventKind::IssueCommentGithub,
            EventKind::PullRequestCommentPagure,
        ] {
            assert!(job_matches_event(&config, kind), "{kind:?}");
        }
        assert!(!job_matches_event(&config, EventKind::PullRequestGithub));
    }

    #[test]
    fn test_pull_request_trigger_covers_prs_and_pr_comments() {
        let config = job(JobType::CoprBuild, JobTrigger::PullRequest);
        for kind in [
            EventKind::PullRequestGithub,
            EventKind::MergeRequestGitlab,
            EventKind::PullRequestCommentGithub,
        ] {
            assert!(job_matches_event(&config, kind), "{kind:?}");
        }
        assert!(!job_matches_event(&config, EventKind::PushGithub));
        assert!(!job_matches_event(&config, EventKind::IssueCommentGitlab));
    }

    #[test]
    fn test_release_trigger_matches_nothing_yet() {
        let config = job(JobType::BodhiUpdate, JobTrigger::Release);
        for kind in [EventKind::PushPagure, EventKind::KojiBuild] {
            assert!(!job_matches_event(&config, kind));
        }
    }

    #[test]
    fn test_configured_update_branches_default_to_stable() {
        let config = job(JobType::BodhiUpdate, JobTrigger::Commit);
        let branches = configured_update_branches(&config);
        assert!(branches.contains("f40"));
        assert!(!branches.contains("rawhide"));
    }
}
