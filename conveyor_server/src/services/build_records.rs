//! Copr build-record queries and the store capability checkers consume.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::DbPool;
use crate::models::copr_build::{CoprBuildTarget, MergedBuildRow, NewCoprBuildTarget};
use crate::schema::{copr_build_targets, pipeline_runs};

/// Read access to persisted Copr builds, injectable into checkers.
#[async_trait]
pub trait CoprBuildStore: Send + Sync {
    async fn get_all_by_commit(&self, commit_sha: &str) -> anyhow::Result<Vec<CoprBuildTarget>>;
    async fn get_by_build_id(&self, build_id: &str) -> anyhow::Result<Option<CoprBuildTarget>>;
    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<CoprBuildTarget>>;
}

pub struct PgCoprBuildStore {
    pub pool: DbPool,
}

#[async_trait]
impl CoprBuildStore for PgCoprBuildStore {
    async fn get_all_by_commit(&self, commit_sha: &str) -> anyhow::Result<Vec<CoprBuildTarget>> {
        let mut conn = self.pool.get().await?;
        get_all_by_commit(&mut conn, commit_sha).await
    }

    async fn get_by_build_id(&self, build_id: &str) -> anyhow::Result<Option<CoprBuildTarget>> {
        let mut conn = self.pool.get().await?;
        get_by_build_id(&mut conn, build_id).await
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<CoprBuildTarget>> {
        let mut conn = self.pool.get().await?;
        get_by_id(&mut conn, id).await
    }
}

/// All chroot rows for a commit, across builds.
pub async fn get_all_by_commit(
    conn: &mut AsyncPgConnection,
    commit_sha: &str,
) -> anyhow::Result<Vec<CoprBuildTarget>> {
    let rows = copr_build_targets::table
        .filter(copr_build_targets::commit_sha.eq(commit_sha))
        .order(copr_build_targets::id.asc())
        .load::<CoprBuildTarget>(conn)
        .await?;
    Ok(rows)
}

/// First chroot row of one logical build.
pub async fn get_by_build_id(
    conn: &mut AsyncPgConnection,
    build_id: &str,
) -> anyhow::Result<Option<CoprBuildTarget>> {
    let row = copr_build_targets::table
        .filter(copr_build_targets::build_id.eq(build_id))
        .order(copr_build_targets::id.asc())
        .first::<CoprBuildTarget>(conn)
        .await
        .optional()?;
    Ok(row)
}

/// One chroot row by its own identifier.
pub async fn get_by_id(
    conn: &mut AsyncPgConnection,
    id: i64,
) -> anyhow::Result<Option<CoprBuildTarget>> {
    let row = copr_build_targets::table
        .find(id)
        .first::<CoprBuildTarget>(conn)
        .await
        .optional()?;
    Ok(row)
}

/// Logical builds with their chroot rows folded together, newest first.
///
/// `first`/`last` are row indices into the merged listing.
pub async fn get_merged_chroots(
    conn: &mut AsyncPgConnection,
    first: i64,
    last: i64,
) -> anyhow::Result<Vec<MergedBuildRow>> {
    let count = (last - first).max(0);
    let rows = diesel::sql_query(format!(
        "SELECT build_id, \
                array_agg(target ORDER BY id) AS targets, \
                array_agg(status ORDER BY id) AS statuses, \
                array_agg(id ORDER BY id) AS target_ids \
         FROM copr_build_targets \
         GROUP BY build_id \
         ORDER BY max(id) DESC \
         OFFSET {first} LIMIT {count}"
    ))
    .load(conn)
    .await?;
    Ok(rows)
}

/// Pipeline-run identifiers associated with one chroot row.
pub async fn run_ids_for_target(
    conn: &mut AsyncPgConnection,
    target_id: i64,
) -> anyhow::Result<Vec<i64>> {
    let ids = pipeline_runs::table
        .filter(pipeline_runs::copr_build_target_id.eq(target_id))
        .select(pipeline_runs::id)
        .order(pipeline_runs::id.asc())
        .load::<i64>(conn)
        .await?;
    Ok(ids)
}

/// Record one (build, chroot) row for a freshly submitted build.
pub async fn create_target(
    conn: &mut AsyncPgConnection,
    new_target: NewCoprBuildTarget,
) -> anyhow::Result<CoprBuildTarget> {
    let row = diesel::insert_into(copr_build_targets::table)
        .values(&new_target)
        .get_result::<CoprBuildTarget>(conn)
        .await?;

    tracing::info!(
        build_id = %row.build_id,
        target = %row.target,
        "Copr build target recorded"
    );
    Ok(row)
}
