//! Database connection pool and startup migration.

use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

pub type DbPool = Pool<AsyncPgConnection>;

/// SQL migration for conveyor tables.
pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id               BIGSERIAL PRIMARY KEY,
    name             VARCHAR(255) NOT NULL,
    namespace        VARCHAR(255) NOT NULL,
    project_url      VARCHAR(512) NOT NULL UNIQUE,
    default_branch   VARCHAR(255) NOT NULL DEFAULT 'main',
    package_config   JSONB,
    issue_repository VARCHAR(512),
    active           BOOLEAN NOT NULL DEFAULT TRUE,
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_date       TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_projects_url ON projects (project_url);

CREATE TABLE IF NOT EXISTS copr_build_targets (
    id                  BIGSERIAL PRIMARY KEY,
    build_id            VARCHAR(64) NOT NULL,
    project_name        VARCHAR(255) NOT NULL,
    owner               VARCHAR(255) NOT NULL,
    target              VARCHAR(64) NOT NULL,
    status              VARCHAR(32) NOT NULL DEFAULT 'pending',
    commit_sha          VARCHAR(40) NOT NULL,
    web_url             VARCHAR(512),
    build_logs_url      VARCHAR(512),
    srpm_build_id       BIGINT,
    built_packages      JSONB,
    build_submitted_time TIMESTAMPTZ,
    build_start_time    TIMESTAMPTZ,
    build_finished_time TIMESTAMPTZ,
    pr_id               INTEGER,
    branch_name         VARCHAR(255),
    repo_namespace      VARCHAR(255),
    repo_name           VARCHAR(255),
    project_url         VARCHAR(512),
    create_date         TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_copr_build_targets_build ON copr_build_targets (build_id);
CREATE INDEX IF NOT EXISTS idx_copr_build_targets_commit ON copr_build_targets (commit_sha);
CREATE INDEX IF NOT EXISTS idx_copr_build_targets_status ON copr_build_targets (status);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id                   BIGSERIAL PRIMARY KEY,
    copr_build_target_id BIGINT NOT NULL REFERENCES copr_build_targets(id) ON DELETE CASCADE,
    create_date          TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_pipeline_runs_target ON pipeline_runs (copr_build_target_id);
"#;

/// Build the connection pool.
pub async fn connect(database_url: &str) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
    Ok(pool)
}

/// Run the conveyor migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("conveyor migration failed: {e}"))?;
    Ok(())
}
