//! Project registry queries.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::project::{NewProject, Project};
use crate::schema::projects;

/// List all active projects.
pub async fn list_projects(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Project>> {
    let results = projects::table
        .filter(projects::active.eq(true))
        .order(projects::id.asc())
        .load::<Project>(conn)
        .await?;
    Ok(results)
}

/// Find a project by its forge URL.
pub async fn find_by_url(
    conn: &mut AsyncPgConnection,
    project_url: &str,
) -> anyhow::Result<Option<Project>> {
    let result = projects::table
        .filter(projects::project_url.eq(project_url))
        .filter(projects::active.eq(true))
        .first::<Project>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Register a new project.
pub async fn create_project(
    conn: &mut AsyncPgConnection,
    new_project: NewProject,
) -> anyhow::Result<Project> {
    let result = diesel::insert_into(projects::table)
        .values(&new_project)
        .get_result::<Project>(conn)
        .await?;
    Ok(result)
}
