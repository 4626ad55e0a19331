//! projects — a registered forge repository with its package configuration.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::projects;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub namespace: String,
    pub project_url: String,
    pub default_branch: String,
    pub package_config: Option<serde_json::Value>,
    pub issue_repository: Option<String>,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub name: String,
    pub namespace: String,
    pub project_url: String,
    pub default_branch: String,
    pub package_config: Option<serde_json::Value>,
    pub issue_repository: Option<String>,
    pub active: bool,
}
