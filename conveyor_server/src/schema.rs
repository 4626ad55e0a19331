//! Diesel table definitions for the conveyor service.
//!
//! Tables: projects, copr_build_targets, pipeline_runs.
//! A Copr build has one row per chroot; the "merged" reporting view
//! aggregates them back into one logical build.

diesel::table! {
    projects (id) {
        id -> Int8,
        name -> Varchar,
        namespace -> Varchar,
        project_url -> Varchar,
        default_branch -> Varchar,
        package_config -> Nullable<Jsonb>,
        issue_repository -> Nullable<Varchar>,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    copr_build_targets (id) {
        id -> Int8,
        build_id -> Varchar,
        project_name -> Varchar,
        owner -> Varchar,
        target -> Varchar,
        status -> Varchar,
        commit_sha -> Varchar,
        web_url -> Nullable<Varchar>,
        build_logs_url -> Nullable<Varchar>,
        srpm_build_id -> Nullable<Int8>,
        built_packages -> Nullable<Jsonb>,
        build_submitted_time -> Nullable<Timestamptz>,
        build_start_time -> Nullable<Timestamptz>,
        build_finished_time -> Nullable<Timestamptz>,
        pr_id -> Nullable<Int4>,
        branch_name -> Nullable<Varchar>,
        repo_namespace -> Nullable<Varchar>,
        repo_name -> Nullable<Varchar>,
        project_url -> Nullable<Varchar>,
        create_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    pipeline_runs (id) {
        id -> Int8,
        copr_build_target_id -> Int8,
        create_date -> Nullable<Timestamptz>,
    }
}

// Foreign key relationships
diesel::joinable!(pipeline_runs -> copr_build_targets (copr_build_target_id));

diesel::allow_tables_to_appear_in_same_query!(projects, copr_build_targets, pipeline_runs,);
